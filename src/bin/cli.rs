use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use football_value_ev::config::EngineConfig;
use football_value_ev::data::{
    load_fixtures_from_csv, load_historical_matches, save_reports_to_csv, save_reports_to_json,
};
use football_value_ev::ev_analysis::{evaluate_fixture, evaluate_fixtures, ExpectedGoals};
use football_value_ev::ev_calculator::american_to_decimal;
use football_value_ev::{
    CsvXgSource, Estimator, EvaluationReport, FixtureRequest, HistoricalFrequencyClassifier,
    League, Mode, OddsQuote, XgSource,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "cli", about = "Football value bet calculator")]
struct Cli {
    /// Override VALUE_MODE
    #[arg(long, value_enum, global = true)]
    mode: Option<Mode>,

    /// Write results to CSV in the output directory
    #[arg(long, global = true)]
    save_csv: bool,

    /// Write results to JSON in the output directory
    #[arg(long, global = true)]
    save_json: bool,

    /// Override OUTPUT_DIR
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the supported leagues and competitions
    Leagues,
    /// Three-way value from expected goals
    Evaluate {
        #[command(flatten)]
        fixture: FixtureArgs,
        #[arg(long, default_value_t = 1.5)]
        home_goals: f64,
        #[arg(long, default_value_t = 1.2)]
        away_goals: f64,
        #[arg(long, default_value_t = 3.3, allow_hyphen_values = true)]
        odds_draw: f64,
    },
    /// Two-way value from an xG ratio (no draw)
    TwoWay {
        #[command(flatten)]
        fixture: FixtureArgs,
        #[arg(long)]
        home_xg: f64,
        #[arg(long)]
        away_xg: f64,
    },
    /// Three-way value from a classifier trained on historical results
    Classify {
        #[command(flatten)]
        fixture: FixtureArgs,
        /// CSV with home_xg,away_xg,result columns
        #[arg(long)]
        history: PathBuf,
        #[arg(long, default_value_t = 1.5)]
        home_goals: f64,
        #[arg(long, default_value_t = 1.2)]
        away_goals: f64,
        #[arg(long, default_value_t = 3.3, allow_hyphen_values = true)]
        odds_draw: f64,
    },
    /// Evaluate every fixture in a CSV file
    Batch {
        /// CSV with league,home_team,away_team,season,home_xg,away_xg,odds_home,odds_draw,odds_away
        fixtures: PathBuf,
        /// CSV with team,season,xg columns, for fixtures without xG values
        #[arg(long)]
        xg_table: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "heuristic")]
        estimator: EstimatorKind,
        /// Historical results, required for the classifier estimator
        #[arg(long)]
        history: Option<PathBuf>,
        /// Only show the N fixtures with the highest value
        #[arg(long)]
        top: Option<usize>,
    },
}

#[derive(Debug, Args)]
struct FixtureArgs {
    #[arg(long, value_enum, default_value = "bundesliga")]
    league: League,
    #[arg(long, default_value = "Home")]
    home_team: String,
    #[arg(long, default_value = "Away")]
    away_team: String,
    #[arg(long, default_value_t = 2.2, allow_hyphen_values = true)]
    odds_home: f64,
    #[arg(long, default_value_t = 3.0, allow_hyphen_values = true)]
    odds_away: f64,
    /// Odds are given in American format (+150, -120)
    #[arg(long)]
    american: bool,
}

impl FixtureArgs {
    fn price(&self, odds: f64) -> Result<f64> {
        if !self.american {
            return Ok(odds);
        }
        // American prices run from -100 down and from +100 up
        if !odds.is_finite()
            || odds.abs() < 100.0
            || odds < i32::MIN as f64
            || odds > i32::MAX as f64
        {
            anyhow::bail!("{} is not a valid American price", odds);
        }
        Ok(american_to_decimal(odds.round() as i32))
    }

    fn request(&self, expected_goals: ExpectedGoals, draw: Option<f64>) -> Result<FixtureRequest> {
        let odds = match draw {
            Some(draw) => OddsQuote::three_way(
                self.price(self.odds_home)?,
                self.price(draw)?,
                self.price(self.odds_away)?,
            )?,
            None => OddsQuote::two_way(self.price(self.odds_home)?, self.price(self.odds_away)?)?,
        };
        Ok(FixtureRequest {
            league: self.league,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            expected_goals,
            odds,
        })
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EstimatorKind {
    Heuristic,
    XgRatio,
    Classifier,
}

fn train_classifier(history: &Path) -> Result<HistoricalFrequencyClassifier> {
    let matches = load_historical_matches(history)?;
    let classifier = HistoricalFrequencyClassifier::fit(&matches)
        .context("Failed to train classifier on historical results")?;
    println!(
        "Trained classifier on {} historical matches\n",
        classifier.samples()
    );
    Ok(classifier)
}

fn print_reports(reports: &[EvaluationReport]) {
    if reports.is_empty() {
        println!("No fixtures could be evaluated.");
        return;
    }
    for (i, report) in reports.iter().enumerate() {
        println!("{}. {}\n", i + 1, report.format());
    }
}

fn save_outputs(config: &EngineConfig, reports: &[EvaluationReport]) -> Result<()> {
    if reports.is_empty() || !(config.save_csv || config.save_json) {
        return Ok(());
    }
    std::fs::create_dir_all(&config.output_dir).context("Failed to create output directory")?;

    if config.save_csv {
        let path = config.output_dir.join("value_bets.csv");
        save_reports_to_csv(reports, &path)?;
        println!("Saved results to {}", path.display());
    }
    if config.save_json {
        let path = config.output_dir.join("value_bets.json");
        save_reports_to_json(reports, &path)?;
        println!("Saved results to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    config.save_csv |= cli.save_csv;
    config.save_json |= cli.save_json;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    println!("Football Value Bet Calculator\n");

    let reports = match cli.command {
        Command::Leagues => {
            for league in League::all() {
                println!("  {}", league);
            }
            return Ok(());
        }
        Command::Evaluate {
            fixture,
            home_goals,
            away_goals,
            odds_draw,
        } => {
            println!("League: {}\n", fixture.league);
            let request = fixture.request(
                ExpectedGoals::Direct {
                    home: home_goals,
                    away: away_goals,
                },
                Some(odds_draw),
            )?;
            vec![evaluate_fixture(
                &request,
                &Estimator::Heuristic,
                None,
                config.mode,
            )?]
        }
        Command::TwoWay {
            fixture,
            home_xg,
            away_xg,
        } => {
            println!("League: {}\n", fixture.league);
            let request = fixture.request(
                ExpectedGoals::Direct {
                    home: home_xg,
                    away: away_xg,
                },
                None,
            )?;
            vec![evaluate_fixture(
                &request,
                &Estimator::XgRatio,
                None,
                config.mode,
            )?]
        }
        Command::Classify {
            fixture,
            history,
            home_goals,
            away_goals,
            odds_draw,
        } => {
            println!("League: {}\n", fixture.league);
            let classifier = train_classifier(&history)?;
            let request = fixture.request(
                ExpectedGoals::Direct {
                    home: home_goals,
                    away: away_goals,
                },
                Some(odds_draw),
            )?;
            vec![evaluate_fixture(
                &request,
                &Estimator::Classifier(&classifier),
                None,
                config.mode,
            )?]
        }
        Command::Batch {
            fixtures,
            xg_table,
            estimator,
            history,
            top,
        } => {
            let requests = load_fixtures_from_csv(&fixtures)?;
            println!("Loaded {} fixtures from {}\n", requests.len(), fixtures.display());

            let source = xg_table.map(CsvXgSource::from_path).transpose()?;
            let source = source.as_ref().map(|s| s as &dyn XgSource);

            let classifier = match (estimator, history) {
                (EstimatorKind::Classifier, Some(history)) => Some(train_classifier(&history)?),
                (EstimatorKind::Classifier, None) => {
                    anyhow::bail!("The classifier estimator needs --history")
                }
                _ => None,
            };
            let estimator = match (&classifier, estimator) {
                (Some(classifier), _) => Estimator::Classifier(classifier),
                (None, EstimatorKind::XgRatio) => Estimator::XgRatio,
                (None, _) => Estimator::Heuristic,
            };

            let reports = evaluate_fixtures(&requests, &estimator, source, config.mode, top);
            let value_count = football_value_ev::ev_analysis::value_bets(&reports).len();
            println!(
                "{} of {} evaluated fixtures have a value bet\n",
                value_count,
                reports.len()
            );
            reports
        }
    };

    print_reports(&reports);
    save_outputs(&config, &reports)?;

    Ok(())
}
