//! Tandem CLI - relationship check-ins, score and onboarding progress.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tandem_core::{
    ActivityFilter, Couple, CoupleId, DailyActivityRecord, RepairSignal, RepairSignalKind,
    TurnTowardOutcome, UserId,
};
use tandem_progress::{
    default_habits, default_milestones, ProgressEvaluation, ProgressSequencer, ProgressState,
    SequencerConfig,
};
use tandem_score::{compute_score_series_with, parse_date, summarize, DateRange, ScoreConfig};
use tandem_storage::{JsonStore, RecordStore};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Daily check-ins, relationship score and onboarding progress", long_about = None)]
struct Cli {
    /// Storage directory
    #[arg(long, default_value = ".tandem")]
    store: PathBuf,

    /// JSON file with `score` and `sequencer` settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a daily check-in
    Log {
        /// User ID
        #[arg(long)]
        user: String,
        /// Couple ID
        #[arg(long)]
        couple: Option<String>,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Reflected on the day
        #[arg(long)]
        reflection: bool,
        /// Expressed appreciation
        #[arg(long)]
        appreciation: bool,
        /// Turn-toward outcome (initiated, received_positively, missed, none)
        #[arg(long)]
        turn_toward: Option<TurnTowardOutcome>,
        /// Made an adjustment
        #[arg(long)]
        adjustment: bool,
        /// Relationship climate (1-5)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        climate: Option<u8>,
    },
    /// Register a couple
    Pair {
        /// Couple ID
        #[arg(long)]
        couple: String,
        /// Member user IDs, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        members: Vec<String>,
    },
    /// Log a repair request or action
    Repair {
        /// User ID
        #[arg(long)]
        user: String,
        /// Couple ID
        #[arg(long)]
        couple: String,
        /// Signal kind
        kind: RepairKind,
    },
    /// Show the score series
    Score {
        /// User ID
        #[arg(long)]
        user: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate onboarding progress
    Progress {
        /// User ID
        #[arg(long)]
        user: String,
        /// Couple ID
        #[arg(long)]
        couple: Option<String>,
        /// Seed for habit selection
        #[arg(long)]
        seed: Option<u64>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a completed habit
    HabitDone {
        /// User ID
        #[arg(long)]
        user: String,
        /// Habit ID
        #[arg(long)]
        habit: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RepairKind {
    Request,
    Action,
}

impl From<RepairKind> for RepairSignalKind {
    fn from(kind: RepairKind) -> Self {
        match kind {
            RepairKind::Request => RepairSignalKind::Request,
            RepairKind::Action => RepairSignalKind::Action,
        }
    }
}

/// Settings file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    score: ScoreConfig,
    sequencer: SequencerConfig,
}

impl Config {
    async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).await?;
    debug!(?config, "configuration loaded");

    let store = Arc::new(JsonStore::new(&cli.store).await?);

    match cli.command {
        Commands::Log {
            user,
            couple,
            date,
            reflection,
            appreciation,
            turn_toward,
            adjustment,
            climate,
        } => {
            let date = match date {
                Some(input) => parse_date(&input)?,
                None => Utc::now().date_naive(),
            };
            let mut record = DailyActivityRecord::new(UserId::new(user), date);
            if let Some(couple) = couple {
                record = record.with_couple(CoupleId::new(couple));
            }
            if reflection {
                record = record.with_reflection(true);
            }
            if appreciation {
                record = record.with_appreciation(true);
            }
            if let Some(outcome) = turn_toward {
                record = record.with_turn_toward(outcome);
            }
            if adjustment {
                record = record.with_adjustment(true);
            }
            if let Some(rating) = climate {
                record = record.with_climate(rating);
            }
            store.save_activity(&record).await?;
            info!(record = %record.id, user = %record.user_id, %date, "check-in saved");
            println!(
                "Logged {} for {} ({} deposits)",
                record.date,
                record.user_id,
                record.deposit_count()
            );
        }
        Commands::Pair { couple, members } => {
            let members = members.into_iter().map(UserId::new).collect();
            let couple = Couple::new(CoupleId::new(couple), members);
            store.save_couple(&couple).await?;
            println!("Paired {}: {}", couple.id, join_ids(&couple.members));
        }
        Commands::Repair { user, couple, kind } => {
            let signal = RepairSignal::new(CoupleId::new(couple), UserId::new(user), kind.into());
            store.save_repair_signal(&signal).await?;
            println!(
                "Repair {:?} logged for {} in {}",
                signal.kind, signal.user_id, signal.couple_id
            );
        }
        Commands::Score { user, from, to, json } => {
            let range = DateRange::parse(&from, &to)?;
            let filter =
                ActivityFilter::for_user(UserId::new(user)).between(range.start(), range.end());
            let records = store.list_activity(&filter).await?;
            let series =
                compute_score_series_with(&config.score, &records, range.start(), range.end());
            let summary = summarize(&series);

            if json {
                let out = serde_json::json!({ "series": series, "summary": summary });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for point in &series {
                    match point.climate {
                        Some(climate) => {
                            println!("  {} | {:5.1} | climate {}", point.date, point.value, climate)
                        }
                        None => println!("  {} | {:5.1}", point.date, point.value),
                    }
                }
                println!("Latest: {:.1}", summary.latest);
                println!("7-day change: {:+.1} ({})", summary.delta, summary.trend.as_str());
            }
        }
        Commands::Progress { user, couple, seed, json } => {
            let mut sequencer =
                ProgressSequencer::new(store, default_milestones()?, default_habits()?)?
                    .with_config(config.sequencer);
            if let Some(seed) = seed {
                sequencer = sequencer.with_rng(StdRng::seed_from_u64(seed));
            }
            let couple = couple.map(CoupleId::new);
            let evaluation = sequencer
                .evaluate_progress_at(&UserId::new(user), couple.as_ref(), Utc::now())
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                print_evaluation(&evaluation);
            }
        }
        Commands::HabitDone { user, habit } => {
            let sequencer =
                ProgressSequencer::new(store, default_milestones()?, default_habits()?)?;
            let user = UserId::new(user);
            if sequencer.record_habit_completion(&user, &habit).await? {
                println!("Recorded {} for {}", habit, user);
            } else {
                println!("{} was already recorded for {}", habit, user);
            }
        }
    }

    Ok(())
}

fn print_evaluation(evaluation: &ProgressEvaluation) {
    match &evaluation.state {
        ProgressState::OverrideActive => println!("Check in with each other first"),
        ProgressState::InProgress { milestone } => {
            println!("Milestone {} of {}", milestone, evaluation.total_milestones)
        }
        ProgressState::AllComplete => {
            println!("All {} milestones complete", evaluation.total_milestones)
        }
    }

    for reason in &evaluation.override_reasons {
        println!("  ! {}", serde_json::to_string(reason).unwrap_or_default());
    }

    if let (Some(milestone), Some(status)) = (&evaluation.current_milestone, &evaluation.status) {
        println!("  {} - {}", milestone.title, milestone.description);
        if let Some(progress) = &status.progress {
            println!("  Progress: {}", progress);
        }
        println!("  {}", status.message);
    }

    if let Some(habit) = &evaluation.habit_suggestion {
        println!("  Try: {} - {}", habit.title, habit.description);
        println!("  Mark it done with: tandem habit-done --habit {}", habit.id);
    }
}

fn join_ids(ids: &[UserId]) -> String {
    ids.iter().map(UserId::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let raw = r#"{ "score": { "decay": 0.9 }, "sequencer": { "prefetch": false } }"#;
        let config = Config::parse(raw).unwrap();
        assert_eq!(config.score.decay, 0.9);
        assert_eq!(config.score.neutral_deposit, 0.25);
        assert!(!config.sequencer.prefetch);
        assert_eq!(config.sequencer.repair_window_hours, 48);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::parse("{}").unwrap();
        assert!(config.sequencer.prefetch);
    }

    #[test]
    fn test_cli_parses_log() {
        let cli = Cli::try_parse_from([
            "tandem",
            "log",
            "--user",
            "alice",
            "--turn-toward",
            "received_positively",
            "--climate",
            "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Log { turn_toward, climate, .. } => {
                assert_eq!(turn_toward, Some(TurnTowardOutcome::ReceivedPositively));
                assert_eq!(climate, Some(4));
            }
            _ => panic!("expected log"),
        }
        assert_eq!(cli.store, PathBuf::from(".tandem"));
    }

    #[test]
    fn test_cli_rejects_out_of_range_climate() {
        let args = ["tandem", "log", "--user", "alice", "--climate", "9"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_members_split_on_comma() {
        let args = ["tandem", "pair", "--couple", "c1", "--members", "alice,bob"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Pair { members, .. } => assert_eq!(members, vec!["alice", "bob"]),
            _ => panic!("expected pair"),
        }
    }
}
