use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod features;
mod models;
mod pipeline;
mod provider;
mod report;
mod risk;
mod synth;

use crate::config::Settings;
use crate::models::RawDataset;
use crate::provider::{CsvProvider, RawDataProvider, Scope};

#[derive(Parser)]
#[command(name = "academic-risk")]
#[command(about = "Risk features and training labels for student-course pairs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read raw rows from a historical CSV export instead of Postgres
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    course: Option<i64>,
    #[arg(long, requires = "course")]
    student: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small demo cohort
    Seed,
    /// Print feature vectors
    Features {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Write features and risk labels as a training CSV
    Dataset {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "training.csv")]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "risk_report.md")]
        out: PathBuf,
    },
    /// Write a reproducible synthetic cohort in the CSV export layout
    Synth {
        #[arg(long, default_value_t = 200)]
        students: u32,
        #[arg(long, default_value_t = 10)]
        courses: u32,
        #[arg(long, default_value_t = 8)]
        tasks_per_course: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "synthetic_cohort.csv")]
        out: PathBuf,
    },
}

enum Source {
    Csv(CsvProvider),
    Postgres(db::PgProvider),
}

impl RawDataProvider for Source {
    async fn fetch(&self, scope: &Scope) -> anyhow::Result<RawDataset> {
        match self {
            Source::Csv(provider) => provider.fetch(scope).await,
            Source::Postgres(provider) => provider.fetch(scope).await,
        }
    }
}

async fn connect() -> anyhow::Result<PgPool> {
    let settings = Settings::from_env()?;
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn open_source(args: &SourceArgs) -> anyhow::Result<(Source, Scope)> {
    let scope = Scope::from_args(args.course, args.student);
    let source = match &args.csv {
        Some(path) => Source::Csv(CsvProvider::new(path)),
        None => Source::Postgres(db::PgProvider::new(connect().await?)),
    };
    Ok((source, scope))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("academic_risk_pipeline=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Features { source, limit } => {
            let (provider, scope) = open_source(&source).await?;
            let features = pipeline::build_feature_set(&provider, &scope).await?;

            if features.groups.is_empty() {
                println!("No student-course pairs found for {}.", scope.label());
                return Ok(());
            }

            println!("Feature vectors for {}:", scope.label());
            for group in features.groups.iter().take(limit) {
                println!(
                    "- student {} course {} ({} tasks): {}",
                    group.key.student_id,
                    group.key.course_id,
                    group.total_tasks,
                    serde_json::to_string(&group.features)?
                );
            }
            if !features.warnings.is_empty() {
                warn!(count = features.warnings.len(), "input had data warnings");
            }
        }
        Commands::Dataset { source, out } => {
            let (provider, scope) = open_source(&source).await?;
            let training = pipeline::build_training_set(&provider, &scope).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            training.write_csv(file)?;

            let (low, high) = training.class_counts();
            println!(
                "Wrote {} rows ({} high risk, {} low risk) to {}.",
                training.len(),
                high,
                low,
                out.display()
            );
        }
        Commands::Report { source, out } => {
            let (provider, scope) = open_source(&source).await?;
            let dataset = provider.fetch(&scope).await?;
            let training = pipeline::TrainingSet::from_dataset(&dataset)?;
            let features = features::compute_features(&dataset)?;
            let report = report::build_report(&scope.label(), &training, &features);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Synth {
            students,
            courses,
            tasks_per_course,
            seed,
            out,
        } => {
            let config = synth::SynthConfig {
                students,
                courses,
                tasks_per_course,
                seed,
            };
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let summary = synth::write_cohort(&config, file)?;
            println!(
                "Wrote {} rows ({} submissions, {} high-risk students) to {}.",
                summary.rows,
                summary.submissions,
                summary.high_risk_students,
                out.display()
            );
        }
    }

    Ok(())
}
