use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use essay_skill_mastery::engine::AssessmentOutcome;
use essay_skill_mastery::import;
use essay_skill_mastery::report;
use essay_skill_mastery::service::AssessmentService;
use essay_skill_mastery::store::JsonFileStore;
use essay_skill_mastery::telemetry;
use essay_skill_mastery::{AssessmentEngine, EngineConfig, SkillName};

#[derive(Parser)]
#[command(name = "skill-mastery")]
#[command(about = "Track argumentative writing skill mastery from essay analysis", long_about = None)]
struct Cli {
    /// Directory holding one JSON assessment per student
    #[arg(long, env = "MASTERY_STORE_DIR", default_value = "assessments")]
    store_dir: PathBuf,
    /// Optional TOML file overriding engine constants
    #[arg(long, env = "MASTERY_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty assessment for a student
    Init {
        #[arg(long)]
        student: String,
    },
    /// Score one skill from a free-text analysis file without recording it
    Extract {
        #[arg(long)]
        skill: SkillName,
        #[arg(long)]
        text: PathBuf,
    },
    /// Record a JSON essay analysis for a student
    Analyze {
        #[arg(long)]
        student: String,
        #[arg(long)]
        analysis: PathBuf,
        /// Essay reference; a random one is generated when omitted
        #[arg(long)]
        essay_ref: Option<String>,
    },
    /// Record analyses from a CSV file (student_id,essay_ref,skill,score)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List students with a stored assessment
    List,
    /// Print a student's progress snapshot as JSON
    Progress {
        #[arg(long)]
        student: String,
    },
    /// Print a practice test plan for a student's weakest skills
    Practice {
        #[arg(long)]
        student: String,
    },
    /// Record practice test results from a CSV file (skill,score)
    SubmitPractice {
        #[arg(long)]
        student: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn print_outcome(outcome: &AssessmentOutcome) {
    let snapshot = &outcome.snapshot;
    println!(
        "Recorded {} for {}: overall {:.1} ({})",
        outcome.entry.essay_ref,
        snapshot.student_id,
        snapshot.overall_progress,
        snapshot.learning_path.tier
    );
    for change in &outcome.entry.per_skill {
        println!(
            "- {}: {:.0} -> {:.0} ({:+.0})",
            change.skill, change.previous_level, change.new_level, change.improvement
        );
    }
    if let Some(milestone) = &snapshot.learning_path.next_milestone {
        println!("Next milestone: {} to {:.0}", milestone.skill, milestone.target_level);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let service = AssessmentService::new(
        AssessmentEngine::new(config),
        JsonFileStore::new(&cli.store_dir),
    );

    match cli.command {
        Commands::Init { student } => {
            service.ensure_student(&student).await?;
            println!("Assessment ready for {student}.");
        }
        Commands::Extract { skill, text } => {
            let raw = std::fs::read_to_string(&text)
                .with_context(|| format!("failed to read {}", text.display()))?;
            let score = service.engine().extractor().extract_text(skill, &raw);
            println!("{}", serde_json::to_string_pretty(&score)?);
        }
        Commands::Analyze {
            student,
            analysis,
            essay_ref,
        } => {
            let raw = std::fs::read_to_string(&analysis)
                .with_context(|| format!("failed to read {}", analysis.display()))?;
            let payload: serde_json::Value =
                serde_json::from_str(&raw).context("analysis file is not valid JSON")?;
            let essay_ref = essay_ref.unwrap_or_else(|| Uuid::new_v4().to_string());
            let outcome = service.record_json(&student, &essay_ref, &payload).await?;
            print_outcome(&outcome);
        }
        Commands::Import { csv } => {
            let analyses = import::read_analyses_file(&csv)
                .with_context(|| format!("failed to import {}", csv.display()))?;
            for item in &analyses {
                service
                    .record_batch(&item.student_id, &item.essay_ref, &item.batch)
                    .await?;
            }
            println!("Recorded {} analyses from {}.", analyses.len(), csv.display());
        }
        Commands::List => {
            let students = service.store().list_students().await?;
            if students.is_empty() {
                println!("No assessments stored in {}.", cli.store_dir.display());
            }
            for student in students {
                println!("{student}");
            }
        }
        Commands::Progress { student } => {
            let aggregate = service.fetch(&student).await?;
            println!("{}", serde_json::to_string_pretty(&aggregate.snapshot())?);
        }
        Commands::Practice { student } => {
            let plan = service.practice_plan(&student).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::SubmitPractice { student, csv } => {
            let results = import::read_practice_file(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let test_ref = format!("practice-{}", Uuid::new_v4());
            let outcome = service.submit_practice(&student, &test_ref, &results).await?;
            print_outcome(&outcome);
        }
        Commands::Report { student, out } => {
            let aggregate = service.fetch(&student).await?;
            let body = report::build_report(&aggregate, service.engine().planner());
            std::fs::write(&out, body)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
