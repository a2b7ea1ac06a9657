use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wrongbook_progress::{
    calculate_grade, grade_number, next_review_from, stage_description, GradeProgression,
};
use wrongbook_schemas::Language;

#[derive(Parser, Debug)]
#[command(name = "wrongbook-progress")]
#[command(about = "Grade progression and review scheduling for Wrongbook students")]
struct Args {
    /// Label language: zh or en
    #[arg(long, default_value = "en", global = true)]
    lang: String,

    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Current grade/semester of a student
    Grade {
        /// primary, junior_high, senior_high or university
        #[arg(long)]
        stage: String,

        #[arg(long)]
        enrollment_year: i32,

        /// Date to evaluate (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Next review date for a repetition stage
    Review {
        #[arg(long, default_value_t = 0)]
        stage: u32,

        /// Review time (RFC3339, defaults to now)
        #[arg(long)]
        from: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GradeReport {
    stage: String,
    enrollment_year: i32,
    as_of: NaiveDate,
    #[serde(flatten)]
    progression: GradeProgression,
    label: String,
    grade_number: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewReport {
    stage: u32,
    reviewed_at: DateTime<Utc>,
    next_review: DateTime<Utc>,
    description: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let language = Language::from_key(&args.lang);
    debug!("Language: {:?}", language);

    match args.command {
        Command::Grade {
            stage,
            enrollment_year,
            as_of,
        } => {
            let as_of = match as_of {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("Invalid date '{}'", raw))?,
                None => Local::now().date_naive(),
            };

            let report = GradeReport {
                label: calculate_grade(&stage, enrollment_year, as_of, language),
                grade_number: grade_number(&stage, enrollment_year, as_of),
                progression: GradeProgression::at(enrollment_year, as_of),
                stage,
                enrollment_year,
                as_of,
            };

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.label);
                if let Some(grade) = report.grade_number {
                    println!("Grade number: {}", grade);
                }
            }
        }
        Command::Review { stage, from } => {
            let reviewed_at = match from {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("Invalid timestamp '{}'", raw))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            let report = ReviewReport {
                stage,
                reviewed_at,
                next_review: next_review_from(stage, reviewed_at),
                description: stage_description(stage, language),
            };

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.description);
                println!("Next review: {}", report.next_review.to_rfc3339());
            }
        }
    }

    Ok(())
}
