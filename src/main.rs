use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roll_call::combined::{self, combine_absences, validate_request};
use roll_call::metrics::{recent, ClassAnalytics};
use roll_call::models::{parse_taken_at, AttendanceStatus, ClassConfig, NewClass};
use roll_call::roster::roster_for;
use roll_call::sheet::AttendanceSheet;
use roll_call::{db, report, COMBINED_ROWS_PER_PAGE, TREND_WINDOW};

#[derive(Parser)]
#[command(name = "roll-call")]
#[command(
    about = "Classroom attendance tracker with analytics and roll sheet exports",
    long_about = None
)]
struct Cli {
    /// Trace-level logging to stderr
    #[arg(long, global = true)]
    debug: bool,
    #[arg(long, global = true, env = "ROLL_CALL_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,
    /// Teacher the commands act for
    #[arg(long, global = true, env = "ROLL_CALL_OWNER", default_value = "teacher@localhost")]
    owner: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Create a sample class with a few sessions of attendance
    Seed,
    /// Create a class and print its share code
    CreateClass {
        #[arg(long)]
        course_code: String,
        #[arg(long)]
        course_name: String,
        #[arg(long)]
        batch: String,
        #[arg(long)]
        starting_roll: String,
        #[arg(long)]
        ending_roll: String,
        /// Comma-separated roll numbers left out of the range
        #[arg(long)]
        excluded_rolls: Option<String>,
    },
    /// List your classes
    Classes,
    /// Delete a class and all of its attendance
    DeleteClass {
        #[arg(long)]
        class: String,
    },
    /// Mark one student on one date
    Mark {
        #[arg(long)]
        class: String,
        /// RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        roll: String,
        /// P, A or L
        #[arg(long)]
        status: String,
    },
    /// Remove every record of a class on one date
    ClearDate {
        #[arg(long)]
        class: String,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Import attendance from a CSV file (roll_number,date,status)
    Import {
        #[arg(long)]
        class: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the enrolled roll numbers
    Roster {
        #[arg(long)]
        class: String,
    },
    /// Export the roll sheet as CSV
    Sheet {
        #[arg(long)]
        class: String,
        #[arg(long, default_value = "roll_sheet.csv")]
        out: PathBuf,
    },
    /// Print class analytics
    Analytics {
        #[arg(long)]
        class: String,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        class: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Combine absences with a partner section and export CSV
    Combined {
        #[arg(long)]
        class: String,
        #[arg(long)]
        partner: String,
        #[arg(long)]
        total_classes: i64,
        #[arg(long, default_value = "combined_attendance.csv")]
        out: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let owner = cli.owner.as_str();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let class = db::seed(&pool, owner).await?;
            println!("Seeded class {} ({}).", class.course_code, class.class_code);
        }
        Commands::CreateClass {
            course_code,
            course_name,
            batch,
            starting_roll,
            ending_roll,
            excluded_rolls,
        } => {
            let class = db::create_class(
                &pool,
                owner,
                &NewClass {
                    course_code,
                    course_name,
                    batch,
                    config: ClassConfig {
                        starting_roll,
                        ending_roll,
                        excluded_rolls,
                    },
                },
            )
            .await?;
            println!(
                "Created {} with {} students. Class code: {}",
                class.course_code,
                roster_for(&class.config).len(),
                class.class_code
            );
        }
        Commands::Classes => {
            let classes = db::list_classes(&pool, owner).await?;
            if classes.is_empty() {
                println!("No classes yet.");
                return Ok(());
            }
            for class in classes {
                println!(
                    "- {} {} {} (rolls {}-{}) code {}",
                    class.course_code,
                    class.course_name,
                    class.batch,
                    class.config.starting_roll,
                    class.config.ending_roll,
                    class.class_code
                );
            }
        }
        Commands::DeleteClass { class } => {
            let class = db::owned_class(&pool, owner, &class).await?;
            db::delete_class(&pool, class.id).await?;
            println!("Deleted {} ({}).", class.course_code, class.class_code);
        }
        Commands::Mark {
            class,
            date,
            roll,
            status,
        } => {
            let class = db::owned_class(&pool, owner, &class).await?;
            let taken_on = parse_taken_at(&date)?.date_naive();
            let status = AttendanceStatus::from_code(&status)?;
            if !roster_for(&class.config).contains(&roll) {
                tracing::warn!(%roll, class_code = %class.class_code, "roll is not on the roster");
            }
            db::mark_attendance(&pool, class.id, taken_on, &roll, status).await?;
            println!("Marked {roll} {status} on {taken_on}.");
        }
        Commands::ClearDate { class, date } => {
            let class = db::owned_class(&pool, owner, &class).await?;
            let deleted = db::clear_date(&pool, class.id, date).await?;
            println!("Deleted {deleted} attendance records for {date}.");
        }
        Commands::Import { class, csv } => {
            let class = db::owned_class(&pool, owner, &class).await?;
            let written = db::import_csv(&pool, class.id, &csv).await?;
            println!("Recorded {written} marks from {}.", csv.display());
        }
        Commands::Roster { class } => {
            let class = db::owned_class(&pool, owner, &class).await?;
            for roll in roster_for(&class.config) {
                println!("{roll}");
            }
        }
        Commands::Sheet { class, out } => {
            let loaded = db::load_class_attendance(&pool, owner, &class).await?;
            let sheet = AttendanceSheet::build(&loaded.records, &loaded.roster);
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            sheet.write_csv(file)?;
            println!("Roll sheet written to {}.", out.display());
        }
        Commands::Analytics { class, json, limit } => {
            let loaded = db::load_class_attendance(&pool, owner, &class).await?;
            let analytics = ClassAnalytics::compute(&loaded.records, &loaded.roster);
            info!(
                class_code = %loaded.class.class_code,
                sessions = analytics.total_sessions,
                students = analytics.total_students,
                "analytics computed"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
                return Ok(());
            }

            println!(
                "{} sessions, {} students, overall {:.1}%, average daily {:.1}",
                analytics.total_sessions,
                analytics.total_students,
                analytics.overall_rate,
                analytics.average_daily_attendance
            );
            for band in &analytics.distribution {
                println!("  {:>9}: {}", band.label, band.count);
            }
            println!("Perfect attendance: {}", analytics.perfect_attendance.len());
            println!("At risk:");
            for student in analytics.at_risk.iter().take(limit) {
                println!(
                    "- {} {:.1}% (marks {})",
                    student.student_id, student.percentage, student.marks
                );
            }
            println!("Recent sessions:");
            for day in recent(&analytics.date_wise, TREND_WINDOW) {
                println!("- {} {}/{}", day.date, day.present_rounded(), day.total_students);
            }
        }
        Commands::Report { class, out } => {
            let loaded = db::load_class_attendance(&pool, owner, &class).await?;
            let analytics = ClassAnalytics::compute(&loaded.records, &loaded.roster);
            let report = report::build_report(&loaded.class, &analytics, TREND_WINDOW);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Combined {
            class,
            partner,
            total_classes,
            out,
        } => {
            let current = db::load_class_attendance(&pool, owner, &class).await?;
            let partner_code = partner.trim().to_uppercase();
            let total =
                validate_request(&current.class.class_code, &partner_code, total_classes)?;
            let partner = db::find_class_by_code(&pool, &partner_code).await?;

            let partner_records = db::fetch_attendance(&pool, partner.id).await?;
            let rows =
                combine_absences(&current.records, &partner_records, &current.roster, total);
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            combined::write_csv(&rows, file)?;

            let pages = combined::paginate(&rows, COMBINED_ROWS_PER_PAGE).len();
            let shortfall = rows.iter().filter(|r| r.shortfall).count();
            println!(
                "Combined sheet for {} + {} written to {} ({} students, {} pages, {} below 60%).",
                current.class.class_code,
                partner.class_code,
                out.display(),
                rows.len(),
                pages,
                shortfall
            );
        }
    }

    Ok(())
}
