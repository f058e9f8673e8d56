use std::path::PathBuf;
use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

use face_attendance::config::Config;
use face_attendance::db::{init_db, run_migrations};
use face_attendance::model::student::StudentUpdate;
use face_attendance::routes;
use face_attendance::service::students::{self, Registration};
use face_attendance::service::{FaceEngine, admin, attendance, capture};
use face_attendance::store::{MySqlStore, Store};
use face_attendance::vision::open_image;

#[derive(Parser)]
#[command(
    name = "face-attendance",
    version,
    about = "Face recognition attendance server and admin tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Create or upgrade the database schema
    InitDb,
    /// Manage students
    Student {
        #[command(subcommand)]
        command: StudentCommand,
    },
    /// Mark attendance from an image file
    Attend {
        /// Claimed roll number
        roll: String,
        /// Image containing the student's face
        image: PathBuf,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum StudentCommand {
    /// Register a student, optionally capturing the face right away
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        roll: String,
        #[arg(short, long)]
        department: Option<String>,
        /// Image to take the face sample from
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// List students ordered by name
    List,
    /// Change a student's details; an empty department clears it
    Update {
        id: u64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        roll: Option<String>,
        #[arg(short, long)]
        department: Option<String>,
    },
    /// Delete a student (attendance history is kept)
    Delete { id: u64 },
    /// Replace a student's face sample with the largest face in an image
    Capture { id: u64, image: PathBuf },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Create an admin or reset its password
    Add {
        username: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn init_tracing(config: &Config) -> WorkerGuard {
    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    guard
}

#[actix_web::main]
async fn main() -> Result<()> {
    // .env may supply ADMIN_PASSWORD to clap
    dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // dropping the guard flushes the log
    let _guard = init_tracing(&config);

    let pool = init_db(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let store: Arc<dyn Store> = Arc::new(MySqlStore::new(pool.clone()));

    match cli.command {
        Commands::Serve => {
            run_migrations(&pool).await?;
            serve(config, store).await?
        }
        Commands::InitDb => {
            run_migrations(&pool).await?;
            println!("Database schema is up to date");
        }
        Commands::Student { command } => student_command(&config, store.as_ref(), command).await?,
        Commands::Attend { roll, image } => {
            let engine = FaceEngine::from_config(&config)?;
            let frame = open_image(&image)
                .with_context(|| format!("cannot read image {}", image.display()))?;
            let now = Local::now().naive_local();
            let marked =
                attendance::mark_attendance(store.as_ref(), &engine, roll.trim(), frame, now).await?;
            println!(
                "Attendance marked for {} (confidence {:.2})",
                marked.name, marked.confidence
            );
        }
        Commands::Admin {
            command: AdminCommand::Add { username, password },
        } => {
            admin::add_admin(store.as_ref(), &username, &password).await?;
            println!("Admin {username} saved");
        }
    }

    Ok(())
}

async fn student_command(config: &Config, store: &dyn Store, command: StudentCommand) -> Result<()> {
    match command {
        StudentCommand::Add {
            name,
            roll,
            department,
            image,
        } => {
            let student = Registration {
                name: Some(name),
                roll_number: Some(roll),
                department,
            }
            .validate(false)?;
            let id = students::register_student(store, student).await?;
            println!("Registered student {id}");

            if let Some(image) = image {
                capture_from_file(config, store, id, &image).await?;
            }
        }
        StudentCommand::List => {
            let all = students::list_students(store).await?;
            if all.is_empty() {
                println!("No students registered");
            }
            for s in all {
                println!(
                    "{:>5}  {:<12} {:<30} {:<20} {}",
                    s.id,
                    s.roll_number,
                    s.name,
                    s.department.as_deref().unwrap_or("-"),
                    if s.has_face { "face" } else { "no face" }
                );
            }
        }
        StudentCommand::Update {
            id,
            name,
            roll,
            department,
        } => {
            let update = StudentUpdate {
                name,
                roll_number: roll,
                department,
            };
            students::update_student(store, id, update).await?;
            println!("Student {id} updated");
        }
        StudentCommand::Delete { id } => {
            students::delete_student(store, id).await?;
            println!("Student {id} deleted");
        }
        StudentCommand::Capture { id, image } => {
            capture_from_file(config, store, id, &image).await?;
        }
    }
    Ok(())
}

async fn capture_from_file(
    config: &Config,
    store: &dyn Store,
    id: u64,
    image: &std::path::Path,
) -> Result<()> {
    let engine = FaceEngine::from_config(config)?;
    let frame =
        open_image(image).with_context(|| format!("cannot read image {}", image.display()))?;
    capture::capture_face(store, &engine, id, frame).await?;
    println!("Face captured for student {id}");
    Ok(())
}

async fn serve(config: Config, store: Arc<dyn Store>) -> Result<()> {
    if config.jwt_secret.is_none() {
        bail!("JWT_SECRET must be set to serve the API");
    }

    let engine = Data::new(FaceEngine::from_config(&config)?);
    let server_addr = config.server_addr.clone();
    info!(addr = %server_addr, prefix = %config.api_prefix, "Server starting...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .app_data(Data::from(store.clone()))
            .app_data(engine.clone())
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)
    .with_context(|| format!("cannot bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
