use std::path::PathBuf;

use anyhow::{Context, Result};
use aula::app::{Services, print_catalog};
use aula::course::{Catalog, LessonNavigator};
use aula::{App, Config};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aula")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the key your progress is stored under
    Whoami,
    /// List the lessons of a course with your progress
    Lessons {
        /// Path to the course catalog (JSON)
        catalog: PathBuf,
    },
    /// Watch a lesson in the terminal
    Watch {
        /// Path to the course catalog (JSON)
        catalog: PathBuf,
        /// Lesson to open (defaults to the first lesson)
        lesson: Option<String>,
        /// Playback speed
        #[arg(short, long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Ask the assistant a question
    Ask {
        /// The question
        message: String,
        /// Lesson title or summary to give the assistant context
        #[arg(short, long)]
        lesson: Option<String>,
    },
    /// Print the configuration file location
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aula=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Whoami => {
            let services = Services::connect(config).await?;
            println!("{}", services.user_key);
        }
        Commands::Lessons { catalog } => {
            let services = Services::connect(config).await?;
            let catalog = Catalog::load(&catalog)?;
            let navigator = LessonNavigator::new(catalog.modules, services.config.timings.auto_advance());
            print_catalog(&navigator, &services.store, &services.user_key, None);

            let course = navigator.course_rollup(&services.store, &services.user_key);
            println!("\n{}/{} lessons completed ({:.0}%)", course.completed, course.total, course.percent());
        }
        Commands::Watch { catalog, lesson, speed } => {
            anyhow::ensure!(speed.is_finite() && speed > 0.0, "Speed must be a positive number");

            let services = Services::connect(config).await?;
            let catalog = Catalog::load(&catalog)?;
            let lesson = match lesson {
                Some(lesson) => lesson,
                None => catalog
                    .modules
                    .iter()
                    .flat_map(|m| m.lessons.first())
                    .next()
                    .map(|l| l.id.clone())
                    .context("The catalog has no lessons")?,
            };

            let player = services.player(catalog);
            let mut app = App::new(player, services.chat(), speed);
            app.run(&lesson).await?;
        }
        Commands::Ask { message, lesson } => {
            let services = Services::connect(config).await?;
            let reply = services.chat().ask(&message, lesson.as_deref()).await;
            println!("{}", reply);
        }
        Commands::Config => {
            println!("{}", Config::config_path()?.display());
        }
    }

    Ok(())
}
