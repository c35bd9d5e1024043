use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::{app, StoreBackend};
use shelf_kernel::settings::Settings;

/// StudyShelf operator commands.
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Run and operate the StudyShelf service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Keep books and reviews in memory instead of MongoDB
        #[arg(long)]
        memory: bool,
    },
    /// Create the MongoDB indexes declared by every module
    Migrate,
    /// Check that MongoDB is reachable
    Ping,
    /// Print the effective configuration with credentials masked
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load StudyShelf settings")?;

    match cli.command {
        Command::Config => {
            print_config(&settings);
            Ok(())
        }
        Command::Serve { memory } => {
            shelf_telemetry::init(&settings.telemetry)?;
            let backend = if memory {
                StoreBackend::Memory
            } else {
                StoreBackend::Mongo
            };
            app::run(settings, backend).await
        }
        Command::Migrate => {
            shelf_telemetry::init(&settings.telemetry)?;
            let applied = app::migrate(&settings).await?;
            println!("applied {applied} index migrations");
            Ok(())
        }
        Command::Ping => {
            shelf_telemetry::init(&settings.telemetry)?;
            let database = shelf_db::connect(&settings.database).await?;
            database.ping().await?;
            println!("MongoDB reachable at {}", settings.database.redacted_uri());
            database.shutdown().await;
            Ok(())
        }
    }
}

fn print_config(settings: &Settings) {
    println!("environment        = {:?}", settings.environment);
    println!("server.host        = {}", settings.server.host);
    println!("server.port        = {}", settings.server.port);
    println!("server.timeout_ms  = {}", settings.server.request_timeout_ms);
    println!("database.uri       = {}", settings.database.redacted_uri());
    println!("database.name      = {}", settings.database.name);
    println!("telemetry.filter   = {}", settings.telemetry.filter);
    println!("telemetry.format   = {:?}", settings.telemetry.log_format);
}
