//! txt2sql - ask a PostgreSQL database questions in plain language.

use tokio::io::BufReader;
use tracing::{error, info};

use txt2sql::app::{startup_error_message, App, DatabaseSource};
use txt2sql::cli::{Cli, Mode};
use txt2sql::commands::Repl;
use txt2sql::config::Config;
use txt2sql::dashboard;
use txt2sql::error::Result;
use txt2sql::logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let mode = cli.mode();
    match mode {
        Mode::Repl => logging::init_file_logging(),
        Mode::Dashboard { .. } => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli, mode).await {
        error!("{}: {}", e.category(), e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: Mode) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let source = if cli.mock_db {
        DatabaseSource::mock()
    } else {
        DatabaseSource::Postgres
    };

    match mode {
        Mode::Repl => {
            println!("Starting txt2sql agent...");
            let app = match App::initialize_with(env_lookup, config, true, source).await {
                Ok(app) => app,
                Err(e) => {
                    error!("{}: {}", e.category(), e);
                    println!("{}", startup_error_message(&e));
                    return Ok(());
                }
            };

            let reader = BufReader::new(tokio::io::stdin());
            let mut repl = Repl::new(app.command_context(), reader, tokio::io::stdout());
            let result = repl.run().await;
            app.agent.inspector().client().close().await?;
            result
        }
        Mode::Dashboard { bind } => {
            let app = App::initialize_with(env_lookup, config, false, source).await?;
            let bind = bind.unwrap_or_else(|| app.config.dashboard.bind.clone());
            dashboard::serve(app.dashboard_state(), &bind).await
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
