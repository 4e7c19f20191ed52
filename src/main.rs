//! codeqa - ask questions about any Git repository
//!
//! Thin front end over the orchestration core: collects the repository
//! URL and the question, runs the ingest-then-ask sequence against the
//! remote Q&A backend, and renders the outcome.

mod backend;
mod config;
mod orchestrator;
mod session;
mod validate;

use backend::HttpBackend;
use clap::Parser;
use config::Config;
use orchestrator::OrchestrationError;
use session::{AskState, Session};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "codeqa", version, about = "Ask questions about a codebase")]
struct Args {
    /// Repository URL to ingest (e.g. https://github.com/example/repo)
    repo_url: String,

    /// Natural-language question about the codebase
    question: String,

    /// Backend base URL (overrides CODEQA_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codeqa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(url) = args.backend_url {
        config.backend_url = url;
    }

    let backend = match HttpBackend::new(&config) {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            render_failure(&OrchestrationError::transport(err.message));
            return ExitCode::FAILURE;
        }
    };

    let session = Session::new(backend);

    println!("Ingesting {} ...", args.repo_url);
    if let Err(err) = session.submit(&args.repo_url, &args.question).await {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match session.state() {
        AskState::Succeeded(answer) => {
            println!("\n{}", answer.explanation);
            if !answer.file_name.is_empty() {
                println!("\n--- {} ---", answer.file_name);
                println!("{}", answer.code_snippet);
            }
            ExitCode::SUCCESS
        }
        AskState::Failed(err) => {
            render_failure(&err);
            ExitCode::FAILURE
        }
        // submit settles the state before returning
        AskState::Idle | AskState::Pending => ExitCode::FAILURE,
    }
}

fn render_failure(err: &OrchestrationError) {
    eprintln!("error ({}): {}", err.phase, err);
}
