mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persona_client::{
    AuthStatus, ClientConfig, Error, EvaluationSession, MovieId, RatingOutcome,
    SessionCredentials,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rate movies and read the personality profile derived from them.
#[derive(Parser, Debug)]
#[command(name = "persona")]
#[command(version)]
struct Cli {
    /// YAML config file (base_url, timeout_secs, user_agent)
    #[arg(short, long, env = "PERSONA_CONFIG")]
    config: Option<PathBuf>,

    /// Browser cookie header, e.g. "sessionid=...; csrftoken=..."
    #[arg(long, env = "PERSONA_COOKIE", default_value = "", hide_env_values = true)]
    cookie: String,

    /// Print analysis results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the session cookie is accepted
    Auth,
    /// Search the catalog, falling back to an external lookup
    Search { query: String },
    /// Rate a movie from 1 to 5
    Rate {
        movie_id: i64,
        #[arg(allow_negative_numbers = true)]
        rating: i64,
        /// Search first so a movie not rated before can be recorded
        #[arg(short, long)]
        query: Option<String>,
    },
    /// List rated movies and progress toward an analysis
    Ratings,
    /// Run a new personality analysis
    Analyze,
    /// Show the latest analysis
    Results,
    /// Show rating statistics
    Stats,
}

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "persona_cli=info,persona_client=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    info!(base_url = %config.base_url, "using backend");
    let session = EvaluationSession::http(
        &config,
        SessionCredentials::from_cookie_header(&cli.cookie),
    )?;

    match cli.command {
        Command::Auth => match session.check_auth().await {
            AuthStatus::Authenticated => println!("인증됨"),
            AuthStatus::Denied(reason) => {
                println!("{}", reason.guidance());
                anyhow::bail!("authentication check failed");
            }
        },
        Command::Search { query } => {
            let outcome = session.search(&query).await?;
            print!("{}", render::search(&outcome));
        }
        Command::Rate {
            movie_id,
            rating,
            query,
        } => {
            session.load().await?;
            if let Some(query) = query {
                session.search(&query).await?;
            }
            match session.rate(MovieId(movie_id), rating).await? {
                RatingOutcome::Applied { previous, .. } => {
                    if let Some(previous) = previous {
                        println!("{} → {}", previous.stars(), session_rating(&session, movie_id));
                    } else {
                        println!("{}", session_rating(&session, movie_id));
                    }
                }
                RatingOutcome::Superseded => println!("a newer rating for this movie won"),
            }
            println!("{}", render::progress(&session.progress()));
        }
        Command::Ratings => {
            session.load().await?;
            let state = session.state();
            print!("{}", render::evaluated(state.evaluated(), &session.progress()));
        }
        Command::Analyze => {
            session.load().await?;
            let summary = session.analyze().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary.result)?);
            } else {
                print!("{}", render::summary(&summary));
                print!("{}", render::result(&summary.result));
            }
        }
        Command::Results => {
            let result = session.results().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render::result(&result));
            }
        }
        Command::Stats => {
            let stats = session.statistics().await?;
            print!("{}", render::statistics(&stats));
        }
    }
    Ok(())
}

fn session_rating(session: &EvaluationSession, movie_id: i64) -> String {
    session
        .state()
        .rating(MovieId(movie_id))
        .map(|r| r.stars())
        .unwrap_or_default()
}

/// Auth failures get re-authentication guidance and exit code 2.
fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(client_err) if client_err.is_auth() => {
            error!(error = %client_err, "authentication failed");
            eprintln!("{}", client_err.user_message());
            eprintln!("Run `persona auth` after updating PERSONA_COOKIE.");
            ExitCode::from(2)
        }
        Some(client_err) => {
            error!(error = %client_err, "command failed");
            eprintln!("{}", client_err.user_message());
            ExitCode::FAILURE
        }
        None => {
            error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
