//! Tempo client entry point.
//!
//! Restores the session, optionally logs in from `TEMPO_USERNAME` and
//! `TEMPO_PASSWORD`, then lists the projects visible to the user.

use tempo_client::config::ClientConfig;
use tempo_client::error::ClientError;
use tempo_client::telemetry;
use tempo_client::{LoginOutcome, Stores};
use tempo_core::Timestamp;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let config = ClientConfig::load()?;
    telemetry::init_tracing(&config.log)?;

    let stores = Stores::from_config(&config)?;
    if stores.session.restore_or_discard() {
        info!("using persisted session");
    }

    if let (Ok(username), Ok(password)) = (
        std::env::var("TEMPO_USERNAME"),
        std::env::var("TEMPO_PASSWORD"),
    ) {
        match stores.session.login(&username, &password).await {
            LoginOutcome::Authenticated(user) => {
                info!(username = %user.username, "signed in");
            }
            outcome => {
                let message = outcome.message().unwrap_or("login failed").to_string();
                warn!(%message, "sign-in did not complete");
                if !stores.session.is_logged_in() {
                    eprintln!("Sign-in failed: {}", message);
                    return Ok(());
                }
            }
        }
    }

    let projects = stores.projects.fetch_projects().await?;
    if projects.is_empty() {
        println!("No projects.");
    }
    for project in &projects {
        println!(
            "{:>4}  {:<32}  {:<12}  {} .. {}",
            project.id,
            project.name,
            project.status.map_or("-", |status| status.label()),
            day(project.start_date),
            day(project.end_date)
        );
    }
    Ok(())
}

fn day(at: Option<Timestamp>) -> String {
    at.map_or_else(|| "?".to_string(), |at| at.date().to_string())
}
