//! Practicehub - Participation Minutes Challenge Tracker
//!
//! Members ("participants") grouped under branches log their daily practice
//! minutes. The service tracks progress toward per-participant, per-branch
//! and national goals and serves chart and calendar data as JSON.
//!
//! ## Architecture
//!
//! - **Branches**: organizational subdivisions, each with its own goal
//! - **Users**: belong to exactly one branch, own one or more participants
//! - **Participants**: the tracked entities whose minutes are logged
//! - **Times**: denormalized slot-group storage of date/minutes records

use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = challenge_service::Config::from_env();

    info!(
        database = config.database_url.as_str(),
        bind_address = config.bind_address.as_str(),
        national_goal = config.national_goal,
        "Starting Practicehub service"
    );

    let db = challenge_service::Database::new(&config.database_url).await?;
    db.seed_default_branches().await?;

    let state = challenge_service::AppState::new(db, &config);
    let app = challenge_service::routes().with_state(state);

    info!("Listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
