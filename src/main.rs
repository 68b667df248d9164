//! newsnotes - news board and private notes server

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsnotes::{
    api::{self, AppState},
    config::Config,
    db,
    render::TemplateEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsnotes=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting newsnotes...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize template engine
    let templates = TemplateEngine::new(config.templates.path.as_deref())?;
    tracing::info!("Template engine initialized");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(pool, config, templates);

    #[cfg(feature = "demo")]
    seed_demo_content(&state).await?;

    // Rate limiter and expired session cleanup (every 5 minutes)
    {
        let limiter = state.rate_limiter.clone();
        let user_service = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "Expired sessions removed"),
                    Err(e) => tracing::warn!("Failed to remove expired sessions: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Demo mode: a demo account and a few news items on an empty database
#[cfg(feature = "demo")]
async fn seed_demo_content(state: &AppState) -> Result<()> {
    use chrono::{Duration, Utc};
    use newsnotes::forms::SignupForm;
    use newsnotes::models::CreateNewsInput;

    if state.user_service.get_by_username("demo").await?.is_none() {
        state
            .user_service
            .register(SignupForm::new("demo", "demo-password"))
            .await?;
        tracing::info!("Demo user created (demo / demo-password)");
    }

    if state.news_service.count().await? == 0 {
        let today = Utc::now().date_naive();
        for index in 0..state.news_service.count_on_home_page() + 1 {
            state
                .news_service
                .create(
                    CreateNewsInput::new(format!("Новость {}", index + 1), "Просто текст.")
                        .with_date(today - Duration::days(index)),
                )
                .await?;
        }
        tracing::info!("Demo news created");
    }

    Ok(())
}
