use puckpicks::{
    auth::TokenConfig,
    config::EngineConfig,
    evaluation::MatchEvaluationCoordinator,
    leaderboard::{
        start_rank_recompute_task, InMemoryLeaderboardRepository, LeaderboardAggregator,
        LeaderboardRepository, PostgresLeaderboardRepository, RankRecalculator,
        RankRecomputeConfig,
    },
    matches::{InMemoryMatchRepository, MatchRepository, PostgresMatchRepository},
    predictions::{InMemoryPredictionRepository, PostgresPredictionRepository, PredictionRepository},
    router,
    shared::AppState,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Repositories = (
    Arc<dyn MatchRepository>,
    Arc<dyn PredictionRepository>,
    Arc<dyn LeaderboardRepository>,
);

async fn connect_repositories(config: &EngineConfig) -> Result<Repositories, sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await?;
            info!("Connected to PostgreSQL");
            Ok((
                Arc::new(PostgresMatchRepository::new(pool.clone())),
                Arc::new(PostgresPredictionRepository::new(pool.clone())),
                Arc::new(PostgresLeaderboardRepository::new(pool)),
            ))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory storage");
            Ok((
                Arc::new(InMemoryMatchRepository::new()),
                Arc::new(InMemoryPredictionRepository::new()),
                Arc::new(InMemoryLeaderboardRepository::new()),
            ))
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "puckpicks=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting puckpicks scoring engine");

    let config = EngineConfig::from_env();

    let (matches, predictions, leaderboard) = match connect_repositories(&config).await {
        Ok(repositories) => repositories,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    let coordinator = Arc::new(
        MatchEvaluationCoordinator::new(
            matches,
            predictions,
            LeaderboardAggregator::new(Arc::clone(&leaderboard)),
        )
        .with_batch_size(config.evaluation_batch_size),
    );
    let recalculator = Arc::new(RankRecalculator::new(leaderboard));

    tokio::spawn(start_rank_recompute_task(
        Arc::clone(&recalculator),
        RankRecomputeConfig {
            interval: config.rank_recompute_interval,
        },
    ));

    let app_state = AppState::new(
        coordinator,
        recalculator,
        TokenConfig::new(&config.jwt_secret, config.token_expiration_hours),
    );
    let app = router(app_state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind_addr = %config.bind_addr, error = %e, "Failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(bind_addr = %config.bind_addr, "Server running");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server stopped with error");
    }
}
