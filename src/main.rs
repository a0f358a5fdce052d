use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod routes;
mod services;

use config::Config;
use services::cache::EventCache;
use services::email::{EmailJsMailer, Mailer};
use services::events::EventFeedManager;
use services::feed::FeedFetcher;
use services::init;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub feed: FeedFetcher,
    pub cache: EventCache,
    pub mailer: Arc<dyn Mailer>,
    /// Single-flight guard for background feed refreshes.
    pub refresh_in_flight: AtomicBool,
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Session bootstrap
        .nest("/api/auth", routes::auth::router())
        // Merged event views, export payloads, direct admin writes
        .nest("/api/events", routes::events::router())
        // New-event request workflow
        .nest("/api/requests", routes::requests::router())
        // Edit proposal workflow
        .nest("/api/edits", routes::edits::router())
        // Attendance
        .nest("/api/going", routes::going::router())
        // Notification feeds
        .nest("/api/notifications", routes::notifications::router())
        .nest(
            "/api/admin/notifications",
            routes::notifications::admin_router(),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "events_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Events Hub Service");

    // Initialize database
    let pool = init::init_db(&config).await?;

    let app_state = Arc::new(AppState {
        db: pool,
        feed: FeedFetcher::new(&config.feed),
        cache: EventCache::new(Duration::from_secs(config.feed.cache_ttl_seconds)),
        mailer: Arc::new(EmailJsMailer::new(config.email.clone())),
        refresh_in_flight: AtomicBool::new(false),
        config: config.clone(),
    });

    // Warm the cache before accepting traffic; failures degrade to empty
    let warmed = EventFeedManager::refresh(&app_state).await;
    tracing::info!("Initial feed refresh complete: {} events", warmed.len());

    // Create shutdown notifier for background workers
    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    // Spawn background workers (returns JoinHandles so we can await shutdown)
    let bg_handles = init::spawn_background_workers(app_state.clone(), shutdown_tx.clone());

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .server
                .frontend_url
                .parse::<HeaderValue>()
                .expect("Invalid FRONTEND_URL for CORS"),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ]);

    let app = build_router(app_state.clone()).layer(cors);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(listener, app);

    let shutdown_tx_clone = shutdown_tx.clone();
    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut term =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to bind SIGTERM");
            tokio::select! {
                _ = ctrl_c => {},
                _ = term.recv() => {},
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("Failed to bind Ctrl+C");
        }

        tracing::info!("Shutdown signal received, notifying background workers");
        let _ = shutdown_tx_clone.send(());
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Signal handler completed; server future dropped to stop accepting new connections");
        }
    }

    // Give background workers some time to finish their work.
    let shutdown_wait = Duration::from_secs(10);
    let bg_wait = async {
        for handle in bg_handles {
            let _ = handle.await;
        }
    };
    let _ = tokio::time::timeout(shutdown_wait, bg_wait).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use routes::auth::AuthClaims;
    use services::email::NoopMailer;
    use tower::ServiceExt;

    const TEST_SECRET: &str = "test-secret";

    async fn test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.jwt.secret = TEST_SECRET.to_string();
        // No proxies and a blank URL: feed fetches fail fast in tests
        config.feed.calendar_url = "http://127.0.0.1:0/basic.ics".to_string();
        config.feed.cors_proxies = Vec::new();

        Arc::new(AppState {
            db: db::memory_pool().await,
            feed: FeedFetcher::new(&config.feed),
            cache: EventCache::new(Duration::from_secs(config.feed.cache_ttl_seconds)),
            mailer: Arc::new(NoopMailer),
            refresh_in_flight: AtomicBool::new(false),
            config,
        })
    }

    fn token(user_id: &str, admin: bool) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = AuthClaims {
            sub: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            name: Some("Test User".to_string()),
            admin,
            iat: now,
            exp: now + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .expect("failed to encode test token")
    }

    #[tokio::test]
    async fn health_check_responds() {
        let app = build_router(test_state().await);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn notifications_require_auth() {
        let app = build_router(test_state().await);

        let response = app
            .oneshot(Request::get("/api/notifications").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn pending_queue_is_admin_only() {
        let state = test_state().await;

        let response = build_router(state.clone())
            .oneshot(
                Request::get("/api/requests/pending")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token("user-1", false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = build_router(state)
            .oneshot(
                Request::get("/api/requests/pending")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token("admin", true)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_and_decide_request_end_to_end() {
        let state = test_state().await;

        let body = serde_json::json!({
            "title": "Beach Day",
            "description": "Sunscreen provided",
            "event_date": "2099-07-04",
            "event_time": "12:00",
            "location": "Pier 7"
        });

        let response = build_router(state.clone())
            .oneshot(
                Request::post("/api/requests")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token("user-1", false)))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let submitted: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let id = submitted["id"].as_str().unwrap().to_string();

        // Rejection without notes is rejected at the workflow boundary
        let response = build_router(state.clone())
            .oneshot(
                Request::post(format!("/api/requests/{}/decision", id))
                    .header(header::AUTHORIZATION, format!("Bearer {}", token("admin", true)))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({"status": "rejected", "admin_notes": ""}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = build_router(state)
            .oneshot(
                Request::post(format!("/api/requests/{}/decision", id))
                    .header(header::AUTHORIZATION, format!("Bearer {}", token("admin", true)))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({"status": "approved"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
