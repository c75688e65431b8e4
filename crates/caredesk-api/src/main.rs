// CareDesk notification API server
// Decision: Authorization is delegated to the platform edge; the service trusts its caller
// Notifications are a best-effort side channel: domain actions never block on them

mod common;
mod notifications;
mod sweeper;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use caredesk_core::{Notification, NotificationHub, NotificationKind, NotificationStore, Notifier};
use caredesk_storage::{Database, DbNotificationStore};

use common::ListResponse;
use notifications::{ReadAllResponse, UnreadCountResponse};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    retention_days: Option<i64>,
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    retention_days: Option<i64>,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        retention_days: state.retention_days,
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        notifications::create_notification,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_notification_read,
        notifications::mark_all_read,
        notifications::stream_feed,
    ),
    components(
        schemas(
            Notification, NotificationKind,
            caredesk_core::CreateNotification,
            ListResponse<Notification>,
            UnreadCountResponse,
            ReadAllResponse,
        )
    ),
    tags(
        (name = "notifications", description = "Notification writer, feed, and read-state endpoints")
    ),
    info(
        title = "CareDesk Notification API",
        version = "0.2.0",
        description = "Per-recipient notification store with live feeds and read-state reconciliation",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caredesk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("caredesk-api starting...");

    // Initialize database
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let db = Database::from_url(&database_url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    tracing::info!("Connected to database");

    // Wire the store, hub, and shared notifier
    let store: Arc<dyn NotificationStore> = Arc::new(DbNotificationStore::new(db));
    let hub = Arc::new(NotificationHub::new());
    let notifier = Notifier::new(store.clone(), hub);

    // Retention is opt-in: unset keeps records forever
    let retention_days =
        parse_retention_days(std::env::var("NOTIFICATION_RETENTION_DAYS").ok().as_deref());
    match retention_days {
        Some(days) => {
            tracing::info!(days, "Retention sweep enabled");
            sweeper::spawn(store.clone(), chrono::Duration::days(days));
        }
        None => tracing::info!("Retention sweep disabled (records are kept forever)"),
    }

    // Load CORS allowed origins from environment (optional)
    // Only needed when the dashboard is served from a different origin
    // Example: CORS_ALLOWED_ORIGINS="https://app.example.com,https://admin.example.com"
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    // Create module-specific states
    let notifications_state = notifications::AppState::new(notifier);
    let health_state = HealthState { retention_days };

    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(notifications::routes(notifications_state))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ]),
        )
    } else {
        app
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    // Bind and serve
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "caredesk-api listening");

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}

/// Parse the retention window from NOTIFICATION_RETENTION_DAYS.
/// Unset disables retention; a value that is not a positive integer is
/// rejected loudly instead of silently turning the purge off.
fn parse_retention_days(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    match raw.parse::<i64>() {
        Ok(days) if days > 0 => Some(days),
        _ => {
            tracing::warn!(
                value = %raw,
                "Ignoring invalid NOTIFICATION_RETENTION_DAYS (expected a positive integer); retention disabled"
            );
            None
        }
    }
}
