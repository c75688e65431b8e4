// Notification HTTP routes: writer call-in, one-shot reads, live SSE
// feed, and the read-state endpoints.
//
// Live feed design:
// - Subscribe to the fan-out hub first, then send a snapshot event, so
//   nothing published in between is lost (it waits in the receiver).
// - A subscriber that falls behind channel capacity gets a fresh
//   snapshot instead of the missed backlog and reconverges from there.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::broadcast;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use caredesk_core::{
    CreateNotification, Notification, Notifier, NotifyError, Recipient, Result as NotifyResult,
};

use crate::common::ListResponse;

/// Records included in a feed snapshot and in the default list response
const SNAPSHOT_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

// ============================================
// App State and Routes
// ============================================

/// App state for notification routes
#[derive(Clone)]
pub struct AppState {
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}

/// Create notification routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/notifications", post(create_notification))
        .route(
            "/v1/notifications/:notification_id/read",
            post(mark_notification_read),
        )
        .route(
            "/v1/recipients/:recipient_id/notifications",
            get(list_notifications),
        )
        .route(
            "/v1/recipients/:recipient_id/notifications/unread-count",
            get(unread_count),
        )
        .route(
            "/v1/recipients/:recipient_id/notifications/feed",
            get(stream_feed),
        )
        .route(
            "/v1/recipients/:recipient_id/notifications/read-all",
            post(mark_all_read),
        )
        .with_state(state)
}

fn status_for(err: &NotifyError) -> StatusCode {
    match err {
        NotifyError::InvalidRecipient(_) => StatusCode::BAD_REQUEST,
        NotifyError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================
// Request/Response types
// ============================================

/// Query parameters for the notifications list
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Maximum number of records to return, newest first. Defaults to 50.
    #[param(example = 50)]
    pub limit: Option<usize>,
}

/// Derived unread count for one recipient
#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    /// Number of records with `read == false`
    pub unread: u64,
}

/// Result of a mark-all-read batch
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadAllResponse {
    /// Number of records flipped by this batch
    pub updated: usize,
}

/// Initial (and resync) payload of the SSE feed
#[derive(Debug, Serialize)]
struct FeedSnapshot {
    notifications: Vec<Notification>,
    unread: u64,
}

// ============================================
// HTTP Handlers
// ============================================

/// POST /v1/notifications - Append a notification (writer call-in)
#[utoipa::path(
    post,
    path = "/v1/notifications",
    request_body = CreateNotification,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Invalid recipient identifier"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Json(req): Json<CreateNotification>,
) -> Result<(StatusCode, Json<Notification>), StatusCode> {
    let record = state.notifier.create(req).await.map_err(|e| {
        tracing::error!("Failed to create notification: {}", e);
        status_for(&e)
    })?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/recipients/{recipient_id}/notifications - Recent records, newest first
#[utoipa::path(
    get,
    path = "/v1/recipients/{recipient_id}/notifications",
    params(
        ("recipient_id" = String, Path, description = "Recipient identifier ('admin' or a patient id)"),
        ListQuery
    ),
    responses(
        (status = 200, description = "Recent notifications", body = ListResponse<Notification>),
        (status = 400, description = "Invalid recipient identifier"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<Notification>>, StatusCode> {
    let recipient = Recipient::parse(recipient_id).map_err(|e| status_for(&e))?;
    let limit = query.limit.unwrap_or(SNAPSHOT_LIMIT).min(MAX_LIST_LIMIT);

    let records = state
        .notifier
        .list_recent(&recipient, limit)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list notifications: {}", e);
            status_for(&e)
        })?;

    Ok(Json(ListResponse::new(records)))
}

/// GET /v1/recipients/{recipient_id}/notifications/unread-count
#[utoipa::path(
    get,
    path = "/v1/recipients/{recipient_id}/notifications/unread-count",
    params(
        ("recipient_id" = String, Path, description = "Recipient identifier")
    ),
    responses(
        (status = 200, description = "Derived unread count", body = UnreadCountResponse),
        (status = 400, description = "Invalid recipient identifier"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
) -> Result<Json<UnreadCountResponse>, StatusCode> {
    let recipient = Recipient::parse(recipient_id).map_err(|e| status_for(&e))?;

    let unread = state
        .notifier
        .unread_count(&recipient)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count unread notifications: {}", e);
            status_for(&e)
        })?;

    Ok(Json(UnreadCountResponse { unread }))
}

/// POST /v1/notifications/{notification_id}/read - Flip one record to read
#[utoipa::path(
    post,
    path = "/v1/notifications/{notification_id}/read",
    params(
        ("notification_id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Record is read (idempotent)", body = Notification),
        (status = 404, description = "Notification not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, StatusCode> {
    let record = state
        .notifier
        .mark_read(notification_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark notification read: {}", e);
            status_for(&e)
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(record))
}

/// POST /v1/recipients/{recipient_id}/notifications/read-all
///
/// Flips the recipient's current unread set in one atomic batch.
/// Records arriving while the batch is prepared stay unread for the
/// next call.
#[utoipa::path(
    post,
    path = "/v1/recipients/{recipient_id}/notifications/read-all",
    params(
        ("recipient_id" = String, Path, description = "Recipient identifier")
    ),
    responses(
        (status = 200, description = "Batch applied", body = ReadAllResponse),
        (status = 400, description = "Invalid recipient identifier"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
) -> Result<Json<ReadAllResponse>, StatusCode> {
    let recipient = Recipient::parse(recipient_id).map_err(|e| status_for(&e))?;

    let updated = state
        .notifier
        .mark_all_read(&recipient)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark all notifications read: {}", e);
            status_for(&e)
        })?;

    Ok(Json(ReadAllResponse { updated }))
}

// ============================================
// SSE feed
// ============================================

async fn snapshot_event(notifier: &Notifier, recipient: &Recipient) -> NotifyResult<SseEvent> {
    let notifications = notifier.list_recent(recipient, SNAPSHOT_LIMIT).await?;
    let unread = notifier.unread_count(recipient).await?;
    let payload = FeedSnapshot {
        notifications,
        unread,
    };
    let json = serde_json::to_string(&payload).map_err(|e| NotifyError::Internal(e.into()))?;
    Ok(SseEvent::default().event("snapshot").data(json))
}

/// GET /v1/recipients/{recipient_id}/notifications/feed - Live feed (SSE)
///
/// Emits one `snapshot` event (recent records plus the unread count),
/// then `created` / `read` / `read_all` events as they happen. After a
/// lag the snapshot is re-emitted so the client reconverges.
#[utoipa::path(
    get,
    path = "/v1/recipients/{recipient_id}/notifications/feed",
    params(
        ("recipient_id" = String, Path, description = "Recipient identifier")
    ),
    responses(
        (status = 200, description = "Notification feed", content_type = "text/event-stream"),
        (status = 400, description = "Invalid recipient identifier"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn stream_feed(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, StatusCode> {
    let recipient = Recipient::parse(recipient_id).map_err(|e| status_for(&e))?;
    tracing::info!(recipient_id = %recipient, "Starting notification feed");

    // Subscribe before the snapshot so no event falls in the gap
    let rx = state.notifier.subscribe(&recipient);
    let snapshot = snapshot_event(&state.notifier, &recipient)
        .await
        .map_err(|e| {
            tracing::error!("Failed to build feed snapshot: {}", e);
            status_for(&e)
        })?;

    let notifier = state.notifier.clone();
    let live = stream::unfold(
        (rx, notifier, recipient),
        |(mut rx, notifier, recipient)| async move {
            match rx.recv().await {
                Ok(event) => {
                    let json =
                        serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                    let sse = SseEvent::default().event(event.name()).data(json);
                    Some((Ok(sse), (rx, notifier, recipient)))
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        recipient_id = %recipient,
                        skipped,
                        "Feed fell behind; resynchronizing from snapshot"
                    );
                    match snapshot_event(&notifier, &recipient).await {
                        Ok(sse) => Some((Ok(sse), (rx, notifier, recipient))),
                        Err(e) => {
                            tracing::error!("Failed to resynchronize feed: {}", e);
                            None
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        },
    );

    let stream = stream::once(async move { Ok::<_, Infallible>(snapshot) }).chain(live);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use caredesk_core::{InMemoryNotificationStore, NotificationHub, NotificationStore};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> (Router, Notifier) {
        let store: Arc<dyn NotificationStore> = Arc::new(InMemoryNotificationStore::new());
        let notifier = Notifier::new(store, Arc::new(NotificationHub::new()));
        let app = routes(AppState::new(notifier.clone()));
        (app, notifier)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn empty_post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_201_with_unread_record() {
        let (app, _) = test_app();

        let response = app
            .oneshot(post_json(
                "/v1/notifications",
                json!({
                    "recipient_id": "admin",
                    "title": "New Patient Registered",
                    "body": "Jane Doe has created an account.",
                    "kind": "new_patient",
                    "href": "/admin/patients/u123"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        let record = body_json(response).await;
        assert_eq!(record["read"], false);
        assert_eq!(record["kind"], "new_patient");
        assert_eq!(record["href"], "/admin/patients/u123");
    }

    #[tokio::test]
    async fn test_blank_recipient_is_rejected_with_400() {
        let (app, _) = test_app();

        // A whitespace-only path segment decodes to a blank identifier
        let response = app
            .oneshot(get_request("/v1/recipients/%20/notifications"))
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id_returns_404() {
        let (app, _) = test_app();

        let response = app
            .oneshot(empty_post(&format!(
                "/v1/notifications/{}/read",
                Uuid::now_v7()
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_list_applies_the_limit_newest_first() {
        let (app, notifier) = test_app();

        for title in ["a", "b", "c"] {
            notifier
                .create(CreateNotification {
                    recipient_id: "admin".to_string(),
                    title: title.to_string(),
                    body: format!("{title} body"),
                    kind: caredesk_core::NotificationKind::NewMessage,
                    href: None,
                })
                .await
                .unwrap();
        }

        let response = app
            .oneshot(get_request("/v1/recipients/admin/notifications?limit=2"))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let list = body_json(response).await;
        let data = list["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["title"], "c");
        assert_eq!(data[1]["title"], "b");
    }

    #[tokio::test]
    async fn test_read_all_reports_count_then_zero() {
        let (app, notifier) = test_app();

        for title in ["first", "second"] {
            notifier
                .create(CreateNotification {
                    recipient_id: "p1".to_string(),
                    title: title.to_string(),
                    body: format!("{title} body"),
                    kind: caredesk_core::NotificationKind::AppointmentUpdate,
                    href: None,
                })
                .await
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(empty_post("/v1/recipients/p1/notifications/read-all"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(response).await["updated"], 2);

        // Redundant second call from another surface flips nothing
        let response = app
            .clone()
            .oneshot(empty_post("/v1/recipients/p1/notifications/read-all"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["updated"], 0);

        let response = app
            .oneshot(get_request("/v1/recipients/p1/notifications/unread-count"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["unread"], 0);
    }

    #[tokio::test]
    async fn test_unread_count_only_counts_the_recipient() {
        let (app, notifier) = test_app();

        notifier
            .create(CreateNotification {
                recipient_id: "admin".to_string(),
                title: "for admin".to_string(),
                body: "b".to_string(),
                kind: caredesk_core::NotificationKind::NewAppointment,
                href: None,
            })
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/v1/recipients/p1/notifications/unread-count"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["unread"], 0);
    }

    #[tokio::test]
    async fn test_feed_responds_with_an_event_stream() {
        let (app, _) = test_app();

        // The feed never terminates, so only the response head is
        // asserted; the body is not consumed.
        let response = app
            .oneshot(get_request("/v1/recipients/admin/notifications/feed"))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/event-stream"));
    }
}
