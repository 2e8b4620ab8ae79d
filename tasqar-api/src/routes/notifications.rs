/// Notification endpoints and the live notification stream
///
/// - `GET /api/notifications` - Newest first (`?unread_only=true`)
/// - `PATCH /api/notifications/:id/read` - Mark one as read
/// - `POST /api/notifications/read-all` - Mark all as read
/// - `DELETE /api/notifications/:id` - Delete one
/// - `GET /api/notifications/sse` - Server-Sent Events stream
///
/// # SSE Event Format
///
/// ```text
/// data: [{"id":"...","type":"TASK_ASSIGNED","message":"...","read":false,...}]
///
/// ```
///
/// The current list is sent as soon as the stream opens and again on every
/// poll interval. If a poll fails, one `event: error` frame is sent and the
/// stream ends; the browser's `EventSource` reconnects on its own.
///
/// `EventSource` can't set headers, so this route also accepts the access
/// token as `?token=`.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, future::Future, time::Duration};
use tasqar_shared::{
    auth::middleware::AuthContext,
    models::notification::Notification,
    services::{notification_service, ServiceResult},
};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Query parameters for listing notifications
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// Response of `read-all`
#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications =
        notification_service::list(&state.db, auth.user_id, query.unread_only).await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let notification = notification_service::mark_read(&state.db, auth.user_id, id).await?;
    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let updated = notification_service::mark_all_read(&state.db, auth.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    notification_service::delete(&state.db, auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Opens the notification stream for the caller
///
/// Authentication happens in the middleware, so an invalid token gets a
/// plain 401 before any stream is opened.
pub async fn notification_stream(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let period = state.config.notifications.poll_interval();
    let pool = state.db.clone();
    let user_id = auth.user_id;

    tracing::info!(user_id = %user_id, interval_secs = period.as_secs(), "Notification stream opened");

    let stream = poll_stream(period, move || {
        let pool = pool.clone();
        async move { notification_service::list(&pool, user_id, false).await }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(25)))
}

/// One `data:` frame carrying the whole list
fn list_event(notifications: &[Notification]) -> Event {
    Event::default()
        .json_data(notifications)
        .unwrap_or_else(|_| error_event())
}

fn error_event() -> Event {
    Event::default()
        .event("error")
        .data("Failed to load notifications")
}

/// Calls `load` immediately and then once per `period`, yielding a frame
/// each time
///
/// The stream ends after the first failed load. Dropping it (client gone)
/// drops the interval with it.
fn poll_stream<F, Fut>(period: Duration, load: F) -> impl Stream<Item = Result<Event, Infallible>>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ServiceResult<Vec<Notification>>> + Send,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    stream::unfold(Some((ticker, load)), |state| async move {
        let (mut ticker, mut load) = state?;

        // The first tick completes immediately
        ticker.tick().await;

        match load().await {
            Ok(notifications) => Some((Ok(list_event(&notifications)), Some((ticker, load)))),
            Err(e) => {
                tracing::warn!(error = %e, "Notification poll failed; closing stream");
                Some((Ok(error_event()), None))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use chrono::Utc;
    use futures::StreamExt;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tasqar_shared::{models::notification::NotificationType, services::ServiceError};

    fn notification(message: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: NotificationType::TaskAssigned,
            message: message.to_string(),
            read: false,
            related_id: None,
            created_at: Utc::now(),
        }
    }

    async fn body_text(stream: impl Stream<Item = Result<Event, Infallible>> + Send + 'static) -> String {
        let response = Sse::new(stream).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_frame_is_immediate() {
        let mut stream = Box::pin(poll_stream(Duration::from_secs(5), || async {
            Ok::<_, ServiceError>(vec![notification("hello")])
        }));

        let started = tokio::time::Instant::now();
        assert!(stream.next().await.is_some());
        assert_eq!(started.elapsed(), Duration::ZERO);

        assert!(stream.next().await.is_some());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_carry_json_list_then_error_ends_stream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let stream = poll_stream(Duration::from_secs(5), move || {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Ok(vec![notification(&format!("n{call}"))])
                } else {
                    Err(ServiceError::Database(sqlx::Error::PoolTimedOut))
                }
            }
        });

        let body = body_text(stream).await;
        let frames: Vec<&str> = body.split("\n\n").filter(|f| !f.is_empty()).collect();

        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("data: ["));
        assert!(frames[0].contains(r#""message":"n0""#));
        assert!(frames[0].contains(r#""type":"TASK_ASSIGNED""#));
        assert!(frames[1].contains(r#""message":"n1""#));
        assert!(frames[2].contains("event: error"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_list_frame() {
        let mut stream = Box::pin(poll_stream(Duration::from_secs(5), || async { Ok::<_, ServiceError>(vec![]) }));
        let first = stream.next().await.unwrap().unwrap();

        let body = body_text(stream::iter(vec![Ok(first)])).await;
        assert_eq!(body, "data: []\n\n");
    }
}
