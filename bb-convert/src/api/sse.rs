//! Server-Sent Events for conversion progress

use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// GET /api/events query
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Only forward events for this job
    pub job_id: Option<Uuid>,
}

/// GET /api/events - SSE stream of job lifecycle events
///
/// Streams JobCreated, JobPhaseChanged, JobProgress, JobCompleted, JobFailed
/// and JobEvicted, optionally filtered to one job.
pub async fn conversion_event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(job_id = ?query.job_id, "New SSE client connected to conversion events");

    let mut rx = state.event_bus.subscribe();
    let filter = query.job_id;

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                Ok(event) = rx.recv() => {
                    if filter.map_or(true, |id| id == event.job_id()) {
                        let event_type = event.event_type();
                        match serde_json::to_string(&event) {
                            Ok(event_json) => {
                                yield Ok(Event::default().event(event_type).data(event_json));
                            }
                            Err(e) => {
                                warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                            }
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
