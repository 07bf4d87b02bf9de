//! Herald alert router.
//!
//! Consumes news events from an inbound stream, matches each one against
//! every subscriber's interest tags, and appends a personalized alert to the
//! outbound stream for every match.
//!
//! The pipeline is assembled from injected parts so each store can be
//! replaced:
//!
//! - [`consumer::StreamConsumer`] reads one record at a time and removes it
//!   once decoded.
//! - [`dispatch::DispatchScheduler`] pages through subscribers and fans
//!   matching out to a [`worker::WorkerPool`].
//! - [`herald_stream::AlertPublisher`] appends alerts.
//!
//! An optional `/health` endpoint exposes [`stats::PipelineStats`].

pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod stats;
pub mod worker;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use stats::PipelineStats;

/// Health check handler.
async fn health(State(stats): State<Arc<PipelineStats>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "stats": stats.snapshot(),
    }))
}

/// Builds the health router.
pub fn app(stats: Arc<PipelineStats>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(stats)
}
