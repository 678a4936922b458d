//! Tarot Lambda - Handles POST /api/tarot.
//!
//! Parses the reading request, runs the reading pipeline and returns the
//! reading envelope. Generation failures never surface as errors here: the
//! pipeline answers with its fallback reading. Only a cold-start fault (no API
//! key, unreadable prompt templates) produces a 500.

use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_response, json_response};
use shared::{
    resolve_api_key, Config, DeepSeekClient, Generator, ReadingPipeline, ReadingRequest,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState<G> {
    /// Holds the cold-start fault when the pipeline could not be built
    pipeline: shared::Result<ReadingPipeline<G>>,
}

impl AppState<DeepSeekClient> {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        Ok(Self::build(&config, resolve_api_key().await))
    }

    fn build(config: &Config, api_key: shared::Result<String>) -> Self {
        let pipeline = api_key
            .and_then(|key| DeepSeekClient::new(config, key))
            .and_then(|client| ReadingPipeline::from_config(config, client));

        if let Err(e) = &pipeline {
            error!("Failed to build reading pipeline: {}", e);
        }

        Self { pipeline }
    }
}

async fn handler<G: Generator>(state: Arc<AppState<G>>, event: Request) -> Result<Response<Body>, Error> {
    if *event.method() != Method::POST {
        return error_response(405, "Method not allowed");
    }

    let pipeline = match &state.pipeline {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Rejecting request, function is misconfigured: {}", e);
            return error_response(500, e.to_string());
        }
    };

    let request: ReadingRequest = shared::parse_body!(event.body());

    info!(
        query = %request.query,
        cards = request.cards.len(),
        mode = ?request.mode(),
        "Reading requested"
    );

    let response = pipeline.run(&request).await;

    info!(
        elapsed_ms = response.elapsed_ms,
        fallback = response.notice.is_some(),
        "Reading complete"
    );

    json_response(200, &response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
