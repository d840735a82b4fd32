use anyhow::Result;
use axum::{
    Form, Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::Response,
    routing::{get, post},
};
use clap::Parser;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{convert::Infallible, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tabletalk::chat::Message;
use tabletalk::db::PostgresDatabase;
use tabletalk::providers::OllamaProvider;
use tabletalk::session::InMemorySessionStore;
use tabletalk_agent::{Agent, Config, Prompts, agent::DEFAULT_SESSION_ID};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to bind the service to
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,
}

#[derive(Clone)]
struct ServerState {
    agent: Agent,
}

#[derive(Deserialize)]
struct TurnForm {
    q: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tabletalk=info,tabletalk_agent=info,tabletalk_service=info,tower_http=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let prompts = Prompts::load(&config)?;

    info!(addr = %args.addr, ollama = %config.ollama_base_url, "starting service");

    let router_provider = OllamaProvider::new(
        config.ollama_base_url.clone(),
        config.router_model.clone(),
        Some(config.router_temperature),
    );
    let chat_provider = OllamaProvider::new(
        config.ollama_base_url.clone(),
        config.chat_model.clone(),
        Some(config.chat_temperature),
    );
    let query_builder_provider = OllamaProvider::new(
        config.ollama_base_url.clone(),
        config.query_builder_model.clone(),
        Some(config.query_builder_temperature),
    );

    let database = PostgresDatabase::connect(&config.database_url).await?;
    let store = InMemorySessionStore::new(config.session_ttl);

    let agent = Agent::new(
        Arc::new(router_provider),
        Arc::new(chat_provider),
        Arc::new(query_builder_provider),
        Arc::new(database),
        Arc::new(store),
        prompts,
    );

    let app = Router::new()
        .route("/chatbot/text-to-text", post(handle_turn))
        .route("/chatbot/history", get(handle_history))
        .route("/chatbot/clear-history", post(handle_clear_history))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(ServerState { agent });

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Streams one conversational turn as chunked plain text.
async fn handle_turn(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Form(form): Form<TurnForm>,
) -> Result<Response, (StatusCode, String)> {
    if form.q.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "q must not be empty".to_string()));
    }

    let session_id = session_id_from(&headers);
    info!(session_id = %session_id, "received turn");

    let chunks = state
        .agent
        .process_turn(form.q, session_id)
        .map(Ok::<_, Infallible>);

    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        // Keeps nginx-style proxies from buffering the chunked response.
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(chunks))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Returns the session's visible conversation: Human and AI messages only,
/// in order. System messages stay internal.
async fn handle_history(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Json<Value> {
    let session_id = session_id_from(&headers);
    let history = state.agent.history(&session_id).await;

    let data: Vec<Value> = history
        .iter()
        .filter(|m| matches!(m, Message::Human { .. } | Message::Ai { .. }))
        .map(|m| json!({ "type": m.kind(), "content": m.content() }))
        .collect();

    Json(json!({ "data": data }))
}

async fn handle_clear_history(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Json<Value> {
    let session_id = session_id_from(&headers);
    state.agent.clear_history(&session_id).await;

    Json(json!({
        "status": "success",
        "message": "Chat history cleared.",
    }))
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn session_id_from(headers: &HeaderMap) -> String {
    headers
        .get("X-Session-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}
