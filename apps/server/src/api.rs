//! HTTP control API.
//!
//! Reads status and settings, merges settings updates, starts and stops the
//! engine, and serves the tail of both journals.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tickarb_core::{BotConfig, BotStatus, ConfigPatch};
use tickarb_executor::{ExecutionEngine, ExecutorError};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Number of trade-log lines returned by `/api/logs`.
pub const LOG_TAIL_LINES: usize = 50;

/// Reply to a command (`start`, `stop`, `config` update).
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<BotConfig>,
}

impl CommandResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            config: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            config: None,
        }
    }
}

type CommandReply = (StatusCode, Json<CommandResponse>);

/// `/api/status` body: the engine status plus the uptime of the current run.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: BotStatus,
    pub uptime_secs: i64,
}

pub fn create_router(engine: ExecutionEngine) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/start", post(start_bot))
        .route("/api/stop", post(stop_bot))
        .route("/api/logs", get(get_logs))
        .route("/api/opportunities", get(get_opportunities))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(engine)
}

/// Bind the control API and serve it in the background.
pub async fn start_api_server(
    engine: ExecutionEngine,
    port: u16,
) -> Result<tokio::task::JoinHandle<()>, std::io::Error> {
    let app = create_router(engine);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Control API listening on http://{}", addr);

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Control API server error: {}", e);
        }
    }))
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn get_status(State(engine): State<ExecutionEngine>) -> Json<StatusResponse> {
    let status = engine.status().snapshot().await;
    Json(StatusResponse {
        uptime_secs: status.uptime_secs(Utc::now()),
        status,
    })
}

async fn get_config(State(engine): State<ExecutionEngine>) -> Json<BotConfig> {
    Json(engine.config().snapshot().await)
}

async fn update_config(
    State(engine): State<ExecutionEngine>,
    body: Result<Json<ConfigPatch>, JsonRejection>,
) -> CommandReply {
    let patch = match body {
        Ok(Json(patch)) => patch,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected settings update");
            return (
                StatusCode::BAD_REQUEST,
                Json(CommandResponse::error(rejection.body_text())),
            );
        }
    };

    match engine.config().merge(patch).await {
        Ok(config) => {
            info!(?config, "Settings updated");
            let mut reply = CommandResponse::success("Configuration updated");
            reply.config = Some(config);
            (StatusCode::OK, Json(reply))
        }
        Err(e) => {
            warn!(error = %e, "Rejected settings update");
            (
                StatusCode::BAD_REQUEST,
                Json(CommandResponse::error(e.to_string())),
            )
        }
    }
}

async fn start_bot(State(engine): State<ExecutionEngine>) -> CommandReply {
    match engine.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(CommandResponse::success("Bot started successfully")),
        ),
        Err(e @ ExecutorError::AlreadyRunning) => {
            (StatusCode::CONFLICT, Json(CommandResponse::error(e.to_string())))
        }
    }
}

async fn stop_bot(State(engine): State<ExecutionEngine>) -> CommandReply {
    let message = if engine.stop().await {
        "Bot stopped successfully"
    } else {
        "Bot is not running"
    };
    (StatusCode::OK, Json(CommandResponse::success(message)))
}

async fn get_logs(State(engine): State<ExecutionEngine>) -> impl IntoResponse {
    match engine.trades().tail(LOG_TAIL_LINES).await {
        Ok(logs) => (StatusCode::OK, Json(json!({ "logs": logs }))),
        Err(e) => {
            error!(error = %e, "Failed to read trade log");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "logs": [], "error": e.to_string() })),
            )
        }
    }
}

async fn get_opportunities(State(engine): State<ExecutionEngine>) -> impl IntoResponse {
    match engine.opportunities().read_all().await {
        Ok(entries) => (StatusCode::OK, Json(json!(entries))),
        Err(e) => {
            error!(error = %e, "Failed to read opportunity log");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tickarb_alerts::Notifier;
    use tickarb_core::{Exchange, Symbol};
    use tickarb_executor::ConfigHandle;
    use tickarb_feeds::{MockGateway, MockProvider};
    use tickarb_journal::{OpportunityLog, TradeLog};

    fn engine(dir: &tempfile::TempDir) -> ExecutionEngine {
        let btc = Symbol::new("BTC", "USDT").unwrap();
        let provider = MockProvider::new(vec![
            Arc::new(MockGateway::new(Exchange::Binance).with_market(&btc, 100.0, 10.0)),
            Arc::new(MockGateway::new(Exchange::Kucoin).with_market(&btc, 100.5, 10.0)),
        ]);
        let config = BotConfig {
            symbols: vec![btc],
            exchanges: vec![Exchange::Binance, Exchange::Kucoin],
            ..Default::default()
        };
        ExecutionEngine::new(
            Arc::new(provider),
            ConfigHandle::new(config),
            Arc::new(OpportunityLog::new(dir.path().join("opportunities.json"))),
            Arc::new(TradeLog::new(dir.path().join("trades.log"))),
            Notifier::log_only(),
        )
    }

    #[tokio::test]
    async fn test_start_then_start_again_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let (code, Json(reply)) = start_bot(State(engine.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(reply.status, "success");
        let Json(body) = get_status(State(engine.clone())).await;
        assert!(body.status.running);
        assert!(body.uptime_secs >= 0);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["running"], true);
        assert!(json.get("uptime_secs").is_some());

        let (code, Json(reply)) = start_bot(State(engine.clone())).await;
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(reply.status, "error");
        assert_eq!(reply.message, "Bot is already running");

        engine.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let (code, Json(reply)) = stop_bot(State(engine.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(reply.status, "success");
        assert_eq!(reply.message, "Bot is not running");

        start_bot(State(engine.clone())).await;
        let (_, Json(reply)) = stop_bot(State(engine.clone())).await;
        assert_eq!(reply.message, "Bot stopped successfully");
        let Json(body) = get_status(State(engine)).await;
        assert!(!body.status.running);
        assert_eq!(body.uptime_secs, 0);
    }

    #[tokio::test]
    async fn test_config_update_merges() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        let patch = ConfigPatch {
            min_profit: Some(3.0),
            check_interval_seconds: Some(30),
            ..Default::default()
        };

        let (code, Json(reply)) = update_config(State(engine.clone()), Ok(Json(patch))).await;
        assert_eq!(code, StatusCode::OK);
        let merged = reply.config.unwrap();
        assert_eq!(merged.min_profit, 3.0);

        let Json(current) = get_config(State(engine)).await;
        assert_eq!(current, merged);
        assert_eq!(current.check_interval_seconds, 30);
        assert_eq!(current.exchanges, vec![Exchange::Binance, Exchange::Kucoin]);
    }

    #[tokio::test]
    async fn test_invalid_config_update_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        let before = engine.config().snapshot().await;
        let patch = ConfigPatch {
            trade_amount: Some(0.0),
            ..Default::default()
        };

        let (code, Json(reply)) = update_config(State(engine.clone()), Ok(Json(patch))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(reply.status, "error");
        assert_eq!(engine.config().snapshot().await, before);
    }

    #[tokio::test]
    async fn test_journals_empty_before_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let logs = get_logs(State(engine.clone())).await.into_response();
        assert_eq!(logs.status(), StatusCode::OK);
        let opportunities = get_opportunities(State(engine)).await.into_response();
        assert_eq!(opportunities.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health_handler().await, "OK");
    }
}
