//! # Prevista Web
//!
//! HTTP surface over [`ForecastEngine`]. Every route takes the ticker as a
//! path segment, normalizes it to upper case and answers JSON.
//!
//! | Route | Body on success |
//! |-------|-----------------|
//! | `GET /` | `{status}` |
//! | `GET /prever/:ticker` | `{ticker, open_price_previsto}` |
//! | `GET /treinar/:ticker` | `{ticker, mensagem, logs}` |
//! | `GET /destreinar/:ticker` | `{ticker, mensagem}` |
//!
//! Failures answer `{erro}` with a status derived from the engine error.

pub mod api;
pub mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use prevista_engine::ForecastEngine;
use tower_http::cors::{Any, CorsLayer};

pub use error::{ApiError, ErrorBody};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ForecastEngine>,
}

impl AppState {
    pub fn new(engine: ForecastEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(api::health_handler))
        .route("/prever/:ticker", get(api::predict_handler))
        .route("/treinar/:ticker", get(api::train_handler))
        .route("/destreinar/:ticker", get(api::remove_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(engine: ForecastEngine, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "prevista API listening");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use prevista_core::domain::calendar::today_utc;
    use prevista_core::{DailyBarsRequest, MarketDataSource, ProviderBar, SourceError};
    use prevista_engine::EngineConfig;
    use serde_json::Value;
    use std::future::Future;
    use std::pin::Pin;
    use tempfile::{tempdir, TempDir};
    use time::Duration;
    use tower::ServiceExt;

    struct SyntheticSource {
        days: i64,
    }

    impl MarketDataSource for SyntheticSource {
        fn id(&self) -> &'static str {
            "synthetic"
        }

        fn daily_bars<'a>(
            &'a self,
            req: DailyBarsRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ProviderBar>, SourceError>> + Send + 'a>> {
            Box::pin(async move {
                let first = today_utc() - Duration::days(self.days);
                Ok((0..self.days)
                    .map(|i| {
                        let t = i as f64;
                        let open = 18.0 + (t / 6.0).sin() * 1.5 + t * 0.02;
                        ProviderBar::new(
                            first + Duration::days(i),
                            Some(open),
                            Some(open + 0.5 + (t / 3.0).cos().abs() * 0.1),
                            Some(open - 0.4 - (t / 5.0).sin().abs() * 0.1),
                            Some(open + (t / 2.0).cos() * 0.2),
                            Some(9.0e4 + (t * 1.1).sin() * 1.5e4),
                        )
                    })
                    .filter(|bar| req.contains(bar.date))
                    .collect())
            })
        }
    }

    fn app(days: i64) -> (TempDir, Router) {
        let temp = tempdir().expect("tempdir");
        let engine = ForecastEngine::open(
            EngineConfig::under(temp.path()),
            Arc::new(SyntheticSource { days }),
        )
        .expect("engine");
        (temp, router(AppState::new(engine)))
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn root_reports_status() {
        let (_temp, app) = app(0);
        let (status, body) = get_json(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["status"].is_string());
    }

    #[tokio::test]
    async fn prever_trains_on_first_use_and_rounds_the_price() {
        let (_temp, app) = app(90);

        let (status, body) = get_json(&app, "/prever/petr4").await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["ticker"], "PETR4");
        let price = body["open_price_previsto"].as_f64().expect("price");
        assert_eq!(price, (price * 10_000.0).round() / 10_000.0);
    }

    #[tokio::test]
    async fn treinar_returns_logs_then_destreinar_removes() {
        let (temp, app) = app(90);

        let (status, body) = get_json(&app, "/treinar/VALE3?lags=2").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["mensagem"].as_str().expect("mensagem").contains("trained"));
        let logs = body["logs"].as_array().expect("logs");
        assert!(logs.iter().any(|l| l.as_str().is_some_and(|l| l.contains("MSE="))));
        assert!(temp.path().join("models").join("VALE3_model.json").is_file());

        let (status, body) = get_json(&app, "/destreinar/vale3").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["ticker"], "VALE3");
        assert!(!temp.path().join("models").join("VALE3_model.json").exists());
    }

    #[tokio::test]
    async fn destreinar_unknown_ticker_is_not_found() {
        let (_temp, app) = app(0);
        let (status, body) = get_json(&app, "/destreinar/ABEV3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["erro"].as_str().expect("erro").contains("ABEV3"));
    }

    #[tokio::test]
    async fn treinar_without_history_is_unprocessable() {
        let (_temp, app) = app(0);
        let (status, body) = get_json(&app, "/treinar/NADA3").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["erro"].is_string());
    }

    #[tokio::test]
    async fn invalid_ticker_or_lags_is_bad_request() {
        let (_temp, app) = app(0);

        let (status, _) = get_json(&app, "/prever/4PETR").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(&app, "/prever/PETR4?lags=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["erro"].as_str().expect("erro").contains("lags"));

        let huge = format!("/prever/PETR4?lags={}", usize::MAX);
        let (status, body) = get_json(&app, &huge).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["erro"].as_str().expect("erro").contains("at most"));

        let (status, _) = get_json(&app, "/treinar/PETR4?lags=251").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
