use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prevista_core::ValidationError;
use prevista_engine::ForecastError;
use serde::Serialize;
use tracing::{error, warn};

/// Failure body shared by every route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub erro: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forecast(ForecastError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forecast(error) => match error {
                ForecastError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ForecastError::ModelNotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
                ForecastError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
                ForecastError::Validation(_) | ForecastError::InvalidLags { .. } => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Forecast(error) => error.to_string(),
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(error: ForecastError) -> Self {
        Self::Forecast(error)
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let erro = self.message();
        if status.is_server_error() {
            let code = match &self {
                Self::Forecast(error) => error.code(),
                Self::BadRequest(_) => "api.bad_request",
            };
            error!(%status, code, "{erro}");
        } else {
            warn!(%status, "{erro}");
        }
        (status, Json(ErrorBody { erro })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prevista_core::Ticker;

    #[test]
    fn forecast_taxonomy_maps_to_statuses() {
        let ticker = Ticker::parse("BBAS3").expect("ticker");
        let cases = [
            (
                ForecastError::InsufficientData {
                    ticker: ticker.clone(),
                    detail: "no stored history".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ForecastError::ModelNotReady {
                    ticker: ticker.clone(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ForecastError::ModelNotFound {
                    ticker: ticker.clone(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ForecastError::ModelArtifactMissing {
                    path: "/tmp/BBAS3_model.json".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ForecastError::Validation(ValidationError::EmptyTicker),
                StatusCode::BAD_REQUEST,
            ),
            (
                ForecastError::InvalidLags {
                    n_lags: 0,
                    max: 250,
                },
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
    }
}
