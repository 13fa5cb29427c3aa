use crate::config::ConfigError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use crate::workflows::billing::BillingError;
use crate::workflows::contracts::ContractError;
use crate::workflows::moderation::ModerationError;
use crate::workflows::occupancy::LedgerError;
use crate::workflows::tenants::DirectoryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Top-level error: startup failures plus the HTTP-facing taxonomy
/// (not found, conflict, validation, unexpected).
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    NotFound(String),
    Conflict(String),
    Validation(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Validation(msg)
            | AppError::Internal(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "success": false, "message": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Unavailable(msg) => Self::Internal(msg),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Store(err) => err.into(),
            LedgerError::RoomOccupied(msg) => Self::Conflict(msg),
        }
    }
}

impl From<DirectoryError> for AppError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::Validation(msg) => Self::Validation(msg),
            DirectoryError::Store(err) => err.into(),
            DirectoryError::Ledger(err) => err.into(),
        }
    }
}

impl From<ContractError> for AppError {
    fn from(value: ContractError) -> Self {
        match value {
            ContractError::Validation(msg) => Self::Validation(msg),
            ContractError::InvalidTransition { .. } => Self::Conflict(value.to_string()),
            ContractError::Store(err) => err.into(),
        }
    }
}

impl From<BillingError> for AppError {
    fn from(value: BillingError) -> Self {
        match value {
            BillingError::Validation(msg) => Self::Validation(msg),
            BillingError::InvalidTransition { .. } => Self::Conflict(value.to_string()),
            BillingError::UnpayBlocked(msg) => Self::Conflict(msg),
            BillingError::Store(err) => err.into(),
        }
    }
}

impl From<ModerationError> for AppError {
    fn from(value: ModerationError) -> Self {
        match value {
            ModerationError::AlreadyProcessed => Self::Conflict(value.to_string()),
            ModerationError::UnknownLabel(_) => Self::Validation(value.to_string()),
            ModerationError::Validation(msg) => Self::Validation(msg),
            ModerationError::Store(err) => err.into(),
        }
    }
}
