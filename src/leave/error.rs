use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use strum::{AsRefStr, Display};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::leave_balance::AvailableBalance;
use crate::store::StoreError;

/// Machine-readable error category carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InsufficientBalance,
    Invalid,
    Internal,
}

#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("employee {0} not found")]
    EmployeeNotFound(u64),

    #[error("leave type {0} not found")]
    LeaveTypeNotFound(u64),

    #[error("no leave balance for employee {employee_id} and leave type {leave_type_id}")]
    BalanceNotFound {
        employee_id: u64,
        leave_type_id: u64,
        available: Vec<AvailableBalance>,
    },

    #[error("no leave balances found for employee {0}")]
    NoBalances(u64),

    /// Any other missing resource (department, leave request, ...).
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(
        "insufficient leave balance: requested {requested_days} day(s) but only {current_balance} remaining"
    )]
    InsufficientBalance {
        current_balance: f64,
        requested_days: u32,
        available: Vec<AvailableBalance>,
    },

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type LeaveResult<T> = Result<T, LeaveError>;

impl From<sqlx::Error> for LeaveError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(StoreError::from(err))
    }
}

impl LeaveError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn already_processed(request_id: u64, status: &str) -> Self {
        Self::conflict(format!("Leave request {request_id} is already {status}"))
    }

    /// Body-deserialization failures from actix extractors.
    pub fn from_extractor(err: impl std::fmt::Display) -> actix_web::Error {
        Self::invalid(err.to_string()).into()
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmployeeNotFound(_)
            | Self::LeaveTypeNotFound(_)
            | Self::BalanceNotFound { .. }
            | Self::NoBalances(_)
            | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// State the caller can act on: what does exist, and by how much a request overshot.
    pub fn debug(&self) -> Option<Value> {
        match self {
            Self::EmployeeNotFound(employee_id) => Some(json!({ "employee_id": employee_id })),
            Self::LeaveTypeNotFound(leave_type_id) => {
                Some(json!({ "leave_type_id": leave_type_id }))
            }
            Self::BalanceNotFound {
                employee_id,
                leave_type_id,
                available,
            } => Some(json!({
                "employee_id": employee_id,
                "requested_leave_type_id": leave_type_id,
                "available_leave_type_ids": available.iter().map(|b| b.leave_type_id).collect::<Vec<_>>(),
                "available_balances": available,
            })),
            Self::NoBalances(employee_id) => Some(json!({
                "employee_id": employee_id,
                "available_balances": [],
            })),
            Self::InsufficientBalance {
                current_balance,
                requested_days,
                available,
            } => Some(json!({
                "current_balance": current_balance,
                "requested_days": requested_days,
                "available_balances": available,
            })),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "kind": "insufficient_balance",
    "message": "insufficient leave balance: requested 11 day(s) but only 10 remaining",
    "debug": {
        "current_balance": 10.0,
        "requested_days": 11,
        "available_balances": [
            { "leave_type_id": 1, "leave_type_name": "annual", "balance": 10.0 }
        ]
    }
}))]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub debug: Option<Value>,
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InsufficientBalance | ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = if self.kind() == ErrorKind::Internal {
            // don't leak driver messages
            tracing::error!(error = %self, "request failed on storage");
            ErrorBody {
                kind: ErrorKind::Internal,
                message: "Internal Server Error".to_string(),
                debug: None,
            }
        } else {
            ErrorBody {
                kind: self.kind(),
                message: self.to_string(),
                debug: self.debug(),
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;

    fn annual(balance: f64) -> AvailableBalance {
        AvailableBalance {
            leave_type_id: 1,
            leave_type_name: "annual".to_string(),
            balance,
        }
    }

    #[rstest]
    #[case(LeaveError::EmployeeNotFound(7), StatusCode::NOT_FOUND)]
    #[case(LeaveError::NoBalances(7), StatusCode::NOT_FOUND)]
    #[case(LeaveError::conflict("duplicate"), StatusCode::CONFLICT)]
    #[case(LeaveError::invalid("bad quota"), StatusCode::BAD_REQUEST)]
    #[case(
        LeaveError::InsufficientBalance { current_balance: 1.0, requested_days: 2, available: vec![] },
        StatusCode::BAD_REQUEST
    )]
    #[case(LeaveError::Storage(StoreError::query("boom")), StatusCode::INTERNAL_SERVER_ERROR)]
    fn kinds_map_to_status_codes(#[case] error: LeaveError, #[case] status: StatusCode) {
        assert_eq!(error.status_code(), status);
    }

    #[actix_web::test]
    async fn insufficient_balance_body_reports_state() {
        let error = LeaveError::InsufficientBalance {
            current_balance: 10.0,
            requested_days: 11,
            available: vec![annual(10.0)],
        };

        let response = error.error_response();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["kind"], "insufficient_balance");
        assert_eq!(value["debug"]["current_balance"], 10.0);
        assert_eq!(value["debug"]["requested_days"], 11);
        assert_eq!(value["debug"]["available_balances"][0]["leave_type_name"], "annual");
    }

    #[actix_web::test]
    async fn missing_balance_lists_available_leave_types() {
        let error = LeaveError::BalanceNotFound {
            employee_id: 3,
            leave_type_id: 9,
            available: vec![annual(4.0)],
        };

        let bytes = to_bytes(error.error_response().into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["kind"], "not_found");
        assert_eq!(value["debug"]["requested_leave_type_id"], 9);
        assert_eq!(value["debug"]["available_leave_type_ids"], json!([1]));
    }

    #[actix_web::test]
    async fn storage_errors_are_redacted() {
        let error = LeaveError::from(StoreError::connection("mysql://user:secret@db"));

        let bytes = to_bytes(error.error_response().into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["kind"], "internal");
        assert_eq!(value["message"], "Internal Server Error");
        assert!(value.get("debug").is_none());
    }
}
