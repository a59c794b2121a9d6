//! Storage port for leave accounting.
//!
//! The engine only sees [`LeaveStore`]; the server wires in the MySQL adapter
//! and tests use the in-memory one.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::employee::Employee;
use crate::model::leave_balance::BalanceRecord;
use crate::model::leave_request::LeaveRequest;
use crate::model::leave_type::LeaveType;

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[cfg(test)]
pub use memory::InMemoryLeaveStore;
pub use mysql::MySqlLeaveStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("leave store connection failed: {message}")]
    Connection { message: String },
    #[error("leave store query failed: {message}")]
    Query { message: String },
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::connection(err.to_string())
            }
            other => Self::query(other.to_string()),
        }
    }
}

/// Outcome of the atomic check-and-decrement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decrement {
    Applied { before: f64, after: f64 },
    /// Nothing was written; `current` is the balance seen under the lock.
    Insufficient { current: f64 },
    Missing,
}

/// Outcome of approving a leave request.
#[derive(Debug, Clone, PartialEq)]
pub enum Approval {
    /// The request is approved only when the decrement was `Applied`; otherwise nothing was written.
    Decided(Decrement),
    /// The request was already settled; carries its status.
    NotPending(String),
    RequestMissing,
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, StoreError>;

    async fn find_leave_type(&self, leave_type_id: u64) -> Result<Option<LeaveType>, StoreError>;

    async fn get_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
    ) -> Result<Option<BalanceRecord>, StoreError>;

    /// All balances of one employee, ordered by leave type name.
    async fn list_balances(&self, employee_id: u64) -> Result<Vec<BalanceRecord>, StoreError>;

    /// Subtracts `days` from the (employee, leave type) balance unless that
    /// would take it below zero. Read, check and write happen as one critical
    /// section per key.
    async fn decrement_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        days: f64,
    ) -> Result<Decrement, StoreError>;

    async fn find_request(&self, request_id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    /// Approves a pending request and takes `days` from its balance as one
    /// critical section: either both are written or neither is.
    async fn approve_request(
        &self,
        request_id: u64,
        validator_id: Option<u64>,
        days: f64,
    ) -> Result<Approval, StoreError>;

    /// Drops anything cached about a leave type after it was edited or deleted.
    async fn leave_type_changed(&self, _leave_type_id: u64) {}
}
