//! Leave accounting: working days, balance consumption, balance statistics.

pub mod engine;
pub mod error;
pub mod stats;
pub mod working_days;

pub use engine::{BalanceReport, Consumption, LeaveAccounting};
pub use error::{ErrorKind, LeaveError, LeaveResult};
