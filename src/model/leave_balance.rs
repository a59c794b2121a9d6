use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A balance row joined with the leave type it draws from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct BalanceRecord {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub leave_type_name: String,
    pub annual_quota: f64,
    pub balance: f64,
}

/// What an employee does have, reported back when a lookup or consumption fails.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AvailableBalance {
    pub leave_type_id: u64,
    pub leave_type_name: String,
    pub balance: f64,
}

impl From<&BalanceRecord> for AvailableBalance {
    fn from(record: &BalanceRecord) -> Self {
        Self {
            leave_type_id: record.leave_type_id,
            leave_type_name: record.leave_type_name.clone(),
            balance: record.balance,
        }
    }
}
