use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "annual",
    "annual_quota": 20.0,
    "description": "Paid annual leave",
    "is_paid": true,
    "pay_rate": 1.0
}))]
pub struct LeaveType {
    pub id: u64,
    /// Unique across leave types
    pub name: String,
    /// Days granted per year
    pub annual_quota: f64,
    pub description: Option<String>,
    pub is_paid: bool,
    /// Share of the daily salary paid while on this leave, 0..=1
    pub pay_rate: f64,
}
