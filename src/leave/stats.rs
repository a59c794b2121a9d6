//! Pure statistics derived from a balance and its leave type's quota.

use serde::Serialize;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::model::leave_balance::BalanceRecord;

const CRITICAL_SHARE: f64 = 0.1;
const LOW_SHARE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BalanceStatus {
    Exhausted,
    Critical,
    Low,
    Normal,
}

/// First match wins: exhausted, critical (<= 10% of quota), low (<= 20%), normal.
pub fn classify(balance: f64, annual_quota: f64) -> BalanceStatus {
    if balance <= 0.0 {
        BalanceStatus::Exhausted
    } else if balance <= CRITICAL_SHARE * annual_quota {
        BalanceStatus::Critical
    } else if balance <= LOW_SHARE * annual_quota {
        BalanceStatus::Low
    } else {
        BalanceStatus::Normal
    }
}

pub fn used_days(annual_quota: f64, balance: f64) -> f64 {
    annual_quota - balance
}

/// `None` when the quota is zero.
pub fn usage_percentage(annual_quota: f64, balance: f64) -> Option<f64> {
    (annual_quota > 0.0).then(|| used_days(annual_quota, balance) / annual_quota * 100.0)
}

/// `None` when the quota is zero.
pub fn remaining_percentage(annual_quota: f64, balance: f64) -> Option<f64> {
    (annual_quota > 0.0).then(|| balance / annual_quota * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One balance with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "leave_type_id": 1,
    "leave_type_name": "annual",
    "annual_quota": 20.0,
    "balance": 4.0,
    "used_days": 16.0,
    "usage_percentage": 80.0,
    "remaining_percentage": 20.0,
    "status": "low"
}))]
pub struct BalanceView {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub leave_type_name: String,
    pub annual_quota: f64,
    pub balance: f64,
    pub used_days: f64,
    #[schema(nullable = true)]
    pub usage_percentage: Option<f64>,
    #[schema(nullable = true)]
    pub remaining_percentage: Option<f64>,
    pub status: BalanceStatus,
}

impl From<&BalanceRecord> for BalanceView {
    fn from(record: &BalanceRecord) -> Self {
        let quota = record.annual_quota;
        let balance = record.balance;
        Self {
            employee_id: record.employee_id,
            leave_type_id: record.leave_type_id,
            leave_type_name: record.leave_type_name.clone(),
            annual_quota: quota,
            balance,
            used_days: used_days(quota, balance),
            usage_percentage: usage_percentage(quota, balance),
            remaining_percentage: remaining_percentage(quota, balance),
            status: classify(balance, quota),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BalanceSummary {
    pub leave_types: usize,
    pub total_quota: f64,
    pub total_used: f64,
    pub total_remaining: f64,
    /// Rounded to 2 decimal places; 0 when the total quota is 0
    pub overall_usage_percentage: f64,
    pub low_balance_types: usize,
    pub critical_balance_types: usize,
    pub exhausted_balance_types: usize,
}

pub fn summarize(views: &[BalanceView]) -> BalanceSummary {
    let total_quota: f64 = views.iter().map(|v| v.annual_quota).sum();
    let total_remaining: f64 = views.iter().map(|v| v.balance).sum();
    let total_used: f64 = views.iter().map(|v| v.used_days).sum();
    let count = |status: BalanceStatus| views.iter().filter(|v| v.status == status).count();

    BalanceSummary {
        leave_types: views.len(),
        total_quota,
        total_used,
        total_remaining,
        overall_usage_percentage: if total_quota > 0.0 {
            round2(total_used / total_quota * 100.0)
        } else {
            0.0
        },
        low_balance_types: count(BalanceStatus::Low),
        critical_balance_types: count(BalanceStatus::Critical),
        exhausted_balance_types: count(BalanceStatus::Exhausted),
    }
}
