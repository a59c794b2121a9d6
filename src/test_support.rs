//! Shared fixtures for handler and engine tests.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::auth::jwt::generate_access_token;
use crate::config::Config;
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;
use crate::model::role::Role;
use crate::store::InMemoryLeaveStore;

pub const SECRET: &str = "test-secret";

pub fn config() -> Config {
    Config {
        database_url: "mysql://localhost/unused".to_string(),
        jwt_secret: SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 900,
        rate_login_per_min: 60,
        rate_protected_per_min: 1000,
        api_prefix: "/api".to_string(),
        log_dir: "logs".to_string(),
        log_level: tracing::Level::DEBUG,
        run_migrations: false,
    }
}

pub fn bearer(role: Role, employee_id: Option<u64>) -> (&'static str, String) {
    let token = generate_access_token(1, "tester".into(), role as u8, employee_id, SECRET, 900)
        .expect("token signs");
    ("Authorization", format!("Bearer {token}"))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn employee(id: u64) -> Employee {
    Employee {
        id,
        employee_code: format!("EMP-{id}"),
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        email: format!("emp{id}@company.com"),
        phone: None,
        department_id: 1,
        hire_date: date(2024, 1, 1),
        status: "active".to_string(),
    }
}

pub fn leave_type(id: u64, name: &str, quota: f64) -> LeaveType {
    LeaveType {
        id,
        name: name.to_string(),
        annual_quota: quota,
        description: None,
        is_paid: true,
        pay_rate: 1.0,
    }
}

/// Pending annual leave for [`EMPLOYEE`] from Monday 2024-01-01, `days` weekdays long (at most 5).
pub fn pending_request(id: u64, days: u32) -> LeaveRequest {
    let start = date(2024, 1, 1);
    LeaveRequest {
        id,
        employee_id: EMPLOYEE,
        leave_type_id: ANNUAL,
        start_date: start,
        end_date: start + chrono::Days::new(u64::from(days.clamp(1, 5)) - 1),
        validator_id: None,
        status: LeaveStatus::Pending.to_string(),
        reason: None,
        created_at: None,
    }
}

pub const EMPLOYEE: u64 = 1000;
pub const ANNUAL: u64 = 1;
pub const SICK: u64 = 2;

/// One employee with an annual balance; a sick leave type exists without a balance row.
pub fn store_with_annual(balance: f64) -> Arc<InMemoryLeaveStore> {
    Arc::new(
        InMemoryLeaveStore::new()
            .with_employee(employee(EMPLOYEE))
            .with_leave_type(leave_type(ANNUAL, "annual", 10.0))
            .with_leave_type(leave_type(SICK, "sick", 5.0))
            .with_balance(EMPLOYEE, ANNUAL, balance),
    )
}
