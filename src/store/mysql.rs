use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::debug;

use super::{Approval, Decrement, LeaveStore, StoreError};
use crate::model::employee::Employee;
use crate::model::leave_balance::BalanceRecord;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;

pub const REQUEST_COLUMNS: &str =
    "id, employee_id, leave_type_id, start_date, end_date, validator_id, status, reason, created_at";

const BALANCE_SELECT: &str = r#"
    SELECT
        b.employee_id,
        b.leave_type_id,
        t.name AS leave_type_name,
        t.annual_quota,
        b.balance
    FROM leave_balances b
    JOIN leave_types t ON t.id = b.leave_type_id
"#;

#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
    /// Leave types are read on every consumption and rarely edited
    leave_types: Cache<u64, LeaveType>,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            leave_types: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(Duration::from_secs(600))
                .build(),
        }
    }
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, employee_code, first_name, last_name, email, phone,
                   department_id, hire_date, status
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    async fn find_leave_type(&self, leave_type_id: u64) -> Result<Option<LeaveType>, StoreError> {
        if let Some(cached) = self.leave_types.get(&leave_type_id).await {
            return Ok(Some(cached));
        }

        let leave_type = sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT id, name, annual_quota, description, is_paid, pay_rate
            FROM leave_types
            WHERE id = ?
            "#,
        )
        .bind(leave_type_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(found) = &leave_type {
            self.leave_types.insert(leave_type_id, found.clone()).await;
        }

        Ok(leave_type)
    }

    async fn get_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
    ) -> Result<Option<BalanceRecord>, StoreError> {
        let sql = format!("{BALANCE_SELECT} WHERE b.employee_id = ? AND b.leave_type_id = ?");

        let record = sqlx::query_as::<_, BalanceRecord>(&sql)
            .bind(employee_id)
            .bind(leave_type_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn list_balances(&self, employee_id: u64) -> Result<Vec<BalanceRecord>, StoreError> {
        let sql = format!("{BALANCE_SELECT} WHERE b.employee_id = ? ORDER BY t.name");

        let records = sqlx::query_as::<_, BalanceRecord>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    async fn decrement_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        days: f64,
    ) -> Result<Decrement, StoreError> {
        let mut tx = self.pool.begin().await?;

        let outcome = lock_and_decrement(&mut tx, employee_id, leave_type_id, days).await?;

        if matches!(outcome, Decrement::Applied { .. }) {
            tx.commit().await?;
            debug!(employee_id, leave_type_id, days, "Leave balance decremented");
        } else {
            tx.rollback().await?;
        }

        Ok(outcome)
    }

    async fn find_request(&self, request_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");

        let request = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    async fn approve_request(
        &self,
        request_id: u64,
        validator_id: Option<u64>,
        days: f64,
    ) -> Result<Approval, StoreError> {
        let mut tx = self.pool.begin().await?;

        // request row first, then the balance row; both locked until commit/rollback
        let request = sqlx::query_as::<_, (u64, u64, String)>(
            r#"
            SELECT employee_id, leave_type_id, status
            FROM leave_requests
            WHERE id = ?
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((employee_id, leave_type_id, status)) = request else {
            tx.rollback().await?;
            return Ok(Approval::RequestMissing);
        };

        if status != <&str>::from(LeaveStatus::Pending) {
            tx.rollback().await?;
            return Ok(Approval::NotPending(status));
        }

        let outcome = lock_and_decrement(&mut tx, employee_id, leave_type_id, days).await?;

        if !matches!(outcome, Decrement::Applied { .. }) {
            tx.rollback().await?;
            return Ok(Approval::Decided(outcome));
        }

        sqlx::query("UPDATE leave_requests SET status = ?, validator_id = ? WHERE id = ?")
            .bind(LeaveStatus::Approved.as_ref())
            .bind(validator_id)
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(request_id, employee_id, leave_type_id, days, "Leave request approved");

        Ok(Approval::Decided(outcome))
    }

    async fn leave_type_changed(&self, leave_type_id: u64) {
        self.leave_types.invalidate(&leave_type_id).await;
    }
}

/// Locks the balance row and subtracts `days` unless that would go below zero.
/// Commit or rollback is left to the caller.
async fn lock_and_decrement(
    conn: &mut MySqlConnection,
    employee_id: u64,
    leave_type_id: u64,
    days: f64,
) -> Result<Decrement, sqlx::Error> {
    let current = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT balance
        FROM leave_balances
        WHERE employee_id = ? AND leave_type_id = ?
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(leave_type_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(before) = current else {
        return Ok(Decrement::Missing);
    };

    if days > before {
        return Ok(Decrement::Insufficient { current: before });
    }

    sqlx::query(
        r#"
        UPDATE leave_balances
        SET balance = balance - ?
        WHERE employee_id = ? AND leave_type_id = ?
        "#,
    )
    .bind(days)
    .bind(employee_id)
    .bind(leave_type_id)
    .execute(&mut *conn)
    .await?;

    Ok(Decrement::Applied {
        before,
        after: before - days,
    })
}
