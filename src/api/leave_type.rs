use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::leave::{LeaveAccounting, LeaveError, LeaveResult};
use crate::model::employee::EmployeeStatus;
use crate::model::leave_type::LeaveType;
use crate::model::role::Capability;
use crate::utils::db_utils::{Column, build_update_sql, execute_update, number_from_json, write_error};

const UPDATABLE: &[Column] = &[
    Column::Text("name"),
    Column::Number("annual_quota"),
    Column::NullableText("description"),
    Column::Flag("is_paid"),
    Column::Number("pay_rate"),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveType {
    #[schema(example = "annual")]
    pub name: Option<String>,
    /// Days per year; a JSON number or a numeric string
    #[schema(example = 20, value_type = f64)]
    pub annual_quota: Option<Value>,
    #[schema(example = "Paid annual leave")]
    pub description: Option<String>,
    #[schema(example = true)]
    pub is_paid: Option<bool>,
    /// Defaults to 1 for paid leave and 0 otherwise
    #[schema(example = 1.0)]
    pub pay_rate: Option<f64>,
}

/// A validated leave type ready to insert.
#[derive(Debug, PartialEq)]
pub struct NewLeaveType {
    pub name: String,
    pub annual_quota: f64,
    pub description: Option<String>,
    pub is_paid: bool,
    pub pay_rate: f64,
}

pub fn parse_quota(value: &Value) -> LeaveResult<f64> {
    let quota =
        number_from_json(value).ok_or_else(|| LeaveError::invalid("annual_quota must be numeric"))?;

    if quota < 0.0 {
        return Err(LeaveError::invalid("annual_quota cannot be negative"));
    }
    Ok(quota)
}

fn check_pay_rate(rate: f64) -> LeaveResult<f64> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(LeaveError::invalid("pay_rate must be between 0 and 1"))
    }
}

fn check_name(name: &str) -> LeaveResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LeaveError::invalid("name is required"));
    }
    Ok(name.to_string())
}

impl CreateLeaveType {
    pub fn validate(self) -> LeaveResult<NewLeaveType> {
        let name = check_name(self.name.as_deref().unwrap_or_default())?;
        let annual_quota = parse_quota(
            self.annual_quota
                .as_ref()
                .ok_or_else(|| LeaveError::invalid("annual_quota is required"))?,
        )?;
        let is_paid = self.is_paid.unwrap_or(true);
        let pay_rate = check_pay_rate(self.pay_rate.unwrap_or(if is_paid { 1.0 } else { 0.0 }))?;

        Ok(NewLeaveType {
            name,
            annual_quota,
            description: self.description.filter(|d| !d.trim().is_empty()),
            is_paid,
            pay_rate,
        })
    }
}

/// Checks the fields of an update payload that the column whitelist can't.
pub fn validate_update(payload: &Value) -> LeaveResult<()> {
    if let Some(name) = payload.get("name") {
        check_name(name.as_str().unwrap_or_default())?;
    }
    if let Some(quota) = payload.get("annual_quota") {
        parse_quota(quota)?;
    }
    if let Some(rate) = payload.get("pay_rate") {
        check_pay_rate(
            rate.as_f64()
                .ok_or_else(|| LeaveError::invalid("pay_rate must be numeric"))?,
        )?;
    }
    Ok(())
}

fn duplicate_name(e: sqlx::Error) -> LeaveError {
    write_error(e, "A leave type with this name already exists")
}

/// Create a leave type and give every active employee its full quota
#[utoipa::path(
    post,
    path = "/api/leave-type",
    request_body = CreateLeaveType,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 400, description = "Missing name or non-numeric quota", body = ErrorBody),
        (status = 409, description = "Name already taken", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeaveType>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageLeaveTypes)?;

    let new = payload.into_inner().validate()?;

    let mut tx = pool.begin().await.map_err(LeaveError::from)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO leave_types (name, annual_quota, description, is_paid, pay_rate)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.name)
    .bind(new.annual_quota)
    .bind(&new.description)
    .bind(new.is_paid)
    .bind(new.pay_rate)
    .execute(&mut *tx)
    .await
    .map_err(duplicate_name)?;

    let id = inserted.last_insert_id();

    let provisioned = sqlx::query(
        r#"
        INSERT INTO leave_balances (employee_id, leave_type_id, balance)
        SELECT id, ?, ? FROM employees WHERE status = ?
        "#,
    )
    .bind(id)
    .bind(new.annual_quota)
    .bind(EmployeeStatus::Active.as_ref())
    .execute(&mut *tx)
    .await
    .map_err(LeaveError::from)?;

    tx.commit().await.map_err(LeaveError::from)?;

    info!(
        leave_type_id = id,
        name = %new.name,
        balances = provisioned.rows_affected(),
        "Leave type created"
    );

    Ok(HttpResponse::Created().json(LeaveType {
        id,
        name: new.name,
        annual_quota: new.annual_quota,
        description: new.description,
        is_paid: new.is_paid,
        pay_rate: new.pay_rate,
    }))
}

/// List leave types
#[utoipa::path(
    get,
    path = "/api/leave-type",
    responses(
        (status = 200, description = "All leave types", body = [LeaveType])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn list_leave_types(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let leave_types = sqlx::query_as::<_, LeaveType>(
        "SELECT id, name, annual_quota, description, is_paid, pay_rate FROM leave_types ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list leave types");
        LeaveError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(leave_types))
}

/// Get a leave type
#[utoipa::path(
    get,
    path = "/api/leave-type/{leave_type_id}",
    params(
        ("leave_type_id" = u64, Path, description = "Leave type ID")
    ),
    responses(
        (status = 200, description = "Leave type", body = LeaveType),
        (status = 404, description = "Leave type not found", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn get_leave_type(
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_type_id = path.into_inner();

    let leave_type = accounting
        .store()
        .find_leave_type(leave_type_id)
        .await
        .map_err(LeaveError::from)?
        .ok_or(LeaveError::LeaveTypeNotFound(leave_type_id))?;

    Ok(HttpResponse::Ok().json(leave_type))
}

/// Edit name, quota, description or remuneration
#[utoipa::path(
    put,
    path = "/api/leave-type/{leave_type_id}",
    params(
        ("leave_type_id" = u64, Path, description = "Leave type ID")
    ),
    request_body(content = Object, example = json!({ "annual_quota": 25 })),
    responses(
        (status = 200, description = "Leave type updated", body = Object, example = json!({
            "message": "Leave type updated"
        })),
        (status = 400, description = "Unknown field or invalid value", body = ErrorBody),
        (status = 404, description = "Leave type not found", body = ErrorBody),
        (status = 409, description = "Name already taken", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageLeaveTypes)?;

    let leave_type_id = path.into_inner();
    validate_update(&body)?;

    let update = build_update_sql("leave_types", &body, UPDATABLE, "id", leave_type_id)?;

    let result = execute_update(pool.get_ref(), update)
        .await
        .map_err(duplicate_name)?;

    accounting.store().leave_type_changed(leave_type_id).await;

    if result.rows_affected() == 0 {
        // MySQL reports 0 for a no-op update too
        let exists = accounting
            .store()
            .find_leave_type(leave_type_id)
            .await
            .map_err(LeaveError::from)?
            .is_some();
        if !exists {
            return Err(LeaveError::LeaveTypeNotFound(leave_type_id).into());
        }
    }

    info!(leave_type_id, "Leave type updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave type updated"
    })))
}

/// Delete a leave type no request refers to
#[utoipa::path(
    delete,
    path = "/api/leave-type/{leave_type_id}",
    params(
        ("leave_type_id" = u64, Path, description = "Leave type ID")
    ),
    responses(
        (status = 200, description = "Leave type deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Leave type not found", body = ErrorBody),
        (status = 409, description = "Leave type is used by leave requests", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Type"
)]
pub async fn delete_leave_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageLeaveTypes)?;

    let leave_type_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(LeaveError::from)?;

    let in_use = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM leave_requests WHERE leave_type_id = ? LIMIT 1)",
    )
    .bind(leave_type_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(LeaveError::from)?;

    if in_use > 0 {
        return Err(LeaveError::conflict(
            "Leave type is referenced by leave requests and cannot be deleted",
        )
        .into());
    }

    sqlx::query("DELETE FROM leave_balances WHERE leave_type_id = ?")
        .bind(leave_type_id)
        .execute(&mut *tx)
        .await
        .map_err(LeaveError::from)?;

    let deleted = sqlx::query("DELETE FROM leave_types WHERE id = ?")
        .bind(leave_type_id)
        .execute(&mut *tx)
        .await
        .map_err(LeaveError::from)?;

    if deleted.rows_affected() == 0 {
        return Err(LeaveError::LeaveTypeNotFound(leave_type_id).into());
    }

    tx.commit().await.map_err(LeaveError::from)?;
    accounting.store().leave_type_changed(leave_type_id).await;

    info!(leave_type_id, "Leave type deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
