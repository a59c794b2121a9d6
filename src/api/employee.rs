use crate::{
    auth::auth::AuthUser,
    leave::{LeaveAccounting, LeaveError},
    model::{
        employee::{Employee, EmployeeStatus},
        role::Capability,
    },
    utils::db_utils::{Column, SqlValue, build_update_sql, execute_update, write_error},
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: &[Column] = &[
    Column::Text("employee_code"),
    Column::Text("first_name"),
    Column::Text("last_name"),
    Column::Text("email"),
    Column::NullableText("phone"),
    Column::Id("department_id"),
    Column::Date("hire_date"),
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "3000", value_type = String)]
    pub employee_code: String,
    #[schema(example = "first name", value_type = String)]
    pub first_name: String,
    #[schema(example = "last name", value_type = String)]
    pub last_name: String,
    #[schema(example = "john@email.com", format = "email", value_type = String)]
    pub email: String,
    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = 1, value_type = u64 )]
    pub department_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: chrono::NaiveDate,
}

impl CreateEmployee {
    fn validate(&self) -> Result<(), LeaveError> {
        for (field, value) in [
            ("employee_code", &self.employee_code),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(LeaveError::invalid(format!("{field} is required")));
            }
        }
        if !self.email.contains('@') {
            return Err(LeaveError::invalid("email is not a valid address"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    /// `active` or `archived`
    pub status: Option<String>,
    /// Matches first name, last name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    #[schema(
    example = json!([{
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "department_id": 10,
        "hire_date": "2024-01-01",
        "status": "active"
    }])
)]
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 5)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

fn employee_conflict(e: sqlx::Error) -> LeaveError {
    write_error(e, "Employee code or email already in use")
}

/// Create Employee with a full balance for every leave type
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Object, example = json!({
            "message": "Employee created successfully",
            "employee_id": 1000,
            "balances": 3
        })),
        (status = 400, description = "Missing or malformed field, or unknown department", body = ErrorBody),
        (status = 409, description = "Duplicate code or email", body = ErrorBody)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageOrganisation)?;
    payload.validate()?;

    let mut tx = pool.begin().await.map_err(LeaveError::from)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, phone, department_id, hire_date, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(&payload.phone)
    .bind(payload.department_id)
    .bind(payload.hire_date)
    .bind(EmployeeStatus::Active.as_ref())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to Create Employee");
        employee_conflict(e)
    })?;

    let employee_id = inserted.last_insert_id();

    let provisioned = sqlx::query(
        r#"
        INSERT INTO leave_balances (employee_id, leave_type_id, balance)
        SELECT ?, id, annual_quota FROM leave_types
        "#,
    )
    .bind(employee_id)
    .execute(&mut *tx)
    .await
    .map_err(LeaveError::from)?;

    tx.commit().await.map_err(LeaveError::from)?;

    info!(
        employee_id,
        balances = provisioned.rows_affected(),
        "Employee created"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Employee created successfully",
        "employee_id": employee_id,
        "balances": provisioned.rows_affected()
    })))
}

// -------------------- Handler --------------------

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ViewAllBalances)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        bindings.push(SqlValue::U64(department_id));
    }

    if let Some(status) = &query.status {
        let status: EmployeeStatus = status
            .parse()
            .map_err(|_| LeaveError::invalid("status must be active or archived"))?;
        conditions.push("status = ?");
        bindings.push(SqlValue::String(status.to_string()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like));
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            SqlValue::U64(v) => count_query.bind(*v),
            SqlValue::String(v) => count_query.bind(v.as_str()),
            _ => count_query,
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count employees");
        LeaveError::from(e)
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT id, employee_code, first_name, last_name, email, phone, department_id, hire_date, status \
         FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, bindings = ?bindings, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = match b {
            SqlValue::U64(v) => data_query.bind(*v),
            SqlValue::String(v) => data_query.bind(v.as_str()),
            _ => data_query,
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch employees");
        LeaveError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body(content = Object, example = json!({ "department_id": 2, "phone": null })),
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Unknown field, invalid value or unknown department", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody),
        (status = 409, description = "Duplicate code or email", body = ErrorBody)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageOrganisation)?;

    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &body, UPDATABLE, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(employee_conflict)?
        .rows_affected();

    if affected == 0
        && accounting
            .store()
            .find_employee(employee_id)
            .await
            .map_err(LeaveError::from)?
            .is_none()
    {
        return Err(LeaveError::EmployeeNotFound(employee_id).into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Archive Employee; leave balances are kept
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully archived", body = Object, example = json!({
            "message": "Employee archived"
        })),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageOrganisation)?;

    let employee_id = path.into_inner();

    let res = sqlx::query("UPDATE employees SET status = ? WHERE id = ?")
        .bind(EmployeeStatus::Archived.as_ref())
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to archive employee");
            LeaveError::from(e)
        })?;

    if res.rows_affected() == 0 {
        // already archived also reports 0
        let exists = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
            .bind(employee_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(LeaveError::from)?;
        if exists == 0 {
            return Err(LeaveError::EmployeeNotFound(employee_id).into());
        }
    }

    info!(employee_id, "Employee archived");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee archived"
    })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id: u64 = path.into_inner();
    auth.require_self_or(employee_id, Capability::ViewAllBalances)?;

    let employee = accounting
        .store()
        .find_employee(employee_id)
        .await
        .map_err(LeaveError::from)?
        .ok_or(LeaveError::EmployeeNotFound(employee_id))?;

    Ok(HttpResponse::Ok().json(employee))
}
