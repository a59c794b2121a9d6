use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::leave::LeaveError;
use crate::model::department::Department;
use crate::model::role::Capability;
use crate::utils::db_utils::{Column, build_update_sql, execute_update, write_error};

const UPDATABLE: &[Column] = &[Column::Text("name"), Column::NullableText("description")];

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product engineering", nullable = true)]
    pub description: Option<String>,
}

fn duplicate_name(e: sqlx::Error) -> LeaveError {
    write_error(e, "A department with this name already exists")
}

async fn fetch_department(pool: &MySqlPool, department_id: u64) -> Result<Department, LeaveError> {
    sqlx::query_as::<_, Department>("SELECT id, name, description FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| LeaveError::not_found(format!("department {department_id}")))
}

/// Create Department
#[utoipa::path(
    post,
    path = "/api/department",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Empty name", body = ErrorBody),
        (status = 409, description = "Name already taken", body = ErrorBody)
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageOrganisation)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(LeaveError::invalid("name is required").into());
    }

    let result = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(&payload.description)
        .execute(pool.get_ref())
        .await
        .map_err(duplicate_name)?;

    let id = result.last_insert_id();
    info!(department_id = id, name, "Department created");

    Ok(HttpResponse::Created().json(Department {
        id,
        name: name.to_string(),
        description: payload.description.clone(),
    }))
}

/// List Departments
#[utoipa::path(
    get,
    path = "/api/department",
    responses(
        (status = 200, description = "All departments", body = [Department])
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_departments(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let departments =
        sqlx::query_as::<_, Department>("SELECT id, name, description FROM departments ORDER BY name")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list departments");
                LeaveError::from(e)
            })?;

    Ok(HttpResponse::Ok().json(departments))
}

/// Get Department by ID
#[utoipa::path(
    get,
    path = "/api/department/{department_id}",
    params(
        ("department_id" = u64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found", body = ErrorBody)
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_department(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let department = fetch_department(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

/// Update Department
#[utoipa::path(
    put,
    path = "/api/department/{department_id}",
    params(
        ("department_id" = u64, Path, description = "Department ID")
    ),
    request_body(content = Object, example = json!({ "description": "Platform and product" })),
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Unknown field or invalid value", body = ErrorBody),
        (status = 404, description = "Department not found", body = ErrorBody),
        (status = 409, description = "Name already taken", body = ErrorBody)
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageOrganisation)?;

    let department_id = path.into_inner();

    if let Some(name) = body.get("name")
        && name.as_str().is_none_or(|n| n.trim().is_empty())
    {
        return Err(LeaveError::invalid("name cannot be empty").into());
    }

    let update = build_update_sql("departments", &body, UPDATABLE, "id", department_id)?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(duplicate_name)?;

    let department = fetch_department(pool.get_ref(), department_id).await?;
    Ok(HttpResponse::Ok().json(department))
}

/// Delete Department without employees
#[utoipa::path(
    delete,
    path = "/api/department/{department_id}",
    params(
        ("department_id" = u64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Department not found", body = ErrorBody),
        (status = 409, description = "Department still has employees", body = ErrorBody)
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageOrganisation)?;

    let department_id = path.into_inner();

    // archived employees still reference their department
    let staffed = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE department_id = ? LIMIT 1)",
    )
    .bind(department_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(LeaveError::from)?;

    if staffed > 0 {
        return Err(LeaveError::conflict("Department has employees and cannot be deleted").into());
    }

    let res = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, department_id, "Failed to delete department");
            LeaveError::from(e)
        })?;

    if res.rows_affected() == 0 {
        return Err(LeaveError::not_found(format!("department {department_id}")).into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
