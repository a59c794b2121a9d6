use crate::auth::auth::AuthUser;
use crate::leave::working_days::DateSpan;
use crate::leave::{Consumption, LeaveAccounting, LeaveError};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::Capability;
use crate::store::mysql::REQUEST_COLUMNS;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Defaults to the caller's own employee record
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    /// Last day off, inclusive
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "Family trip", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "data": [
        {
            "id": 1,
            "employee_id": 1000,
            "leave_type_id": 1,
            "start_date": "2026-01-05",
            "end_date": "2026-01-09",
            "validator_id": null,
            "status": "pending",
            "reason": "Family trip",
            "created_at": "2026-01-01T00:00:00Z"
        }
    ],
    "page": 1,
    "per_page": 10,
    "total": 1
}))]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    /// Filter by leave type
    pub leave_type_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 3)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

#[derive(Serialize, ToSchema)]
pub struct ApprovalResponse {
    #[schema(example = "Leave approved")]
    pub message: String,
    pub leave: LeaveRequest,
    pub consumption: Consumption,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// Whose leave is being requested: one's own, or anyone's for leave managers.
fn applicant(auth: &AuthUser, requested: Option<u64>) -> actix_web::Result<u64> {
    match requested {
        Some(employee_id) => {
            auth.require_self_or(employee_id, Capability::ManageLeave)?;
            Ok(employee_id)
        }
        None => auth.employee_id(),
    }
}

async fn fetch_request(
    accounting: &LeaveAccounting,
    leave_id: u64,
) -> Result<LeaveRequest, LeaveError> {
    accounting
        .store()
        .find_request(leave_id)
        .await?
        .ok_or_else(|| LeaveError::not_found(format!("leave request {leave_id}")))
}

/// Moves a pending request to `status`. Returns false when it was not pending.
async fn settle(
    pool: &MySqlPool,
    leave_id: u64,
    status: LeaveStatus,
    validator_id: Option<u64>,
) -> Result<bool, LeaveError> {
    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, validator_id = ?
        WHERE id = ?
        AND status = ?
        "#,
    )
    .bind(status.as_ref())
    .bind(validator_id)
    .bind(leave_id)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "id": 1,
            "status": "pending",
            "working_days": 5
         })
        ),
        (status = 400, description = "Bad dates or not enough balance", body = ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown leave type or no balance for it", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    accounting: web::Data<LeaveAccounting>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = applicant(&auth, payload.employee_id)?;

    // 1️⃣ validate dates
    let span = DateSpan::new(payload.start_date, payload.end_date)?;

    // 2️⃣ leave type, balance row and current balance; approval checks again
    let working_days = accounting
        .check(employee_id, payload.leave_type_id, &span)
        .await?;
    if working_days == 0 {
        return Err(LeaveError::invalid("Requested period contains no working days").into());
    }

    // 3️⃣ insert request
    let inserted = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type_id, start_date, end_date, status, reason)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type_id)
    .bind(span.start())
    .bind(span.end())
    .bind(LeaveStatus::Pending.as_ref())
    .bind(payload.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, "Failed to create leave request");
        LeaveError::from(e)
    })?;

    info!(
        leave_id = inserted.last_insert_id(),
        employee_id,
        working_days,
        "Leave request submitted"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "id": inserted.last_insert_id(),
        "status": LeaveStatus::Pending,
        "working_days": working_days
    })))
}

/* =========================
Approve leave (HR/Admin)
========================= */
/// Approves a pending request and consumes its working days from the balance.
///
/// If the balance can't cover the request it stays pending.
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved and balance consumed", body = ApprovalResponse),
        (status = 400, description = "Insufficient balance; request left pending", body = ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = ErrorBody),
        (status = 409, description = "Leave request already processed", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageLeave)?;

    let leave_id = path.into_inner();
    let (leave, consumption) = accounting.approve(leave_id, auth.employee_id).await?;

    info!(leave_id, days = consumption.days_consumed, "Leave approved");

    Ok(HttpResponse::Ok().json(ApprovalResponse {
        message: "Leave approved".to_string(),
        leave,
        consumption,
    }))
}

/* =========================
Reject leave (HR/Admin)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = ErrorBody),
        (status = 409, description = "Leave request already processed", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageLeave)?;

    let leave_id = path.into_inner();
    let request = fetch_request(&accounting, leave_id).await?;

    if !settle(pool.get_ref(), leave_id, LeaveStatus::Rejected, auth.employee_id).await? {
        // settled between the read and the update; report what it is now
        let current = fetch_request(&accounting, leave_id).await?;
        return Err(LeaveError::already_processed(request.id, &current.status).into());
    }

    info!(leave_id, "Leave rejected");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave rejected"
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = fetch_request(&accounting, path.into_inner()).await?;
    auth.require_self_or(leave.employee_id, Capability::ManageLeave)?;

    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // employees only ever see their own requests
    let employee_filter = if auth.role.can(Capability::ManageLeave) {
        query.employee_id
    } else {
        Some(applicant(&auth, query.employee_id)?)
    };

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(leave_type_id) = query.leave_type_id {
        where_sql.push_str(" AND leave_type_id = ?");
        args.push(FilterValue::U64(leave_type_id));
    }

    if let Some(status) = query.status.as_deref() {
        let status: LeaveStatus = status
            .parse()
            .map_err(|_| LeaveError::invalid("status must be pending, approved or rejected"))?;
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.into()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error=%e, "Failed to count leave requests");
        LeaveError::from(e)
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT {REQUEST_COLUMNS}
        FROM leave_requests
        {}
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error=%e, "Failed to fetch leave list");
            LeaveError::from(e)
        })?;

    // -------------------------
    // Response
    // -------------------------
    let response = LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::store::InMemoryLeaveStore;
    use actix_web::ResponseError;
    use crate::test_support::{ANNUAL, EMPLOYEE, bearer, employee, leave_type, pending_request};
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use serde_json::Value;
    use std::sync::Arc;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "tester".to_string(),
            role,
            employee_id,
        }
    }

    #[test]
    fn employees_apply_for_themselves() {
        let me = user(Role::Employee, Some(1000));

        assert_eq!(applicant(&me, None).unwrap(), 1000);
        assert_eq!(applicant(&me, Some(1000)).unwrap(), 1000);

        let err = applicant(&me, Some(1001)).unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn hr_applies_on_behalf_of_others() {
        let hr = user(Role::Hr, None);

        assert_eq!(applicant(&hr, Some(1001)).unwrap(), 1001);
        // no profile of their own to default to
        assert!(applicant(&hr, None).is_err());
    }

    fn approver(
        store: Arc<InMemoryLeaveStore>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(LeaveAccounting::new(store)))
            .app_data(web::Data::new(crate::test_support::config()))
            .configure(crate::routes::configure_extractors)
            .route("/leave/{leave_id}/approve", web::put().to(approve_leave))
    }

    fn approve_as(role: Role) -> actix_test::TestRequest {
        actix_test::TestRequest::put()
            .uri("/leave/7/approve")
            .insert_header(bearer(role, None))
    }

    fn store_with_request(balance: f64, days: u32) -> Arc<InMemoryLeaveStore> {
        Arc::new(
            InMemoryLeaveStore::new()
                .with_employee(employee(EMPLOYEE))
                .with_leave_type(leave_type(ANNUAL, "annual", 10.0))
                .with_balance(EMPLOYEE, ANNUAL, balance)
                .with_request(pending_request(7, days)),
        )
    }

    #[actix_web::test]
    async fn approval_consumes_balance() {
        let store = store_with_request(10.0, 5);
        let app = actix_test::init_service(approver(store.clone())).await;

        let response = actix_test::call_service(&app, approve_as(Role::Hr).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["leave"]["status"], "approved");
        assert_eq!(body["consumption"]["days_consumed"], 5);
        assert_eq!(body["consumption"]["balance_after"], 5.0);
        assert_eq!(store.balance(EMPLOYEE, ANNUAL), Some(5.0));
    }

    #[actix_web::test]
    async fn overdrawn_approval_keeps_request_pending() {
        let store = store_with_request(2.0, 5);
        let app = actix_test::init_service(approver(store.clone())).await;

        let response = actix_test::call_service(&app, approve_as(Role::Hr).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["kind"], "insufficient_balance");
        assert_eq!(store.request_status(7).as_deref(), Some("pending"));
        assert_eq!(store.balance(EMPLOYEE, ANNUAL), Some(2.0));
    }

    #[actix_web::test]
    async fn second_approval_conflicts() {
        let store = store_with_request(10.0, 2);
        let app = actix_test::init_service(approver(store.clone())).await;

        let first = actix_test::call_service(&app, approve_as(Role::Admin).to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = actix_test::call_service(&app, approve_as(Role::Admin).to_request()).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body: Value = actix_test::read_body_json(second).await;
        assert_eq!(body["message"], "Leave request 7 is already approved");
        assert_eq!(store.balance(EMPLOYEE, ANNUAL), Some(8.0));
    }

    #[actix_web::test]
    async fn employees_cannot_approve() {
        let store = store_with_request(10.0, 2);
        let app = actix_test::init_service(approver(store.clone())).await;

        let response = actix_test::call_service(&app, approve_as(Role::Employee).to_request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(store.request_status(7).as_deref(), Some("pending"));
    }
}
