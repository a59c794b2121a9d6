use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::working_days::{
    DateSpan, MonthSegment, monthly_segments, working_days_across_months, working_days_in_month,
};
use crate::leave::{LeaveAccounting, LeaveError};
use crate::model::role::Capability;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Restrict the answer to one leave type
    #[schema(example = 1)]
    pub leave_type_id: Option<u64>,
}

/// Fields are optional so a missing one is reported as `invalid`, not as a
/// generic deserialization error.
#[derive(Deserialize, ToSchema)]
pub struct ConsumeBalance {
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    pub leave_type_id: Option<u64>,
    /// First day off
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: Option<String>,
    /// Last day off, inclusive
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, LeaveError> {
    value.ok_or_else(|| LeaveError::invalid(format!("{field} is required")))
}

/// Leave balances of an employee, with usage statistics
#[utoipa::path(
    get,
    path = "/api/leave-balance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "One balance (leave_type_id given) or all balances with a summary", body = BalanceReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No balance rows", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn get_balances(
    auth: AuthUser,
    accounting: web::Data<LeaveAccounting>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or(employee_id, Capability::ViewAllBalances)?;

    let report = accounting.balances(employee_id, query.leave_type_id).await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Consume balance for a date span (both ends inclusive, weekends skipped)
#[utoipa::path(
    post,
    path = "/api/leave-balance/consume",
    request_body(
        content = ConsumeBalance,
        description = "Employee, leave type and ISO 8601 dates",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Balance consumed", body = Consumption),
        (status = 400, description = "Invalid input or insufficient balance", body = ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee, leave type or balance not found", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn consume_balance(
    auth: AuthUser,
    accounting: web::Data<LeaveAccounting>,
    payload: web::Json<ConsumeBalance>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageLeave)?;

    let payload = payload.into_inner();
    let employee_id = required(payload.employee_id, "employee_id")?;
    let leave_type_id = required(payload.leave_type_id, "leave_type_id")?;
    let span = DateSpan::parse(
        &required(payload.start_date, "start_date")?,
        &required(payload.end_date, "end_date")?,
    )?;

    let consumption = accounting.consume(employee_id, leave_type_id, span).await?;

    info!(
        employee_id,
        leave_type_id,
        days = consumption.days_consumed,
        by = auth.user_id,
        "Balance consumed via API"
    );

    Ok(HttpResponse::Ok().json(consumption))
}

#[derive(Deserialize, IntoParams)]
pub struct SpanQuery {
    /// First day, ISO 8601
    pub start_date: String,
    /// Last day (inclusive), ISO 8601
    pub end_date: String,
}

#[derive(Serialize, ToSchema)]
pub struct WorkingDaysResponse {
    pub working_days: u32,
    pub months: Vec<MonthSegment>,
}

/// Working days in a date span, broken down per calendar month
#[utoipa::path(
    get,
    path = "/api/working-days",
    params(SpanQuery),
    responses(
        (status = 200, description = "Working days", body = WorkingDaysResponse),
        (status = 400, description = "Malformed dates", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn working_days(query: web::Query<SpanQuery>) -> actix_web::Result<impl Responder> {
    let span = DateSpan::parse(&query.start_date, &query.end_date)?;
    let months = monthly_segments(span.start(), span.end());

    Ok(HttpResponse::Ok().json(WorkingDaysResponse {
        working_days: working_days_across_months(span.start(), span.end()),
        months,
    }))
}

/// Working days in one calendar month
#[utoipa::path(
    get,
    path = "/api/working-days/{year}/{month}",
    params(
        ("year" = i32, Path, description = "Year"),
        ("month" = u32, Path, description = "Month, 1-12")
    ),
    responses(
        (status = 200, description = "Working days", body = Object, example = json!({
            "year": 2024, "month": 1, "working_days": 23
        })),
        (status = 400, description = "Invalid month", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn working_days_for_month(path: web::Path<(i32, u32)>) -> actix_web::Result<impl Responder> {
    let (year, month) = path.into_inner();
    let working_days = working_days_in_month(year, month)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "year": year,
        "month": month,
        "working_days": working_days
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_support::{ANNUAL, EMPLOYEE, SICK, bearer, config, store_with_annual};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn app(
        accounting: LeaveAccounting,
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
            .app_data(web::Data::new(config()))
            .app_data(web::Data::new(accounting))
            .configure(crate::routes::configure_extractors)
            .route("/leave-balance/consume", web::post().to(consume_balance))
            .route("/leave-balance/{employee_id}", web::get().to(get_balances))
            .route("/working-days", web::get().to(working_days))
            .route("/working-days/{year}/{month}", web::get().to(working_days_for_month))
    }

    async fn consume(
        accounting: LeaveAccounting,
        role: Role,
        body: Value,
    ) -> (StatusCode, Value) {
        let service = actix_test::init_service(app(accounting)).await;
        let request = actix_test::TestRequest::post()
            .uri("/leave-balance/consume")
            .insert_header(bearer(role, None))
            .set_json(body)
            .to_request();
        let response = actix_test::call_service(&service, request).await;
        let status = response.status();
        let body: Value = actix_test::read_body_json(response).await;
        (status, body)
    }

    #[actix_web::test]
    async fn consume_returns_before_and_after() {
        let store = store_with_annual(10.0);
        let (status, body) = consume(
            LeaveAccounting::new(store.clone()),
            Role::Hr,
            json!({
                "employee_id": EMPLOYEE,
                "leave_type_id": ANNUAL,
                "start_date": "2024-01-01",
                "end_date": "2024-01-05"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days_consumed"], 5);
        assert_eq!(body["balance_before"], 10.0);
        assert_eq!(body["balance_after"], 5.0);
        assert_eq!(body["balance"]["status"], "normal");
        assert_eq!(store.balance(EMPLOYEE, ANNUAL), Some(5.0));
    }

    #[actix_web::test]
    async fn insufficient_balance_is_bad_request_with_debug() {
        let (status, body) = consume(
            LeaveAccounting::new(store_with_annual(2.0)),
            Role::Admin,
            json!({
                "employee_id": EMPLOYEE,
                "leave_type_id": ANNUAL,
                "start_date": "2024-01-01",
                "end_date": "2024-01-05"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "insufficient_balance");
        assert_eq!(body["debug"]["current_balance"], 2.0);
        assert_eq!(body["debug"]["requested_days"], 5);
    }

    #[actix_web::test]
    async fn missing_balance_row_is_not_found_with_available_types() {
        let (status, body) = consume(
            LeaveAccounting::new(store_with_annual(10.0)),
            Role::Hr,
            json!({
                "employee_id": EMPLOYEE,
                "leave_type_id": SICK,
                "start_date": "2024-01-01",
                "end_date": "2024-01-01"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["debug"]["available_leave_type_ids"], json!([ANNUAL]));
    }

    #[actix_web::test]
    async fn malformed_input_is_invalid() {
        let accounting = LeaveAccounting::new(store_with_annual(10.0));

        let (status, body) = consume(
            accounting.clone(),
            Role::Hr,
            json!({ "employee_id": EMPLOYEE, "leave_type_id": ANNUAL, "start_date": "2024-01-01" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid");

        let (status, body) = consume(
            accounting,
            Role::Hr,
            json!({ "employee_id": "one", "leave_type_id": ANNUAL }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid");
    }

    #[actix_web::test]
    async fn employees_cannot_consume() {
        let service = actix_test::init_service(app(LeaveAccounting::new(store_with_annual(10.0)))).await;
        let request = actix_test::TestRequest::post()
            .uri("/leave-balance/consume")
            .insert_header(bearer(Role::Employee, Some(EMPLOYEE)))
            .set_json(json!({}))
            .to_request();

        let response = actix_test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn employee_reads_own_balances_only() {
        let service = actix_test::init_service(app(LeaveAccounting::new(store_with_annual(10.0)))).await;

        let own = actix_test::TestRequest::get()
            .uri(&format!("/leave-balance/{EMPLOYEE}"))
            .insert_header(bearer(Role::Employee, Some(EMPLOYEE)))
            .to_request();
        let response = actix_test::call_service(&service, own).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["summary"]["total_quota"], 10.0);
        assert_eq!(body["balances"][0]["remaining_percentage"], 100.0);

        let other = actix_test::TestRequest::get()
            .uri("/leave-balance/7")
            .insert_header(bearer(Role::Employee, Some(EMPLOYEE)))
            .to_request();
        let response = actix_test::call_service(&service, other).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_employee_balances_are_not_found() {
        let service = actix_test::init_service(app(LeaveAccounting::new(Arc::new(
            crate::store::InMemoryLeaveStore::new(),
        ))))
        .await;
        let request = actix_test::TestRequest::get()
            .uri("/leave-balance/55?leave_type_id=1")
            .insert_header(bearer(Role::Hr, None))
            .to_request();

        let response = actix_test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn working_days_breaks_down_by_month() {
        let service = actix_test::init_service(app(LeaveAccounting::new(store_with_annual(0.0)))).await;
        let request = actix_test::TestRequest::get()
            .uri("/working-days?start_date=2024-01-29&end_date=2024-02-02")
            .to_request();

        let body: Value = actix_test::call_and_read_body_json(&service, request).await;
        assert_eq!(body["working_days"], 5);
        assert_eq!(body["months"].as_array().map(Vec::len), Some(2));

        let request = actix_test::TestRequest::get()
            .uri("/working-days/2024/13")
            .to_request();
        let response = actix_test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
