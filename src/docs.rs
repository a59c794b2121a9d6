use crate::api::department::CreateDepartment;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::leave_balance::{BalanceQuery, ConsumeBalance, WorkingDaysResponse};
use crate::api::leave_request::{ApprovalResponse, CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::leave_type::CreateLeaveType;
use crate::leave::error::{ErrorBody, ErrorKind};
use crate::leave::stats::{BalanceStatus, BalanceSummary, BalanceView};
use crate::leave::working_days::MonthSegment;
use crate::leave::{BalanceReport, Consumption};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::leave_balance::AvailableBalance;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;
use crate::models::{LoginReqDto, LoginResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave accounting for an HRM system

Tracks per-employee, per-leave-type balances and debits them by **working days** (Monday to Friday).

### 🔹 Key Features
- **Leave Balances**
  - Query one or all balances with usage statistics and a summary
  - Consume working days atomically; a balance never goes below zero
- **Working Days**
  - Count working days in a month or across a date range
- **Leave Types, Departments, Employees**
  - Create, update, list and delete; employees are archived rather than deleted
- **Leave Requests**
  - Apply, approve (consumes the balance) or reject

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
What a caller may do depends on its role (Admin, HR, Employee, System, API user).

### 📦 Errors
Every failure answers `{ "kind", "message", "debug"? }` where `kind` is one of
`not_found`, `conflict`, `insufficient_balance`, `invalid`, `internal`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::leave_balance::get_balances,
        crate::api::leave_balance::consume_balance,
        crate::api::leave_balance::working_days,
        crate::api::leave_balance::working_days_for_month,

        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::get_leave_type,
        crate::api::leave_type::update_leave_type,
        crate::api::leave_type::delete_leave_type,

        crate::api::department::create_department,
        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            ErrorBody,
            ErrorKind,
            AvailableBalance,
            BalanceQuery,
            BalanceReport,
            BalanceView,
            BalanceSummary,
            BalanceStatus,
            ConsumeBalance,
            Consumption,
            MonthSegment,
            WorkingDaysResponse,
            LeaveType,
            CreateLeaveType,
            Department,
            CreateDepartment,
            Employee,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            LeaveRequest,
            LeaveStatus,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            ApprovalResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication APIs"),
        (name = "Leave Balance", description = "Leave balance and working day APIs"),
        (name = "Leave Type", description = "Leave type management APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Leave", description = "Leave request APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
