use crate::{
    api::{department, employee, leave_balance, leave_request, leave_type},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    leave::LeaveError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimits {
    login: Arc<Limiter>,
    protected: Arc<Limiter>,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / requests_per_min as u64;
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} requests per minute"))?;
    Ok(Governor::new(&cfg))
}

/// Malformed bodies, queries and paths answer with the same error body as everything else.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| LeaveError::from_extractor(err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| LeaveError::from_extractor(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| LeaveError::from_extractor(err)));
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    configure_extractors(cfg);

    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(limits.login.clone())
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(limits.protected.clone()) // rate limiting
            .service(
                web::scope("/leave-balance")
                    // /leave-balance/consume
                    .service(
                        web::resource("/consume")
                            .route(web::post().to(leave_balance::consume_balance)),
                    )
                    // /leave-balance/{employee_id}
                    .service(
                        web::resource("/{employee_id}")
                            .route(web::get().to(leave_balance::get_balances)),
                    ),
            )
            .service(
                web::scope("/working-days")
                    .service(web::resource("").route(web::get().to(leave_balance::working_days)))
                    .service(
                        web::resource("/{year}/{month}")
                            .route(web::get().to(leave_balance::working_days_for_month)),
                    ),
            )
            .service(
                web::scope("/leave-type")
                    .service(
                        web::resource("")
                            .route(web::post().to(leave_type::create_leave_type))
                            .route(web::get().to(leave_type::list_leave_types)),
                    )
                    .service(
                        web::resource("/{leave_type_id}")
                            .route(web::get().to(leave_type::get_leave_type))
                            .route(web::put().to(leave_type::update_leave_type))
                            .route(web::delete().to(leave_type::delete_leave_type)),
                    ),
            )
            .service(
                web::scope("/department")
                    .service(
                        web::resource("")
                            .route(web::post().to(department::create_department))
                            .route(web::get().to(department::list_departments)),
                    )
                    .service(
                        web::resource("/{department_id}")
                            .route(web::get().to(department::get_department))
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    ),
            )
            .service(
                web::scope("/employee")
                    // /employee
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employee/{employee_id}
                    .service(
                        web::resource("/{employee_id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{leave_id}
                    .service(web::resource("/{leave_id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{leave_id}/approve
                    .service(
                        web::resource("/{leave_id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{leave_id}/reject
                    .service(
                        web::resource("/{leave_id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            ),
    );
}

// LOGIN
//  └─ access_token (ACCESS_TOKEN_TTL, default 15 min)

// API REQUEST
//  └─ Authorization: Bearer access_token
