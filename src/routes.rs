use crate::{
    api::{analytics, attendance, dashboard, department, employee, report, task},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiters, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Limiter>,
    scan: Arc<Limiter>,
    protected: Arc<Limiter>,
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))?;
    Ok(Governor::new(&cfg))
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            scan: Arc::new(build_limiter(config.rate_scan_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Kiosk scanner, no session
    cfg.service(
        web::resource("/attendance/scan")
            .wrap(limiters.scan)
            .route(web::post().to(attendance::scan)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiters.protected)
            .route("/me", web::get().to(handlers::me))
            .route("/users", web::post().to(handlers::create_user))
            .route("/dashboard", web::get().to(dashboard::dashboard))
            .service(
                web::scope("/attendance")
                    .route("", web::get().to(attendance::list_logs))
                    .route("/statistics", web::get().to(attendance::statistics)),
            )
            .service(
                web::scope("/analytics")
                    .route("", web::get().to(analytics::local_analysis))
                    .route("/external", web::post().to(analytics::external_analysis)),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    // /employees/{id}/qr
                    .service(web::resource("/{id}/qr").route(web::get().to(employee::employee_qr))),
            )
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(department::get_department))
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    ),
            )
            .service(
                web::scope("/tasks")
                    .service(
                        web::resource("")
                            .route(web::get().to(task::list_tasks))
                            .route(web::post().to(task::create_task)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(task::get_task))
                            .route(web::put().to(task::update_task))
                            .route(web::delete().to(task::delete_task)),
                    )
                    // /tasks/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(task::update_task_status)),
                    ),
            )
            .route("/reports", web::post().to(report::generate_report)),
    );
}
