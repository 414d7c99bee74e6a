use crate::{
    api::{applications, attendance, feedback, mail, syllabus, timetable, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let mail_limiter = Arc::new(build_limiter(config.rate_mail_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/otp/verify")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::verify_otp)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Notification relay; public on purpose, fenced by its own limiter.
    cfg.service(
        web::resource("/api/send-email")
            .wrap(mail_limiter)
            .route(web::post().to(mail::send_email)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    // /attendance?date=
                    .service(web::resource("").route(web::get().to(attendance::attendance_for_date)))
                    // /attendance/mark
                    .service(
                        web::resource("/mark").route(web::post().to(attendance::mark_attendance)),
                    )
                    // /attendance/range?start=&end=
                    .service(
                        web::resource("/range")
                            .route(web::get().to(attendance::attendance_for_range)),
                    )
                    // /attendance/stats
                    .service(
                        web::resource("/stats").route(web::get().to(attendance::dashboard_stats)),
                    )
                    // /attendance/user/{pin}
                    .service(
                        web::resource("/user/{pin}")
                            .route(web::get().to(attendance::attendance_for_user)),
                    )
                    // /attendance/user/{pin}/today
                    .service(
                        web::resource("/user/{pin}/today")
                            .route(web::get().to(attendance::attendance_today)),
                    ),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::post().to(users::create_user))
                            .route(web::get().to(users::list_users)),
                    )
                    // /users/check-pin/{pin} (before the catch-all {pin})
                    .service(
                        web::resource("/check-pin/{pin}").route(web::get().to(users::check_pin)),
                    )
                    // /users/{pin}
                    .service(
                        web::resource("/{pin}")
                            .route(web::get().to(users::get_user))
                            .route(web::put().to(users::update_user))
                            .route(web::delete().to(users::delete_user)),
                    ),
            )
            .service(
                web::scope("/applications")
                    // /applications
                    .service(
                        web::resource("")
                            .route(web::post().to(applications::submit_application))
                            .route(web::get().to(applications::list_applications)),
                    )
                    // /applications/user/{pin}
                    .service(
                        web::resource("/user/{pin}")
                            .route(web::get().to(applications::applications_for_user)),
                    )
                    // /applications/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(applications::review_application)),
                    ),
            )
            .service(
                web::scope("/syllabus")
                    // /syllabus
                    .service(web::resource("").route(web::get().to(syllabus::list_syllabus)))
                    // /syllabus/{id}/progress
                    .service(
                        web::resource("/{id}/progress")
                            .route(web::put().to(syllabus::update_syllabus_progress)),
                    ),
            )
            .service(
                web::scope("/timetables")
                    // /timetables?branch=&year=
                    .service(
                        web::resource("")
                            .route(web::get().to(timetable::get_timetable))
                            .route(web::put().to(timetable::upsert_timetable)),
                    ),
            )
            .service(
                web::scope("/feedback")
                    // /feedback
                    .service(
                        web::resource("")
                            .route(web::post().to(feedback::submit_feedback))
                            .route(web::get().to(feedback::list_feedback)),
                    )
                    // /feedback/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(feedback::update_feedback_status)),
                    ),
            ),
    );
}

// LOGIN (staff only; students have no portal access)
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)
//  super admin: /auth/login → otp_required → /auth/otp/verify → tokens

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns rotated refresh_token + new access_token
