use crate::api::applications::{ReviewReq, SubmitApplicationReq};
use crate::api::attendance::{DashboardStats, MarkAttendanceReq, MarkAttendanceResponse};
use crate::api::feedback::{FeedbackStatusReq, SubmitFeedbackReq};
use crate::api::mail::{SendEmailReq, SendEmailResponse};
use crate::api::syllabus::SyllabusProgressReq;
use crate::api::timetable::UpsertTimetableReq;
use crate::api::users::{CreateUserReq, PinAvailability};
use crate::geo::Coordinates;
use crate::model::application::{Application, ApplicationStatus, ApplicationType};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::feedback::Feedback;
use crate::model::role::Role;
use crate::model::syllabus::SyllabusCoverage;
use crate::model::timetable::Timetable;
use crate::model::user::User;
use crate::models::{LoginReqDto, OtpVerifyDto};
use crate::services::verification::{FaceVerification, ImageQuality};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mira Attendance API",
        version = "1.0.0",
        description = r#"
## Mira Attendance Management System

Backend for a multi-college attendance portal with camera-based marking.

### 🔹 Key Features
- **Attendance Marking**
  - Face-verified, geofenced, one record per user per day
- **User Management**
  - Provision principals, HODs, faculty, staff and students per college
- **Applications**
  - Leave / bonafide / TC submission and review
- **Syllabus & Timetables**
  - Coverage tracking and per-class timetable uploads
- **Feedback & Mail**
  - Feedback triage and a notification email relay

### 🔐 Security
Staff log in with PIN + password (super admin adds an email OTP).
Students never log in; they are subjects of marking only.
Protected endpoints use **JWT Bearer authentication**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::verify_otp,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::attendance_for_date,
        crate::api::attendance::attendance_for_range,
        crate::api::attendance::attendance_for_user,
        crate::api::attendance::attendance_today,
        crate::api::attendance::dashboard_stats,

        crate::api::users::create_user,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,
        crate::api::users::check_pin,

        crate::api::applications::submit_application,
        crate::api::applications::applications_for_user,
        crate::api::applications::list_applications,
        crate::api::applications::review_application,

        crate::api::syllabus::list_syllabus,
        crate::api::syllabus::update_syllabus_progress,

        crate::api::timetable::get_timetable,
        crate::api::timetable::upsert_timetable,

        crate::api::feedback::submit_feedback,
        crate::api::feedback::list_feedback,
        crate::api::feedback::update_feedback_status,

        crate::api::mail::send_email
    ),
    components(
        schemas(
            LoginReqDto,
            OtpVerifyDto,
            Role,
            User,
            AttendanceStatus,
            AttendanceRecord,
            Coordinates,
            MarkAttendanceReq,
            MarkAttendanceResponse,
            DashboardStats,
            FaceVerification,
            ImageQuality,
            CreateUserReq,
            PinAvailability,
            ApplicationType,
            ApplicationStatus,
            Application,
            SubmitApplicationReq,
            ReviewReq,
            SyllabusCoverage,
            SyllabusProgressReq,
            Timetable,
            UpsertTimetableReq,
            Feedback,
            SubmitFeedbackReq,
            FeedbackStatusReq,
            SendEmailReq,
            SendEmailResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, OTP and token lifecycle APIs"),
        (name = "Attendance", description = "Attendance marking and reporting APIs"),
        (name = "Users", description = "Account provisioning APIs"),
        (name = "Applications", description = "Leave / bonafide / TC APIs"),
        (name = "Syllabus", description = "Syllabus coverage APIs"),
        (name = "Timetables", description = "Timetable upload APIs"),
        (name = "Feedback", description = "Feedback triage APIs"),
        (name = "Mail", description = "Notification email relay"),
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
