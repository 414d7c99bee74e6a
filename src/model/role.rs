use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[strum(serialize = "SUPER_ADMIN")]
    SuperAdmin = 1,
    #[strum(serialize = "PRINCIPAL")]
    Principal = 2,
    #[strum(serialize = "HOD")]
    Hod = 3,
    #[strum(serialize = "FACULTY")]
    Faculty = 4,
    #[strum(serialize = "STAFF")]
    Staff = 5,
    #[strum(serialize = "STUDENT")]
    Student = 6,
}

/// Things a role may do. Evaluated in exactly one place (`Role::can`)
/// instead of ad hoc role-list checks at every call site.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    /// Log into the portal with PIN + password.
    PortalLogin,
    /// Create/update/delete users of the same college.
    ManageUsers,
    /// Manage principal accounts (revoke access, hard delete a college).
    ManagePrincipals,
    /// View attendance reports and dashboard stats.
    ViewReports,
    /// Be the subject of camera/geofence attendance marking.
    MarkableAttendance,
    /// Approve or reject leave/bonafide/TC applications.
    ReviewApplications,
    /// Update syllabus coverage records.
    UpdateSyllabus,
    /// Upload or replace timetables.
    ManageTimetables,
    /// View and triage submitted feedback.
    ReviewFeedback,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::SuperAdmin),
            2 => Some(Role::Principal),
            3 => Some(Role::Hod),
            4 => Some(Role::Faculty),
            5 => Some(Role::Staff),
            6 => Some(Role::Student),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn can(self, cap: Capability) -> bool {
        use Capability::*;
        use Role::*;
        match cap {
            PortalLogin => !matches!(self, Student),
            ManageUsers => matches!(self, SuperAdmin | Principal | Hod),
            ManagePrincipals => matches!(self, SuperAdmin),
            ViewReports => matches!(self, SuperAdmin | Principal | Hod | Faculty),
            MarkableAttendance => matches!(self, Faculty | Student),
            ReviewApplications => matches!(self, SuperAdmin | Principal | Hod),
            UpdateSyllabus => matches!(self, SuperAdmin | Principal | Hod | Faculty),
            ManageTimetables => matches!(self, SuperAdmin | Principal | Hod),
            ReviewFeedback => matches!(self, SuperAdmin | Principal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip() {
        for id in 1..=6u8 {
            let role = Role::from_id(id).unwrap();
            assert_eq!(role.id(), id);
        }
        assert!(Role::from_id(0).is_none());
        assert!(Role::from_id(7).is_none());
    }

    #[test]
    fn students_cannot_log_in() {
        assert!(!Role::Student.can(Capability::PortalLogin));
        assert!(Role::Faculty.can(Capability::PortalLogin));
        assert!(Role::Staff.can(Capability::PortalLogin));
    }

    #[test]
    fn only_faculty_and_students_are_markable() {
        assert!(Role::Faculty.can(Capability::MarkableAttendance));
        assert!(Role::Student.can(Capability::MarkableAttendance));
        assert!(!Role::Principal.can(Capability::MarkableAttendance));
        assert!(!Role::Staff.can(Capability::MarkableAttendance));
    }

    #[test]
    fn only_super_admin_manages_principals() {
        assert!(Role::SuperAdmin.can(Capability::ManagePrincipals));
        assert!(!Role::Principal.can(Capability::ManagePrincipals));
    }
}
