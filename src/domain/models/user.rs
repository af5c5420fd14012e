//! User (requester) domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Requester role. Quota defaults grow with seniority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    Student,
    Faculty,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(Self::Guest),
            "student" => Some(Self::Student),
            "faculty" => Some(Self::Faculty),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Per-role quota defaults: (max simultaneous bookings, max weekly hours).
    pub fn default_quotas(&self) -> (u32, u32) {
        match self {
            Self::Guest => (1, 4),
            Self::Student => (3, 10),
            Self::Faculty => (5, 20),
            Self::Admin => (10, 40),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated individual who may create bookings.
///
/// Created on first sign-in with role-default quotas; quotas and role are
/// mutated only by an administrator. Users are deactivated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
    /// Max concurrent active bookings (role default, per-user override)
    pub max_simultaneous_bookings: u32,
    /// Max booked hours per ISO week (role default, per-user override)
    pub max_weekly_hours: u32,
    /// Labs this user is barred from
    pub restricted_lab_ids: Vec<String>,
    /// Bookings by this user skip the approval queue
    pub exempt_from_approval: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Self {
        let (max_bookings, max_hours) = role.default_quotas();
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            is_active: true,
            is_verified: false,
            max_simultaneous_bookings: max_bookings,
            max_weekly_hours: max_hours,
            restricted_lab_ids: Vec::new(),
            exempt_from_approval: role == UserRole::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_lab_restricted(&self, lab_id: &str) -> bool {
        self.restricted_lab_ids.iter().any(|id| id == lab_id)
    }

    /// Change the role and re-apply its quota defaults. Explicit per-user
    /// overrides must be re-applied afterwards by the caller.
    pub fn change_role(&mut self, role: UserRole) {
        self.role = role;
        let (max_bookings, max_hours) = role.default_quotas();
        self.max_simultaneous_bookings = max_bookings;
        self.max_weekly_hours = max_hours;
        self.exempt_from_approval = role == UserRole::Admin;
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_grow_with_seniority() {
        let (guest_b, guest_h) = UserRole::Guest.default_quotas();
        let (student_b, student_h) = UserRole::Student.default_quotas();
        let (faculty_b, faculty_h) = UserRole::Faculty.default_quotas();
        let (admin_b, admin_h) = UserRole::Admin.default_quotas();

        assert!(guest_b < student_b && student_b < faculty_b && faculty_b < admin_b);
        assert!(guest_h < student_h && student_h < faculty_h && faculty_h < admin_h);
    }

    #[test]
    fn new_user_gets_role_quotas() {
        let user = User::new("u-1", "Ada", "ada@uni.edu", UserRole::Student);
        assert_eq!(user.max_simultaneous_bookings, 3);
        assert_eq!(user.max_weekly_hours, 10);
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert!(!user.exempt_from_approval);
    }

    #[test]
    fn admins_skip_approval_by_default() {
        let admin = User::new("u-2", "Root", "root@uni.edu", UserRole::Admin);
        assert!(admin.is_admin());
        assert!(admin.exempt_from_approval);
    }

    #[test]
    fn lab_restriction_lookup() {
        let mut user = User::new("u-3", "Bob", "bob@uni.edu", UserRole::Student);
        user.restricted_lab_ids.push("lab-9".into());
        assert!(user.is_lab_restricted("lab-9"));
        assert!(!user.is_lab_restricted("lab-1"));
    }

    #[test]
    fn role_change_reapplies_defaults() {
        let mut user = User::new("u-4", "Eve", "eve@uni.edu", UserRole::Student);
        user.max_simultaneous_bookings = 7; // per-user override
        user.change_role(UserRole::Faculty);
        assert_eq!(user.max_simultaneous_bookings, 5);
        assert_eq!(user.max_weekly_hours, 20);
    }

    #[test]
    fn role_string_roundtrip() {
        for role in [
            UserRole::Guest,
            UserRole::Student,
            UserRole::Faculty,
            UserRole::Admin,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("staff"), None);
    }
}
