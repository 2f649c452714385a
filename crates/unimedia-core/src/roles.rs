//! The seeded roles.
//!
//! Their ids are fixed by the seed migration so code can refer to them
//! without a lookup. All four are system roles and cannot be deleted.

use uuid::Uuid;

pub const ADMIN: &str = "admin";
pub const MODERATOR: &str = "moderator";
pub const USER: &str = "user";
pub const GUEST: &str = "guest";

pub const ADMIN_ID: Uuid = Uuid::from_u128(1);
pub const MODERATOR_ID: Uuid = Uuid::from_u128(2);
pub const USER_ID: Uuid = Uuid::from_u128(3);
pub const GUEST_ID: Uuid = Uuid::from_u128(4);

/// Role given to every newly registered account.
pub const DEFAULT_ROLE: &str = USER;
pub const DEFAULT_ROLE_ID: Uuid = USER_ID;

pub const SYSTEM_ROLES: &[&str] = &[ADMIN, MODERATOR, USER, GUEST];

pub fn is_system_role(name: &str) -> bool {
    SYSTEM_ROLES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_seed_migration() {
        assert_eq!(ADMIN_ID.to_string(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(GUEST_ID.to_string(), "00000000-0000-0000-0000-000000000004");
    }

    #[test]
    fn test_default_role_is_user() {
        assert_eq!(DEFAULT_ROLE, "user");
        assert_eq!(DEFAULT_ROLE_ID, USER_ID);
    }

    #[test]
    fn test_is_system_role() {
        assert!(is_system_role("admin"));
        assert!(is_system_role("guest"));
        assert!(!is_system_role("curator"));
    }
}
