//! Permission names used by the API.
//!
//! Permissions are `resource:action` strings stored in the `permissions`
//! table. The constants below are the ones seeded by the migrations and
//! checked by route guards.
//!
//! ```ignore
//! use unimedia_core::permissions;
//!
//! if permissions::is_valid_permission_name("media:read") {
//!     // ...
//! }
//! ```

// =============================================================================
// Users
// =============================================================================

pub const USERS_READ: &str = "users:read";
pub const USERS_WRITE: &str = "users:write";
pub const USERS_DELETE: &str = "users:delete";

// =============================================================================
// Roles
// =============================================================================

pub const ROLES_READ: &str = "roles:read";
pub const ROLES_WRITE: &str = "roles:write";
/// Assign roles to users and remove them
pub const ROLES_ASSIGN: &str = "roles:assign";

// =============================================================================
// Permissions
// =============================================================================

pub const PERMISSIONS_READ: &str = "permissions:read";
pub const PERMISSIONS_WRITE: &str = "permissions:write";

// =============================================================================
// Media library and requests
// =============================================================================

pub const MEDIA_READ: &str = "media:read";
pub const MEDIA_WRITE: &str = "media:write";
pub const REQUESTS_READ: &str = "requests:read";
pub const REQUESTS_WRITE: &str = "requests:write";
pub const REQUESTS_APPROVE: &str = "requests:approve";

/// Every permission seeded by the initial migrations.
pub const ALL: &[&str] = &[
    USERS_READ,
    USERS_WRITE,
    USERS_DELETE,
    ROLES_READ,
    ROLES_WRITE,
    ROLES_ASSIGN,
    PERMISSIONS_READ,
    PERMISSIONS_WRITE,
    MEDIA_READ,
    MEDIA_WRITE,
    REQUESTS_READ,
    REQUESTS_WRITE,
    REQUESTS_APPROVE,
];

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Splits `resource:action` into its parts. Returns `None` unless both parts
/// are non-empty and made of lowercase letters, digits and underscores.
pub fn parse(name: &str) -> Option<(&str, &str)> {
    let (resource, action) = name.split_once(':')?;
    if is_segment(resource) && is_segment(action) {
        Some((resource, action))
    } else {
        None
    }
}

pub fn is_valid_permission_name(name: &str) -> bool {
    parse(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_permissions_are_well_formed() {
        for name in ALL {
            assert!(is_valid_permission_name(name), "{name}");
        }
    }

    #[test]
    fn test_parse_splits_resource_and_action() {
        assert_eq!(parse("requests:approve"), Some(("requests", "approve")));
        assert_eq!(parse("media_items:bulk_edit"), Some(("media_items", "bulk_edit")));
    }

    #[test]
    fn test_rejects_malformed_names() {
        let bad = [
            "",
            "users",
            ":read",
            "users:",
            "Users:read",
            "users:read:extra",
            "users :read",
            "users-x:read",
        ];
        for name in bad {
            assert!(!is_valid_permission_name(name), "{name}");
        }
    }
}
