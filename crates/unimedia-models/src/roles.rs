//! Roles, permissions, and their assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use unimedia_core::permissions::is_valid_permission_name;
use unimedia_core::serde::deserialize_optional_bool;
use unimedia_core::{PaginationMeta, PaginationParams};

use crate::ids::{PermissionId, RoleId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Permission {
    pub id: PermissionId,
    /// `resource:action`
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn resource(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(r, _)| r)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    /// Seeded roles; they cannot be deleted.
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Compact role reference embedded in user payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
}

/// A role as held by a particular user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AssignedRole {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
}

pub fn validate_role_name(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_valid = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if starts_with_letter && rest_valid {
        Ok(())
    } else {
        Err(ValidationError::new("role_name_format").with_message(
            "Role name must start with a lowercase letter and contain only a-z, 0-9, '_' or '-'"
                .into(),
        ))
    }
}

pub fn validate_permission_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_permission_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("permission_name_format")
            .with_message("Permission name must look like resource:action".into()))
    }
}

// DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleDto {
    #[validate(
        length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"),
        custom(function = "validate_role_name")
    )]
    pub name: String,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    /// Permissions granted to the role on creation
    pub permission_ids: Option<Vec<PermissionId>>,
}

/// Only the description of a role can change. A `name` different from the
/// current one is rejected.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleDto {
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignPermissionsDto {
    #[validate(length(min = 1, message = "At least one permission id is required"))]
    pub permission_ids: Vec<PermissionId>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignRoleToUserDto {
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePermissionDto {
    #[validate(
        length(max = 100, message = "Name must not exceed 100 characters"),
        custom(function = "validate_permission_name")
    )]
    pub name: String,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_system: Option<bool>,
    /// Case-insensitive substring match on name
    pub name: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PermissionFilterParams {
    /// Resource part of the name, e.g. `media`
    pub resource: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedRolesResponse {
    pub data: Vec<RoleWithPermissions>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedPermissionsResponse {
    pub data: Vec<Permission>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleAssignmentResponse {
    pub message: String,
    pub user_id: UserId,
    pub role_id: RoleId,
}

/// Effective permissions of a user: the deduplicated union over their roles.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserPermissionsResponse {
    pub user_id: UserId,
    pub permissions: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_role_dto_validation() {
        let valid = CreateRoleDto {
            name: "curator".to_string(),
            description: Some("Curates collections".to_string()),
            permission_ids: None,
        };
        assert!(valid.validate().is_ok());

        for name in ["", "x", "Curator", "9lives", "has space", "a".repeat(51).as_str()] {
            let dto = CreateRoleDto {
                name: name.to_string(),
                description: None,
                permission_ids: None,
            };
            assert!(dto.validate().is_err(), "{name}");
        }
    }

    #[test]
    fn test_update_role_description_length() {
        let long = UpdateRoleDto {
            name: None,
            description: Some("x".repeat(501)),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_create_permission_dto_validation() {
        let ok = CreatePermissionDto {
            name: "media:delete".to_string(),
            description: None,
        };
        assert!(ok.validate().is_ok());

        for name in ["media", "Media:read", "media:", ":read", "a:b:c"] {
            let dto = CreatePermissionDto {
                name: name.to_string(),
                description: None,
            };
            let errors = dto.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("name"), "{name}");
        }
    }

    #[test]
    fn test_assign_permissions_requires_ids() {
        let empty = AssignPermissionsDto {
            permission_ids: vec![],
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_permission_resource() {
        let permission = Permission {
            id: PermissionId::new(),
            name: "requests:approve".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(permission.resource(), "requests");
    }

    #[test]
    fn test_role_with_permissions_flattens_role() {
        let role = Role {
            id: RoleId::new(),
            name: "curator".to_string(),
            description: None,
            is_system: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(RoleWithPermissions {
            role,
            permissions: vec![],
        })
        .unwrap();
        assert_eq!(value["name"], "curator");
        assert!(value["permissions"].as_array().unwrap().is_empty());
    }
}
