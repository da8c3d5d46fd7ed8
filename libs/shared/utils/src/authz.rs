//! Role and ownership decisions. Pure functions over the authenticated
//! user; all storage lookups happen before these are called.

use uuid::Uuid;

use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

/// Allows only callers holding the given role. Admins pass every role
/// check.
pub fn require_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role == role || user.role.is_admin() {
        return Ok(());
    }

    Err(AppError::Forbidden(format!(
        "User role '{}' is not authorized to access this route",
        user.role
    )))
}

/// Allows the owning practitioner or an admin. `message` is the
/// endpoint-specific denial text returned to the client.
pub fn require_owner_or_admin(
    user: &AuthUser,
    owner_id: Uuid,
    message: &str,
) -> Result<(), AppError> {
    if user.id == owner_id || user.role.is_admin() {
        return Ok(());
    }

    Err(AppError::Forbidden(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: "Dr. Test".to_string(),
            email: "doc@example.com".to_string(),
            role,
            created_at: None,
        }
    }

    #[test]
    fn admin_passes_role_check() {
        assert!(require_role(&user(Role::Admin), Role::Admin).is_ok());
    }

    #[test]
    fn doctor_fails_admin_role_check() {
        assert_matches!(
            require_role(&user(Role::Doctor), Role::Admin),
            Err(AppError::Forbidden(_))
        );
    }

    #[test]
    fn owner_passes_ownership_check() {
        let owner = user(Role::Doctor);
        assert!(require_owner_or_admin(&owner, owner.id, "denied").is_ok());
    }

    #[test]
    fn non_owner_fails_ownership_check() {
        let caller = user(Role::Doctor);
        let err = require_owner_or_admin(&caller, Uuid::new_v4(), "denied").unwrap_err();
        assert_matches!(err, AppError::Forbidden(msg) if msg == "denied");
    }

    #[test]
    fn admin_overrides_ownership() {
        let admin = user(Role::Admin);
        assert!(require_owner_or_admin(&admin, Uuid::new_v4(), "denied").is_ok());
    }
}
