// src/services/auth.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::rep::{Admin, Principal, Role, SalesRep},
    services::identity::IdentityProvider,
};

/// Role lookups against the relational store, behind a seam so the gate can
/// be tested without a database.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_active_rep(&self, uid: &str) -> Result<Option<SalesRep>, AppError>;
    async fn find_active_admin(&self, uid: &str) -> Result<Option<Admin>, AppError>;
}

/// Accepts either a raw token or a `Bearer <token>` header value. The prefix
/// is stripped before trimming so a scheme with an empty token ("Bearer",
/// "Bearer ") yields no credential rather than the literal word.
pub fn extract_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let token = header.strip_prefix("Bearer").map(str::trim).unwrap_or(header);
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleStore>,
    admin_grant_key: Option<String>,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        roles: Arc<dyn RoleStore>,
        admin_grant_key: Option<String>,
    ) -> Self {
        Self {
            identity,
            roles,
            admin_grant_key,
        }
    }

    /// Runs the full per-request gate: token extraction, verification, user
    /// resolution and role lookup. Every failure terminates with a 401; an
    /// authenticated but roleless principal is a valid outcome and is left
    /// for the role gates to reject.
    pub async fn authenticate(&self, auth_header: Option<&str>) -> Result<Principal, AppError> {
        let token = extract_token(auth_header)
            .ok_or_else(|| AppError::Unauthorized("Authentication token required.".into()))?;

        let uid = self
            .identity
            .verify_token(token)
            .await
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        let user = self
            .identity
            .get_user(&uid)
            .await
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        // Both lookups run concurrently; any database error fails closed as
        // a 401 rather than a 500.
        let (rep, admin) = tokio::join!(
            self.roles.find_active_rep(&uid),
            self.roles.find_active_admin(&uid)
        );
        let (rep, admin) = match (rep, admin) {
            (Ok(rep), Ok(admin)) => (rep, admin),
            _ => {
                return Err(AppError::Unauthorized(
                    "Could not resolve account roles.".into(),
                ))
            }
        };

        let mut roles = Vec::new();
        let mut grant_key = None;
        if let Some(rep) = rep {
            roles.push(Role::SalesRep);
            grant_key = rep.grant_key;
        }
        if admin.is_some() {
            roles.push(Role::Admin);
            if grant_key.is_none() {
                // Admins without a rep row fall back to the org-level key.
                grant_key = self.admin_grant_key.clone();
            }
        }

        Ok(Principal {
            uid,
            user,
            roles,
            grant_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rep::IdentityUser;
    use crate::services::identity::IdentityError;
    use chrono::Utc;

    struct FakeIdentity;

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn verify_token(&self, token: &str) -> Result<String, IdentityError> {
            match token {
                "good" => Ok("u1".to_string()),
                _ => Err(IdentityError::InvalidToken),
            }
        }

        async fn get_user(&self, uid: &str) -> Result<IdentityUser, IdentityError> {
            Ok(IdentityUser {
                uid: uid.to_string(),
                email: Some("u1@example.com".to_string()),
                display_name: None,
            })
        }
    }

    struct FakeRoles {
        rep: bool,
        admin: bool,
        fail: bool,
    }

    #[async_trait]
    impl RoleStore for FakeRoles {
        async fn find_active_rep(&self, uid: &str) -> Result<Option<SalesRep>, AppError> {
            if self.fail {
                return Err(AppError::Unauthorized("boom".into()));
            }
            Ok(self.rep.then(|| SalesRep {
                uid: uid.to_string(),
                name: "Rep One".to_string(),
                phone: None,
                grant_key: Some("gk1".to_string()),
                commission_rate: None,
                is_active: true,
                created_at: Utc::now(),
            }))
        }

        async fn find_active_admin(&self, uid: &str) -> Result<Option<Admin>, AppError> {
            if self.fail {
                return Err(AppError::Unauthorized("boom".into()));
            }
            Ok(self.admin.then(|| Admin {
                uid: uid.to_string(),
                name: "Admin One".to_string(),
                phone: None,
                is_active: true,
                created_at: Utc::now(),
            }))
        }
    }

    fn service(rep: bool, admin: bool, fail: bool) -> AuthService {
        AuthService::new(
            Arc::new(FakeIdentity),
            Arc::new(FakeRoles { rep, admin, fail }),
            Some("org-key".to_string()),
        )
    }

    #[test]
    fn token_extraction_accepts_raw_and_bearer_forms() {
        assert_eq!(extract_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_token(Some("Bearer   abc  ")), Some("abc"));
        assert_eq!(extract_token(Some("abc")), Some("abc"));
        assert_eq!(extract_token(Some("")), None);
        assert_eq!(extract_token(Some("   ")), None);
        assert_eq!(extract_token(Some("Bearer")), None);
        assert_eq!(extract_token(Some("Bearer ")), None);
        assert_eq!(extract_token(None), None);
    }

    #[tokio::test]
    async fn dual_role_principal_gets_both_roles_in_lookup_order() {
        let principal = service(true, true, false)
            .authenticate(Some("Bearer good"))
            .await
            .unwrap();
        assert_eq!(principal.roles, vec![Role::SalesRep, Role::Admin]);
        assert_eq!(principal.grant_key.as_deref(), Some("gk1"));
    }

    #[tokio::test]
    async fn roleless_principal_is_authenticated() {
        let principal = service(false, false, false)
            .authenticate(Some("good"))
            .await
            .unwrap();
        assert!(principal.roles.is_empty());
        assert!(principal.grant_key.is_none());
    }

    #[tokio::test]
    async fn admin_without_rep_row_uses_org_level_key() {
        let principal = service(false, true, false)
            .authenticate(Some("good"))
            .await
            .unwrap();
        assert_eq!(principal.roles, vec![Role::Admin]);
        assert_eq!(principal.grant_key.as_deref(), Some("org-key"));
    }

    #[tokio::test]
    async fn role_lookup_failure_fails_closed_with_401() {
        let err = service(true, true, true)
            .authenticate(Some("good"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn bad_token_is_rejected() {
        let err = service(true, false, false)
            .authenticate(Some("Bearer nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
