// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::rep::{Principal, Role},
};

/// The auth gate: resolves the bearer credential into a request-scoped
/// principal, or fails closed with a 401. Role checks live in the guards
/// below, not here — an authenticated but roleless principal passes.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    let principal = app_state.auth_service.authenticate(auth_header).await?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn require_role(request: &Request<Body>, role: Role) -> Result<(), AppError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(|| AppError::Unauthorized("Authentication token required.".into()))?;

    if principal.has_role(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn sales_guard(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(&request, Role::SalesRep)?;
    Ok(next.run(request).await)
}

pub async fn admin_guard(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(&request, Role::Admin)?;
    Ok(next.run(request).await)
}

/// Extractor handing the authenticated principal to handlers.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AppError::Unauthorized("Authentication token required.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rep::IdentityUser;

    fn request_with_principal(roles: Vec<Role>) -> Request<Body> {
        let mut request = Request::new(Body::empty());
        request.extensions_mut().insert(Principal {
            uid: "u1".to_string(),
            user: IdentityUser {
                uid: "u1".to_string(),
                email: None,
                display_name: None,
            },
            roles,
            grant_key: None,
        });
        request
    }

    #[test]
    fn admin_gate_rejects_plain_rep() {
        let request = request_with_principal(vec![Role::SalesRep]);
        assert!(matches!(
            require_role(&request, Role::Admin),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn admin_gate_passes_dual_role_principal() {
        let request = request_with_principal(vec![Role::SalesRep, Role::Admin]);
        assert!(require_role(&request, Role::Admin).is_ok());
        assert!(require_role(&request, Role::SalesRep).is_ok());
    }

    #[test]
    fn roleless_principal_is_forbidden_everywhere() {
        let request = request_with_principal(vec![]);
        assert!(matches!(
            require_role(&request, Role::SalesRep),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            require_role(&request, Role::Admin),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn missing_principal_is_unauthorized() {
        let request = Request::new(Body::empty());
        assert!(matches!(
            require_role(&request, Role::Admin),
            Err(AppError::Unauthorized(_))
        ));
    }
}
