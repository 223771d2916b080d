use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::Validation("Unknown role in token".into())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

/// The single policy point: every role-gated entry calls `require`, nothing
/// re-derives role logic inline.
pub fn require(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    require(user, Role::Admin)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Validation("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Validation("Invalid Authorization header".into()))?;

        if !auth_str.starts_with("Bearer ") {
            return Err(AppError::Validation("Invalid Authorization scheme".into()));
        }
        let token = auth_str.trim_start_matches("Bearer ").trim();

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Validation("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Validation("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role: Role::parse(&decoded.claims.role)?,
        })
    }
}

/// Who a cart belongs to: a signed-in customer (bearer token) or an anonymous
/// guest identified by the `X-Session-Id` header.
#[derive(Debug, Clone, Copy)]
pub enum CartOwner {
    Customer(Uuid),
    Guest(Uuid),
}

impl CartOwner {
    pub fn owner_id(&self) -> Uuid {
        match self {
            CartOwner::Customer(id) | CartOwner::Guest(id) => *id,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, CartOwner::Guest(_))
    }

    pub fn customer_id(&self) -> Option<Uuid> {
        match self {
            CartOwner::Customer(id) => Some(*id),
            CartOwner::Guest(_) => None,
        }
    }
}

impl<S> FromRequestParts<S> for CartOwner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(header::AUTHORIZATION) {
            let user = AuthUser::from_request_parts(parts, state).await?;
            return Ok(CartOwner::Customer(user.user_id));
        }

        let session = parts
            .headers
            .get("x-session-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Validation("Provide a bearer token or an X-Session-Id header".into())
            })?;

        let session_id = Uuid::parse_str(session.trim())
            .map_err(|_| AppError::Validation("X-Session-Id must be a uuid".into()))?;

        Ok(CartOwner::Guest(session_id))
    }
}
