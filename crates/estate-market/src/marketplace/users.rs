use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered accounts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Mutually exclusive account roles; every capability check starts here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Builder,
    Manager,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Builder => "builder",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Managers and admins share the moderation capabilities.
    pub const fn is_moderator(self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

/// A registered account. Authentication itself (registration, e-mail
/// verification, token issuance) happens outside this service; the
/// directory only resolves already-issued bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub role: Role,
    pub phone: Option<String>,
    pub is_blocked: bool,
}

/// The authenticated caller. The role always comes from the stored user
/// record, never from token claims.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

/// Account lookup used by every router to resolve bearer tokens.
pub trait UserDirectory: Send + Sync {
    fn resolve_token(&self, token: &str) -> Option<User>;
    fn fetch(&self, id: UserId) -> Option<User>;
}

/// Authentication failures surfaced before any permission rule runs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication credentials were not provided")]
    MissingCredentials,
    #[error("invalid or expired token")]
    UnknownToken,
    #[error("this account is blocked")]
    Blocked,
}

/// Resolve `Authorization: Bearer <token>` into a [`Principal`].
pub fn authenticate(
    directory: &dyn UserDirectory,
    headers: &HeaderMap,
) -> Result<Principal, AuthError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingCredentials)?;
    let user = directory
        .resolve_token(token.trim())
        .ok_or(AuthError::UnknownToken)?;
    if user.is_blocked {
        return Err(AuthError::Blocked);
    }
    Ok(Principal {
        user_id: user.id,
        role: user.role,
    })
}

/// Compact account card embedded in announcement and message views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub surname: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
        }
    }
}
