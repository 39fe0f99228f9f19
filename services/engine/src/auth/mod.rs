//! Accounts and Sessions
//!
//! Registration, login and bearer-token authentication. Passwords are stored
//! as argon2 PHC strings; sessions are stateless HS256 tokens.

mod password;
mod token;
mod types;

pub use password::{hash_password, spawn_hash, spawn_verify, verify_password};
pub use token::{Claims, TokenIssuer, DEFAULT_TOKEN_TTL_DAYS};
pub use types::{Credentials, Plan, PublicUser, Role, Session, User};

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::{StoreError, UserStore};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Only {allowed} addresses are allowed for registration")]
    EmailDomainNotAllowed { allowed: String },

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Admin access required")]
    AdminRequired,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidEmail
            | AuthError::EmailDomainNotAllowed { .. }
            | AuthError::PasswordTooShort { .. } => "validation",
            AuthError::EmailTaken => "email_taken",
            AuthError::InvalidCredentials
            | AuthError::NotAuthenticated
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::UserNotFound => "unauthorized",
            AuthError::AdminRequired => "forbidden",
            AuthError::Store(_) => "store",
            AuthError::Internal(_) => "internal",
        }
    }
}

/// Registration policy
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    /// Lower-case domains accepted at registration; empty accepts any
    pub allowed_email_domains: Vec<String>,
    /// Lower-case emails that register with the admin role
    pub admin_emails: Vec<String>,
}

impl AuthPolicy {
    fn domain_allowed(&self, email: &str) -> bool {
        if self.allowed_email_domains.is_empty() {
            return true;
        }
        match email.rsplit_once('@') {
            Some((_, domain)) => self.allowed_email_domains.iter().any(|d| d == domain),
            None => false,
        }
    }

    fn allowed_description(&self) -> String {
        self.allowed_email_domains
            .iter()
            .map(|d| format!("@{}", d))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Minimal address check: one `@`, non-empty local part, dotted domain, no whitespace
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer, policy: AuthPolicy) -> Self {
        Self {
            users,
            tokens,
            policy,
        }
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if !self.policy.domain_allowed(&email) {
            return Err(AuthError::EmailDomainNotAllowed {
                allowed: self.policy.allowed_description(),
            });
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let role = if self.policy.admin_emails.contains(&email) {
            Role::Admin
        } else {
            Role::User
        };
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: spawn_hash(credentials.password.clone()).await?,
            plan: Plan::Free,
            role,
            created_at: Utc::now(),
        };

        match self.users.insert(&user).await {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, role = ?user.role, "Registered user");
        self.session_for(&user)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        let verified = match self.users.find_by_email(&email).await? {
            Some(user) => {
                let matches =
                    spawn_verify(credentials.password.clone(), user.password_hash.clone()).await?;
                matches.then_some(user)
            }
            None => None,
        };
        let Some(user) = verified else {
            warn!(email = %email, "Failed login");
            return Err(AuthError::InvalidCredentials);
        };

        self.session_for(&user)
    }

    /// Resolve an `Authorization` header value to the current user
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<User, AuthError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        let claims = self.tokens.verify(token)?;
        self.users
            .find(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn session_for(&self, user: &User) -> Result<Session, AuthError> {
        Ok(Session {
            token: self.tokens.issue(&user.id, &user.email)?,
            user: PublicUser::from(user),
        })
    }
}
