//! Request Guards
//!
//! CSRF and authentication checks consumed by the admin endpoints. Both are
//! small stateless traits so tests and other deployments can swap them out.

use crate::config::AdminAccount;
use axum::http::{HeaderMap, header::AUTHORIZATION};
use serde::Serialize;

/// The authenticated admin performing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUser {
    /// Recorded as `created_by`/`updated_by`
    pub id: i64,
    /// Login name, used in logs
    pub username: String,
}

/// Validates the CSRF token submitted with a mutating request.
pub trait CsrfGuard: Send + Sync {
    /// True if `token` is acceptable.
    fn check(&self, token: &str) -> bool;
}

/// Resolves the acting admin from request headers.
pub trait AuthGate: Send + Sync {
    /// The authenticated user, or `None` if the request carries no valid credentials.
    fn current_user(&self, headers: &HeaderMap) -> Option<AdminUser>;
}

/// Compares two secrets without leaking where they differ, or their lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use sha2::{Digest, Sha256};
    use subtle::ConstantTimeEq;

    let hash_a = Sha256::digest(a);
    let hash_b = Sha256::digest(b);
    hash_a.ct_eq(&hash_b).into()
}

/// Accepts exactly one configured token. With no token configured every check fails.
#[derive(Debug, Clone)]
pub struct StaticCsrfGuard {
    expected: Option<String>,
}

impl StaticCsrfGuard {
    /// Guard expecting `expected`; blank counts as unconfigured.
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|t| !t.is_empty()),
        }
    }
}

impl CsrfGuard for StaticCsrfGuard {
    fn check(&self, token: &str) -> bool {
        match &self.expected {
            Some(expected) if !token.is_empty() => {
                constant_time_eq(token.as_bytes(), expected.as_bytes())
            }
            _ => false,
        }
    }
}

/// Maps `Authorization: Bearer <token>` onto a configured admin account.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthGate {
    admins: Vec<AdminAccount>,
}

impl TokenAuthGate {
    /// Gate over `admins`; accounts with a blank token are dropped.
    pub fn new(admins: Vec<AdminAccount>) -> Self {
        Self {
            admins: admins.into_iter().filter(|a| !a.token.is_empty()).collect(),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

impl AuthGate for TokenAuthGate {
    fn current_user(&self, headers: &HeaderMap) -> Option<AdminUser> {
        let token = bearer_token(headers)?;
        self.admins
            .iter()
            .find(|admin| constant_time_eq(token.as_bytes(), admin.token.as_bytes()))
            .map(|admin| AdminUser {
                id: admin.id,
                username: admin.username.clone(),
            })
    }
}
