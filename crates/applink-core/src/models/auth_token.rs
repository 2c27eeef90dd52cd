//! Credential and permission-scope value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, LifecycleResult};

/// Immutable OAuth credential triple for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> LifecycleResult<Self> {
        let access_token = access_token.into();
        let refresh_token = refresh_token.into();
        if access_token.trim().is_empty() {
            return Err(LifecycleError::Validation {
                message: "access token is empty".into(),
            });
        }
        if refresh_token.trim().is_empty() {
            return Err(LifecycleError::Validation {
                message: "refresh token is empty".into(),
            });
        }
        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Renewal payload delivered by the remote platform: the member the
/// credentials belong to plus the fresh triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewedAuthToken {
    pub member_id: String,
    pub auth_token: AuthToken,
}

impl RenewedAuthToken {
    pub fn new(member_id: impl Into<String>, auth_token: AuthToken) -> LifecycleResult<Self> {
        let member_id = member_id.into();
        if member_id.trim().is_empty() {
            return Err(LifecycleError::Validation {
                message: "member id is empty".into(),
            });
        }
        Ok(Self {
            member_id,
            auth_token,
        })
    }
}

/// Normalized set of permission scope codes granted to the application.
///
/// Codes are lowercased and deduplicated; ordering is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope(Vec<String>);

impl Scope {
    pub fn new<I, S>(codes: I) -> LifecycleResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for code in codes {
            let code = code.into().trim().to_lowercase();
            if code.is_empty() {
                return Err(LifecycleError::Validation {
                    message: "scope code is empty".into(),
                });
            }
            if !normalized.contains(&code) {
                normalized.push(code);
            }
        }
        normalized.sort();
        Ok(Self(normalized))
    }

    pub fn contains(&self, code: &str) -> bool {
        let code = code.to_lowercase();
        self.0.iter().any(|c| *c == code)
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
