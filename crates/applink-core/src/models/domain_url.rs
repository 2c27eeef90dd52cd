//! Validated tenant domain name.

use std::fmt;

use serde::Serialize;

use crate::error::{LifecycleError, LifecycleResult};

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A syntactically valid tenant domain name, e.g. `portal.example.com`.
///
/// Internationalized labels are accepted in their unicode form
/// (`тест.рус`). Once constructed the value is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DomainUrl(String);

impl DomainUrl {
    /// Parse and validate a domain name.
    ///
    /// Rules: at least two dot-separated labels; labels contain only
    /// alphanumeric characters and hyphens, never start or end with a
    /// hyphen; the final label is at least two characters and not all
    /// digits.
    pub fn parse(raw: &str) -> LifecycleResult<Self> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            return Err(invalid(raw, "domain is empty"));
        }
        if value.len() > MAX_DOMAIN_LEN {
            return Err(invalid(raw, "domain exceeds 253 characters"));
        }

        let labels: Vec<&str> = value.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid(raw, "domain must contain at least two labels"));
        }

        for label in &labels {
            if label.is_empty() {
                return Err(invalid(raw, "empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(invalid(raw, "label exceeds 63 characters"));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(invalid(raw, "label starts or ends with a hyphen"));
            }
            if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
                return Err(invalid(raw, "label contains an invalid character"));
            }
        }

        // TLD constraints rule out IP-address lookalikes and truncated
        // domains like `example.c`.
        let tld = labels[labels.len() - 1];
        if tld.chars().count() < 2 {
            return Err(invalid(raw, "top-level label is too short"));
        }
        if tld.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(raw, "top-level label is numeric"));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn invalid(raw: &str, reason: &str) -> LifecycleError {
    LifecycleError::Validation {
        message: format!("invalid domain '{raw}': {reason}"),
    }
}
