//! Kubernetes resource-name rules and field-selector construction.
//!
//! Workflow names are DNS-1123 subdomains. A name that satisfies the rule can
//! be placed verbatim on the right-hand side of a `metadata.name=` selector,
//! since none of the selector metacharacters (`,`, `=`, `!`, `\`) are allowed.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Maximum length of a DNS-1123 subdomain.
pub const MAX_RESOURCE_NAME_LEN: usize = 253;

static DNS1123_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").expect("static DNS-1123 pattern compiles")
});

/// Raised when a name cannot be used as a resource identity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{name}' is not a valid resource name: {reason}")]
pub struct InvalidResourceName {
    pub name: String,
    pub reason: &'static str,
}

/// Returns true when `name` is a valid DNS-1123 subdomain.
pub fn is_valid_resource_name(name: &str) -> bool {
    check_resource_name(name).is_ok()
}

/// Builds the `metadata.name=<name>` field selector for a single resource.
pub fn field_selector_for(name: &str) -> Result<String, InvalidResourceName> {
    check_resource_name(name)?;
    Ok(format!("metadata.name={}", name))
}

fn check_resource_name(name: &str) -> Result<(), InvalidResourceName> {
    let reason = if name.is_empty() {
        "name must not be empty"
    } else if name.len() > MAX_RESOURCE_NAME_LEN {
        "name must be at most 253 characters"
    } else if !DNS1123_SUBDOMAIN.is_match(name) {
        "name must consist of lowercase alphanumerics, '-' or '.', and start and end with an alphanumeric"
    } else {
        return Ok(());
    };
    Err(InvalidResourceName {
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_server_generated_names() {
        for name in ["hello-word-x7k2p", "dag-examplezq9ds", "retry-backoff4hm2t", "a", "a.b-c"] {
            assert!(is_valid_resource_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_selector_metacharacters_and_case() {
        for name in ["", "Step-1", "a,b", "a=b", "a!b", "-lead", "trail-", "a b", "a\\b"] {
            assert!(!is_valid_resource_name(name), "{name:?} should be rejected");
        }
        let too_long = "a".repeat(MAX_RESOURCE_NAME_LEN + 1);
        assert!(!is_valid_resource_name(&too_long));
    }

    #[test]
    fn field_selector_uses_name_verbatim() {
        assert_eq!(field_selector_for("dag-example8dq4s").unwrap(), "metadata.name=dag-example8dq4s");
        let err = field_selector_for("Bad,Name").unwrap_err();
        assert_eq!(err.name, "Bad,Name");
    }
}
