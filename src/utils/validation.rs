//! Input validation utilities

use regex::Regex;
use once_cell::sync::Lazy;

/// Regex for validating certificate names: dot-separated RFC 1123 labels,
/// with underscores tolerated
static CERTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9_])?(\.[a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9_])?)*$",
    )
    .unwrap()
});

/// Regex for validating group names
static GROUP_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap()
});

/// Puppet environment names are lowercase identifiers
static ENVIRONMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_]+$").unwrap()
});

/// Validate a certificate name
pub fn validate_certname(certname: &str) -> bool {
    !certname.is_empty() && certname.len() <= 253 && CERTNAME_REGEX.is_match(certname)
}

/// Validate a group name
pub fn validate_group_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 100 && GROUP_NAME_REGEX.is_match(name)
}

/// Validate an environment name
pub fn validate_environment_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 255 && ENVIRONMENT_REGEX.is_match(name)
}

/// Validate a fact path
pub fn validate_fact_path(path: &str) -> bool {
    if path.is_empty() || path.len() > 255 {
        return false;
    }

    // Fact paths are dot-separated identifiers (list indices are plain digits)
    path.split('.').all(|part| {
        !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    })
}
