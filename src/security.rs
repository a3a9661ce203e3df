use subtle::ConstantTimeEq;

/// Header carrying the admin API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing API keys and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Outcome of checking a request against the configured admin key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccess {
    /// No key configured: admin routes are off
    Disabled,
    Denied,
    Granted,
}

pub fn check_api_key(configured: Option<&str>, provided: Option<&str>) -> AdminAccess {
    match (configured.filter(|k| !k.is_empty()), provided) {
        (None, _) => AdminAccess::Disabled,
        (Some(expected), Some(provided)) if constant_time_compare(expected, provided.trim()) => {
            AdminAccess::Granted
        }
        _ => AdminAccess::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_check_api_key() {
        assert_eq!(check_api_key(None, Some("anything")), AdminAccess::Disabled);
        assert_eq!(check_api_key(Some(""), Some("")), AdminAccess::Disabled);
        assert_eq!(check_api_key(Some("k3y"), None), AdminAccess::Denied);
        assert_eq!(check_api_key(Some("k3y"), Some("nope")), AdminAccess::Denied);
        assert_eq!(check_api_key(Some("k3y"), Some("k3y")), AdminAccess::Granted);
        assert_eq!(check_api_key(Some("k3y"), Some(" k3y ")), AdminAccess::Granted);
    }
}
