//! Cache key generation utilities.

use unfurl_core::ports::KeyProvider;
use unfurl_core::{Error, Result};

/// Longest accepted generated-value token.
const MAX_TOKEN_LEN: usize = 128;

/// Prefixes identities with a fixed namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixKeyProvider {
    namespace: String,
}

impl PrefixKeyProvider {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl KeyProvider for PrefixKeyProvider {
    fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Check that a generated-value token is syntactically valid.
pub fn validate_token(token: &str) -> Result<()> {
    let valid = !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_key() {
        let keys = PrefixKeyProvider::new("frankerfacez:emote");
        assert_eq!(keys.namespace(), "frankerfacez:emote");
        assert_eq!(keys.key("297734"), "frankerfacez:emote:297734");
    }

    #[test]
    fn test_validate_token() {
        assert!(validate_token("tweet-1234567890").is_ok());
        assert!(validate_token("a.b_c:d").is_ok());
        assert!(validate_token("").is_err());
        assert!(validate_token("../etc/passwd").is_err());
        assert!(validate_token(&"x".repeat(129)).is_err());
    }
}
