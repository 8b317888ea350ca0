use once_cell::sync::Lazy;
use regex::Regex;

use super::DEFAULT_CREDENTIAL_PREFIX;

/// Characters a key may carry after its prefix
const KEY_BODY: &str = r"[0-9A-Za-z_\-]+";

/// Anything shaped like a provider key under the default prefix
static DEFAULT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("{}{}", DEFAULT_CREDENTIAL_PREFIX, KEY_BODY)).unwrap());

const REDACTED: &str = "[REDACTED]";

/// Provider API key. Debug output is masked so the key cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// Raw key, for the transport only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short fingerprint safe for logs, e.g. `AIza…wxyz`
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();

        if chars.len() <= 8 {
            return "****".to_string();
        }

        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Replaces every token shaped like a default-prefix key in `text`
pub fn redact_credentials(text: &str) -> String {
    DEFAULT_PATTERN.replace_all(text, REDACTED).into_owned()
}

/// Masks keys that start with a configured prefix wherever they appear in free text
#[derive(Debug, Clone)]
pub struct CredentialRedactor {
    pattern: Regex,
}

impl Default for CredentialRedactor {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }
}

impl CredentialRedactor {
    /// An empty prefix falls back to the default one; it would match every word.
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Self::default();
        }

        match Regex::new(&format!("{}{}", regex::escape(prefix), KEY_BODY)) {
            Ok(pattern) => Self { pattern },
            Err(_) => Self::default(),
        }
    }

    pub fn redact(&self, text: &str) -> String {
        self.pattern.replace_all(text, REDACTED).into_owned()
    }
}
