//! Service identity and debug mode.

/// Environment variable compared against the configured debug key.
pub const DEBUG_KEY_ENV: &str = "DEBUG_KEY";

/// Who this process is; also the logging prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name_id: String,
    pub title: String,
    pub description: String,
    pub version: String,
}

impl Identity {
    pub fn new(
        name_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name_id: name_id.into(),
            title: title.into(),
            description: description.into(),
            version: String::new(),
        }
    }
}

/// Debug mode is on when the environment value equals the configured key.
///
/// An unset variable reads as empty, so an empty key enables debug mode.
pub fn debug_enabled(env_value: Option<&str>, debug_key: &str) -> bool {
    env_value.unwrap_or("") == debug_key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_enabled() {
        assert!(debug_enabled(Some("k"), "k"));
        assert!(!debug_enabled(Some("other"), "k"));
        assert!(!debug_enabled(None, "k"));
        assert!(debug_enabled(Some(""), ""));
    }

    #[test]
    fn test_unset_variable_matches_empty_key() {
        assert!(debug_enabled(None, ""));
        assert!(!debug_enabled(Some("k"), ""));
    }
}
