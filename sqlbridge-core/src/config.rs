//! Bridge configuration.
//!
//! Loaded from JSON; every field has a default so `{}` is a valid document.

use serde::{Deserialize, Serialize};

/// Native `SQLITE_OPEN_READONLY`.
pub const OPEN_READONLY: i32 = 0x0000_0001;
/// Native `SQLITE_OPEN_READWRITE`.
pub const OPEN_READWRITE: i32 = 0x0000_0002;
/// Native `SQLITE_OPEN_CREATE`.
pub const OPEN_CREATE: i32 = 0x0000_0004;

/// How databases are opened when the caller does not pass flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// The image is never written back.
    ReadOnly,
    /// The image must already exist.
    ReadWrite,
    /// A missing image yields a fresh database.
    #[default]
    ReadWriteCreate,
}

impl OpenMode {
    /// Native open flags for this mode.
    #[must_use]
    pub const fn flags(self) -> i32 {
        match self {
            Self::ReadOnly => OPEN_READONLY,
            Self::ReadWrite => OPEN_READWRITE,
            Self::ReadWriteCreate => OPEN_READWRITE | OPEN_CREATE,
        }
    }

    /// Interprets native open flags. Bits other than the access bits are
    /// ignored.
    #[must_use]
    pub const fn from_flags(flags: i32) -> Self {
        if flags & OPEN_READWRITE == 0 {
            Self::ReadOnly
        } else if flags & OPEN_CREATE == 0 {
            Self::ReadWrite
        } else {
            Self::ReadWriteCreate
        }
    }

    /// `true` for [`OpenMode::ReadOnly`].
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

/// Error loading a configuration document.
#[derive(Debug, thiserror::Error)]
#[error("invalid bridge configuration: {0}")]
pub struct ConfigError(#[from] serde_json::Error);

/// Settings shared by the host provider and the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Mode used by [`Provider::open`](crate::Provider::open).
    pub open_mode: OpenMode,
    /// Write changed images back to storage on close.
    pub flush_on_close: bool,
    /// Busy timeout applied to every connection right after it opens.
    pub busy_timeout_ms: Option<u32>,
    /// Read back the schema of every loaded image so a corrupt file fails
    /// at open.
    pub verify_images: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            open_mode: OpenMode::default(),
            flush_on_close: true,
            busy_timeout_ms: None,
            verify_images: true,
        }
    }
}

impl BridgeConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(BridgeConfig::from_json("{}").expect("parse"), BridgeConfig::default());
    }

    #[test]
    fn fields_parse() {
        let config = BridgeConfig::from_json(
            r#"{"open_mode": "read_only", "flush_on_close": false, "busy_timeout_ms": 250}"#,
        )
        .expect("parse");
        assert_eq!(config.open_mode, OpenMode::ReadOnly);
        assert!(!config.flush_on_close);
        assert_eq!(config.busy_timeout_ms, Some(250));
        assert!(config.verify_images);
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(BridgeConfig::from_json(r#"{"flush": true}"#).is_err());
    }

    #[test]
    fn json_round_trip() {
        let config = BridgeConfig {
            busy_timeout_ms: Some(5),
            ..BridgeConfig::default()
        };
        let json = config.to_json().expect("render");
        assert_eq!(BridgeConfig::from_json(&json).expect("parse"), config);
    }

    #[test_case(OpenMode::ReadOnly)]
    #[test_case(OpenMode::ReadWrite)]
    #[test_case(OpenMode::ReadWriteCreate)]
    fn flags_map_back_to_mode(mode: OpenMode) {
        assert_eq!(OpenMode::from_flags(mode.flags()), mode);
    }
}
