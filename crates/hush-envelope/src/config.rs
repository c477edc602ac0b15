//! Configuration for envelope sealing, verification and logging.

use std::fs;
use std::path::Path;

use hush_crypto::KeyType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered as TOML
    #[error("config serialize: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Hush configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Envelope sealing configuration
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    /// Header verification configuration
    #[serde(default)]
    pub verification: VerificationConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Envelope sealing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Parts at least this many bytes long are zlib-compressed
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: u64,
    /// zlib level (0-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Seal parts on the rayon pool
    #[serde(default = "default_true")]
    pub parallel_parts: bool,
    /// Algorithm token for newly generated identities
    #[serde(default = "default_key_type")]
    pub default_key_type: String,
}

/// Header verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Reject non-delegated headers without a server signature
    #[serde(default = "default_true")]
    pub require_server_signature: bool,
    /// Check part ciphertext checksums before decrypting
    #[serde(default = "default_true")]
    pub verify_part_checksums: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_compression_threshold() -> u64 {
    1024 // 1 KB
}

fn default_compression_level() -> u32 {
    6
}

fn default_true() -> bool {
    true
}

fn default_key_type() -> String {
    KeyType::Ed25519.token().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            compression_threshold: default_compression_threshold(),
            compression_level: default_compression_level(),
            parallel_parts: true,
            default_key_type: default_key_type(),
        }
    }
}

impl EnvelopeConfig {
    /// Parsed [`EnvelopeConfig::default_key_type`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown algorithm tokens.
    pub fn key_type(&self) -> Result<KeyType, ConfigError> {
        KeyType::from_token(&self.default_key_type)
            .map_err(|_| ConfigError::Invalid(format!("unknown key type: {}", self.default_key_type)))
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            require_server_signature: true,
            verify_part_checksums: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or validated.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.envelope.compression_level > 9 {
            return Err(ConfigError::Invalid(format!(
                "compression level must be 0-9, got {}",
                self.envelope.compression_level
            )));
        }

        self.envelope.key_type()?;

        // Same directive syntax init_logging accepts
        crate::logging::parse_filter(&self.logging.level)?;

        Ok(())
    }
}
