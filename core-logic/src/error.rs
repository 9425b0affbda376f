//! # Core Error Types
//!
//! Typed errors for configuration values, wallet key material and wallet
//! file decryption. Application code wraps them in `anyhow` with context.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid URL for '{field}': '{url}'")]
    InvalidUrl { field: String, url: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Wallet and key-material errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("Decryption failed for wallet at '{path}': {reason}")]
    DecryptionFailed { path: String, reason: String },

    #[error("Wallet not found at index {index} (total wallets: {total})")]
    NotFound { index: usize, total: usize },

    #[error("Invalid private key format: expected hex string")]
    InvalidKeyFormat,

    #[error("Private key too short: expected 64 hex chars, got {length}")]
    InvalidKeyLength { length: usize },

    #[error("Environment variable '{key}' is not set")]
    MissingEnv { key: String },
}

/// Security-related errors
#[derive(Error, Debug, Clone)]
pub enum SecurityError {
    #[error("Password required but not provided")]
    PasswordRequired,

    #[error("Encryption/decryption failed: {reason}")]
    CryptographyFailed { reason: String },

    #[error("Invalid hex in field '{field}'")]
    InvalidHex { field: String },
}
