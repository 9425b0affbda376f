//! # Core Logic - Shared Utilities for the Harness Workspace
//!
//! This crate provides the plumbing shared by every chain crate in the
//! workspace: typed errors, logger setup, wallet key loading and the
//! staggered worker launcher.
//!
//! ## Modules
//!
//! - [`config`] - Wallet source configuration
//! - [`error`] - Typed error handling with thiserror
//! - [`security`] - Decryption of encrypted wallet files
//! - [`utils`] - Logger, wallet manager and worker runner

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod error;
pub mod security;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::WalletSource;
pub use error::{ConfigError, SecurityError, WalletError};
pub use security::SecurityUtils;

// Utils are pub(crate) - only export specific public utilities
pub use utils::logger::{setup_logger, RESULT_TARGET};
pub use utils::runner::{WorkerReport, WorkerRunner};
pub use utils::wallet_manager::{DecryptedWallet, WalletManager};
