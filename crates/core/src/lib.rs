//! Core utilities for the SOS push tooling
//!
//! This crate provides shared functionality used by the responder crate and
//! the command-line tools:
//!
//! - **Error handling**: Errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration with validation
//!
//! # Example
//!
//! ```rust,no_run
//! use sos_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("fallback title: {}", config.schema.notification.fallback_title);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use error::{Error, ErrorCode, Result, ResultExt};
