//! # Soundwave Common Library
//!
//! Shared code for the Soundwave backend services including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Database schema, initialization, and shared models
//! - Password hashing and access token helpers
//! - Timestamp storage helpers

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
