//! # Alumtrack Common Library
//!
//! Shared code for the alumni tracer services including:
//! - Database bootstrap and domain models (alumni records, programs)
//! - Event types (AlumtrackEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - The common error type

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use db::models::{AlumniFields, AlumniRecord, Program};
pub use error::{Error, Result};
