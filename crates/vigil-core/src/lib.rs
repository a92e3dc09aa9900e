//! # vigil-core
//!
//! Shared foundation for the Vigil analysis engine.
//!
//! - `config`: TOML configuration with layered resolution
//! - `errors`: one `thiserror` enum per subsystem, plus error codes
//! - `events`: engine event handler trait and synchronous dispatcher
//! - `traits`: cooperative cancellation (`RunToken`, `DependentToken`)
//! - `tracing`: subscriber setup and structured span field names
//! - `types`: collection aliases

pub mod config;
pub mod errors;
pub mod events;
pub mod traits;
pub mod tracing;
pub mod types;
