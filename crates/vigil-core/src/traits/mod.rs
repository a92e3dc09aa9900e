//! Cross-cutting traits and primitives.

pub mod cancellation;

pub use cancellation::{Cancellable, CancelCause, DependentToken, RunToken, TokenHandle};
