//! Domain layer - pure types and logic with no dependency on the host.
//!
//! This layer contains the core concepts of error reporting:
//! - Printable formatting of untrusted values
//! - Exception information and error records
//! - The leaky bucket rate limiting policy
//! - Utility properties
//!
//! All types in this layer are pure and easily testable.

pub mod exception;
pub mod policy;
pub mod printable;
pub mod properties;
pub mod record;
