//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Log store (bounded, shared error histories)
//! - Rate limiter (decides which errors reach the system log)
//! - Error reporting utility (builds records from raised errors)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters and the host must implement. This keeps the application layer
//! independent from infrastructure details.

pub mod formatter;
pub mod limiter;
pub mod log_store;
pub mod metrics;
pub mod ports;
pub mod reporting;
