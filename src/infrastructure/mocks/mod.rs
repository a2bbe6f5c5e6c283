//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters and host
//! collaborators, enabling controlled testing of application logic.

pub mod clock;
pub mod layer;
pub mod request;
pub mod sink;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use request::{StubLogin, StubPrincipal, StubRequest};
pub use sink::{LoggedError, RecordingSink};
