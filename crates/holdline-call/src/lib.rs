//! Call lifecycle and IVR navigation for the holdline automation.
//!
//! One [`CallManager`] owns one outbound call attempt end to end: it binds
//! the local webhook listener and exposes it publicly, asks the telephony
//! provider to originate the call, and then steers the call through the
//! remote phone tree from the transcripts the provider posts back. The
//! navigation policy lives in the `machine` module; the lifecycle surface
//! (start/stop/status) in `manager`.
//!
//! Exactly one call is tracked at a time. All shared call state sits behind
//! a single mutex, which makes concurrent webhook deliveries, timer fires,
//! and background redials safe to interleave.

pub mod error;
mod machine;
pub mod manager;
pub mod state;
mod timer;

pub use error::CallError;
pub use manager::{CallManager, CallSettings};
pub use state::{CallStatus, GatherConfig, LifecycleState, NavState};
