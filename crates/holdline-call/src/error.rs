use holdline_provider::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallError {
    /// The local listener could not be bound or the public ingress could not
    /// be established. Fatal at startup, never retried.
    #[error("transport setup failed: {0}")]
    Transport(String),

    /// The provider rejected call origination. Recorded as the last error
    /// and surfaced to the caller; the manager stays usable for a retry.
    #[error("call placement failed: {0}")]
    CallPlacement(#[source] ProviderError),

    /// The provider rejected an in-call control update. Recorded and logged;
    /// the state machine keeps going.
    #[error("call control update failed: {0}")]
    CallControl(#[source] ProviderError),

    /// `place_call` was invoked before `start_serving` succeeded.
    #[error("serving not started; call start_serving first")]
    NotServing,
}
