//! Provider seams for the holdline automation.
//!
//! Everything that touches the outside world lives here behind narrow
//! interfaces: the telephony provider that places and terminates calls
//! ([`TelephonyProvider`], implemented for Twilio), the tunnel that makes the
//! local webhook listener publicly reachable ([`Ingress`]), and the
//! call-control document format the provider is steered with
//! ([`VoiceResponse`]). The lifecycle manager and state machine depend on
//! these traits only, never on a concrete SDK or transport.

pub mod error;
pub mod ingress;
pub mod twilio;
pub mod twiml;

pub use error::ProviderError;
pub use ingress::{Ingress, NgrokIngress, StaticIngress};
pub use twilio::{TelephonyProvider, TwilioConfig, TwilioProvider};
pub use twiml::{digits_with_pauses, GatherSpec, VoiceResponse};
