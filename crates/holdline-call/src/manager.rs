//! Call lifecycle management: serving setup, call placement, status, and
//! teardown.

use crate::error::CallError;
use crate::state::{CallShared, CallStatus, LifecycleState};
use chrono::Utc;
use holdline_provider::{Ingress, TelephonyProvider};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info};

/// Static configuration for one automation run.
#[derive(Debug, Clone)]
pub struct CallSettings {
    /// Label identifying the automation flavor in status output.
    pub caller: String,
    /// Address the webhook listener binds to; port 0 picks a free port.
    pub bind_addr: SocketAddr,
    /// Number calls originate from.
    pub from_number: String,
    /// The phone tree being navigated.
    pub target_number: String,
    /// Human operator the call is handed to once the hold queue is reached.
    pub transfer_number: String,
    /// Phrase that signals the hold queue.
    pub keyword: String,
    /// Phrases that mean the remote side gave up on us; any of them triggers
    /// a redial. Lowercase.
    pub redial_phrases: Vec<String>,
    /// Digits pressed when the phone-tree menu is reached.
    pub menu_digits: String,
    /// How long to wait in the keyword phase before giving up and redialing.
    pub keyword_timeout: Duration,
    /// Recognition language passed to the provider.
    pub language: String,
    /// Whether the provider should mask profanity in transcripts.
    pub profanity_filter: bool,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            caller: "holdline".to_string(),
            bind_addr: ([127, 0, 0, 1], 0).into(),
            from_number: String::new(),
            target_number: String::new(),
            transfer_number: String::new(),
            keyword: "banana".to_string(),
            redial_phrases: vec!["goodbye".to_string(), "please call again".to_string()],
            menu_digits: "3 1 0".to_string(),
            keyword_timeout: Duration::from_secs(120),
            language: "en-US".to_string(),
            profanity_filter: false,
        }
    }
}

/// Owns the one outbound call attempt: its identity, callback address,
/// timestamps, terminal status, and the navigation state machine that
/// steers it (see the `machine` module).
///
/// Provider-agnostic: talks to the outside world only through the
/// [`TelephonyProvider`] and [`Ingress`] seams.
pub struct CallManager {
    pub(crate) settings: CallSettings,
    pub(crate) provider: Arc<dyn TelephonyProvider>,
    ingress: Arc<dyn Ingress>,
    pub(crate) shared: Mutex<CallShared>,
    listener: Mutex<Option<TcpListener>>,
    done: Notify,
}

impl CallManager {
    pub fn new(
        settings: CallSettings,
        provider: Arc<dyn TelephonyProvider>,
        ingress: Arc<dyn Ingress>,
    ) -> Self {
        Self {
            settings,
            provider,
            ingress,
            shared: Mutex::new(CallShared::default()),
            listener: Mutex::new(None),
            done: Notify::new(),
        }
    }

    pub fn settings(&self) -> &CallSettings {
        &self.settings
    }

    pub(crate) fn shared(&self) -> MutexGuard<'_, CallShared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Binds the local webhook listener and exposes it publicly, returning
    /// the public base URL. Idempotent: once established, later calls return
    /// the same URL without touching the listener or the tunnel.
    pub async fn start_serving(&self) -> Result<String, CallError> {
        if let Some(url) = self.shared().public_url.clone() {
            return Ok(url);
        }

        let listener = TcpListener::bind(self.settings.bind_addr)
            .await
            .map_err(|e| CallError::Transport(format!("failed to bind listener: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| CallError::Transport(format!("failed to read local address: {e}")))?;
        info!(%local_addr, "webhook listener bound");

        let public_url = self
            .ingress
            .expose(local_addr.port())
            .await
            .map_err(|e| CallError::Transport(format!("failed to establish ingress: {e}")))?;
        info!(%public_url, "public ingress established");

        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(listener);
        self.shared().public_url = Some(public_url.clone());
        Ok(public_url)
    }

    /// Hands the bound listener to the HTTP layer. The listener exists only
    /// between a successful `start_serving` and the first take.
    pub fn take_listener(&self) -> Option<TcpListener> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Asks the provider to originate a call to the target number, pointing
    /// it at `{public_url}/voice` for instructions. On success the new call
    /// identifier and start timestamp are recorded and any previous end
    /// timestamp or error is cleared.
    pub async fn place_call(&self) -> Result<String, CallError> {
        let public_url = self.shared().public_url.clone().ok_or(CallError::NotServing)?;

        info!(target = %self.settings.target_number, "initiating call");
        let voice_url = format!("{public_url}/voice");
        match self
            .provider
            .place_call(&self.settings.from_number, &self.settings.target_number, &voice_url)
            .await
        {
            Ok(sid) => {
                info!(call_sid = %sid, "call initiated");
                let mut shared = self.shared();
                shared.call_sid = Some(sid.clone());
                shared.started_at = Some(Utc::now());
                shared.ended_at = None;
                shared.last_error = None;
                shared.failed = false;
                Ok(sid)
            }
            Err(e) => {
                error!("failed to initiate call: {e}");
                self.shared().last_error = Some(e.to_string());
                Err(CallError::CallPlacement(e))
            }
        }
    }

    /// Non-blocking snapshot of the whole call attempt.
    pub fn status(&self) -> CallStatus {
        let shared = self.shared();
        let state = shared.lifecycle();
        let duration_seconds = shared.started_at.map(|started| {
            let end = shared.ended_at.unwrap_or_else(Utc::now);
            (end - started).num_milliseconds() as f64 / 1000.0
        });

        CallStatus {
            caller: self.settings.caller.clone(),
            state,
            navigation: shared.nav_state,
            call_sid: shared.call_sid.clone(),
            target_number: self.settings.target_number.clone(),
            is_calling: state == LifecycleState::Calling,
            is_done: state == LifecycleState::Complete,
            is_failed: state == LifecycleState::Failed,
            started_at: shared.started_at,
            ended_at: shared.ended_at,
            duration_seconds,
            last_error: shared.last_error.clone(),
        }
    }

    /// Terminates any active call at the provider (best effort; failures are
    /// recorded, not propagated), stamps the end timestamp, and resets
    /// navigation. Idempotent.
    pub async fn stop(&self) {
        info!(caller = %self.settings.caller, "stopping");
        let call_sid = self.shared().call_sid.clone();
        if let Some(sid) = call_sid {
            match self.provider.complete_call(&sid).await {
                Ok(()) => info!(call_sid = %sid, "call terminated"),
                Err(e) => {
                    error!("error stopping call: {e}");
                    self.shared().last_error = Some(e.to_string());
                }
            }
        }

        let mut shared = self.shared();
        shared.ended_at.get_or_insert_with(Utc::now);
        shared.reset_navigation();
    }

    /// Stamps the end timestamp once the automation has handed the call to a
    /// human. Called by the state machine on reaching its terminal state.
    pub fn mark_complete(&self) {
        let mut shared = self.shared();
        shared.ended_at = Some(Utc::now());
        if let Some(started) = shared.started_at {
            let secs = (Utc::now() - started).num_seconds();
            info!(duration_seconds = secs, "call marked complete");
        }
        drop(shared);
        self.done.notify_waiters();
    }

    /// Records a terminal failure.
    pub fn mark_failed(&self, error: impl std::fmt::Display) {
        let mut shared = self.shared();
        shared.ended_at = Some(Utc::now());
        shared.last_error = Some(error.to_string());
        shared.failed = true;
        error!("call marked failed: {error}");
        drop(shared);
        self.done.notify_waiters();
    }

    /// Resolves once the automation reaches a terminal outcome (complete or
    /// failed). Used by the binary to shut the process down when done.
    pub async fn wait_until_done(&self) {
        loop {
            let notified = self.done.notified();
            let state = self.shared().lifecycle();
            if matches!(state, LifecycleState::Complete | LifecycleState::Failed) {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CallManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallManager")
            .field("settings", &self.settings)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}
