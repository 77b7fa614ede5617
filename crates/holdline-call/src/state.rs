//! Navigation state, per-state recognition tuning, and the shared call
//! record everything else locks around.

use crate::timer::KeywordTimer;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where the automation believes it is in the remote phone tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    /// The remote system is expected to read out a verification code.
    #[default]
    AwaitingVerificationCode,
    /// The code went through; waiting for the phone-tree menu prompt.
    AwaitingPhoneTree,
    /// Menu digits sent; waiting for the phrase that signals the hold queue.
    AwaitingKeyword,
    /// Transferred to a human. Terminal.
    Complete,
}

impl NavState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NavState::Complete)
    }

    pub fn name(self) -> &'static str {
        match self {
            NavState::AwaitingVerificationCode => "awaiting_verification_code",
            NavState::AwaitingPhoneTree => "awaiting_phone_tree",
            NavState::AwaitingKeyword => "awaiting_keyword",
            NavState::Complete => "complete",
        }
    }

    /// Speech-recognition tuning for the next gather in this state, biasing
    /// the provider toward the vocabulary each phase is known to use.
    pub fn gather_config(self) -> &'static GatherConfig {
        match self {
            NavState::AwaitingPhoneTree => &GatherConfig {
                speech_model: "experimental_utterances",
                hints: "press,enter,option,menu",
                timeout_secs: 2,
            },
            NavState::AwaitingKeyword => &GatherConfig {
                speech_model: "experimental_utterances",
                hints: "banana,transfer,representative,agent",
                timeout_secs: 2,
            },
            // Terminal calls never gather again in practice; fall back to
            // the initial tuning like any unknown phase.
            NavState::AwaitingVerificationCode | NavState::Complete => &GatherConfig {
                speech_model: "numbers_and_commands",
                hints: "0,1,2,3,4,5,6,7,8,9,code,verification",
                timeout_secs: 2,
            },
        }
    }
}

/// Per-state tuning of the provider's speech recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherConfig {
    pub speech_model: &'static str,
    pub hints: &'static str,
    pub timeout_secs: u32,
}

/// Coarse lifecycle of the whole call attempt, derived for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Calling,
    Complete,
    Failed,
}

/// Snapshot returned by [`CallManager::status`].
///
/// [`CallManager::status`]: crate::CallManager::status
#[derive(Debug, Clone, Serialize)]
pub struct CallStatus {
    pub caller: String,
    pub state: LifecycleState,
    pub navigation: NavState,
    pub call_sid: Option<String>,
    pub target_number: String,
    pub is_calling: bool,
    pub is_done: bool,
    pub is_failed: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub last_error: Option<String>,
}

/// The single mutable record for the one call being tracked.
///
/// Every read and write goes through the manager's mutex; webhook handling,
/// timer fires, and background redials all serialize on it.
#[derive(Debug, Default)]
pub(crate) struct CallShared {
    pub nav_state: NavState,
    pub call_sid: Option<String>,
    pub public_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub failed: bool,
    pub timer: Option<KeywordTimer>,
    pub timer_generation: u64,
}

impl CallShared {
    /// Takes and aborts the pending keyword timer, if any. Firing and
    /// cancellation both have to take this slot under the lock, so only one
    /// of them can ever win.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Returns navigation to the initial state, dropping the call identifier
    /// and any pending timer. Timestamps and the last error are left alone.
    pub fn reset_navigation(&mut self) {
        self.cancel_timer();
        self.nav_state = NavState::AwaitingVerificationCode;
        self.call_sid = None;
    }

    pub fn lifecycle(&self) -> LifecycleState {
        if self.nav_state.is_terminal() {
            LifecycleState::Complete
        } else if self.failed {
            LifecycleState::Failed
        } else if self.call_sid.is_some() {
            LifecycleState::Calling
        } else {
            LifecycleState::Idle
        }
    }
}
