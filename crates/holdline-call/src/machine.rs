//! The IVR navigation policy: turns each transcribed prompt into a state
//! transition plus the call-control document answering the webhook.
//!
//! All decisions happen inside one critical section on the shared call
//! record; provider I/O and anything long-running (redial, timeout grace
//! delay) runs on spawned tasks that re-acquire the lock and verify they are
//! still current before acting.

use crate::manager::CallManager;
use crate::state::NavState;
use crate::timer::KeywordTimer;
use holdline_provider::{digits_with_pauses, GatherSpec, VoiceResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inter-digit pause when playing back a verification code.
const CODE_DIGIT_PAUSE_SECS: f64 = 0.5;

/// Inter-digit pause when pressing through the phone-tree menu. The remote
/// tree reacts slowly; rushing it swallows digits.
const MENU_DIGIT_PAUSE_SECS: f64 = 5.0;

/// Delay between terminating a timed-out call and placing the fresh one.
const REDIAL_GRACE: Duration = Duration::from_secs(2);

/// Deferred work decided under the lock but executed after it is released.
enum FollowUp {
    None,
    Redial,
    ScheduleTimer { call_sid: String },
    Complete,
}

impl CallManager {
    /// Builds the document served from `/voice`: gather speech with the
    /// active state's recognition tuning, posting the transcript to
    /// `/process_speech`.
    pub fn voice_document(&self) -> VoiceResponse {
        let state = self.shared().nav_state;
        let config = state.gather_config();
        debug!(state = state.name(), model = config.speech_model, "voice endpoint hit");

        VoiceResponse::new().gather(GatherSpec {
            action: "/process_speech".to_string(),
            timeout_secs: config.timeout_secs,
            speech_model: config.speech_model.to_string(),
            hints: config.hints.to_string(),
            language: self.settings.language.clone(),
            profanity_filter: self.settings.profanity_filter,
        })
    }

    /// Handles one transcribed prompt and returns the document answering it.
    ///
    /// The confidence score is logged only; the transition logic never uses
    /// it.
    pub fn process_speech(
        self: &Arc<Self>,
        transcript: &str,
        call_sid: &str,
        confidence: Option<f64>,
    ) -> VoiceResponse {
        let speech = holdline_speech::normalize(transcript);
        info!(%transcript, ?confidence, "speech transcribed");

        let mut follow_up = FollowUp::None;
        let response = {
            let mut shared = self.shared();
            debug!(state = shared.nav_state.name(), "processing transcript");

            // The remote system re-announcing a verification code means the
            // previous code attempt did not go through. Return to code entry
            // from wherever we are, before any per-state logic runs. Leaving
            // the keyword phase also cancels its timer.
            if speech.contains("verification code")
                && shared.nav_state != NavState::AwaitingVerificationCode
            {
                info!("verification code prompt heard again, returning to code entry");
                shared.cancel_timer();
                shared.nav_state = NavState::AwaitingVerificationCode;
            }

            if holdline_speech::contains_any(&speech, &self.settings.redial_phrases) {
                // Highest priority: the remote side is hanging up on us.
                info!("redial phrase heard, abandoning call and retrying");
                shared.reset_navigation();
                follow_up = FollowUp::Redial;
                VoiceResponse::new().hangup()
            } else if shared.nav_state == NavState::AwaitingKeyword
                && holdline_speech::contains_any(
                    &speech,
                    std::slice::from_ref(&self.settings.keyword),
                )
            {
                info!(keyword = %self.settings.keyword, "keyword heard, transferring call");
                shared.cancel_timer();
                shared.nav_state = NavState::Complete;
                follow_up = FollowUp::Complete;
                VoiceResponse::new().dial(self.settings.transfer_number.clone())
            } else if shared.nav_state == NavState::AwaitingPhoneTree {
                // Any prompt at all is taken as the menu being read out.
                let digits = self.settings.menu_digits.clone();
                info!(%digits, "phone tree prompt detected, sending menu digits");
                shared.nav_state = NavState::AwaitingKeyword;
                follow_up = FollowUp::ScheduleTimer {
                    call_sid: call_sid.to_string(),
                };
                VoiceResponse::new()
                    .pause(1)
                    .play_digits(digits_with_pauses(&digits, MENU_DIGIT_PAUSE_SECS))
                    .redirect("/voice")
            } else if shared.nav_state == NavState::AwaitingVerificationCode {
                match holdline_speech::extract_code(transcript) {
                    Some(code) => {
                        info!(%code, "verification code detected, sending digits");
                        shared.call_sid = Some(call_sid.to_string());
                        shared.nav_state = NavState::AwaitingPhoneTree;
                        VoiceResponse::new()
                            .pause(1)
                            .play_digits(digits_with_pauses(&code, CODE_DIGIT_PAUSE_SECS))
                            .redirect("/voice")
                    }
                    None => {
                        debug!("no code heard yet, continuing to gather");
                        VoiceResponse::new().pause(2).redirect("/voice")
                    }
                }
            } else if shared.nav_state.is_terminal() {
                debug!("transcript after completion, hanging up");
                VoiceResponse::new().hangup()
            } else {
                debug!("no trigger matched, continuing to gather");
                VoiceResponse::new().pause(1).redirect("/voice")
            }
        };

        match follow_up {
            FollowUp::None => {}
            FollowUp::Redial => {
                let manager = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(e) = manager.place_call().await {
                        warn!("redial after redial phrase failed: {e}");
                    }
                });
            }
            FollowUp::ScheduleTimer { call_sid } => self.schedule_keyword_timer(call_sid),
            FollowUp::Complete => self.mark_complete(),
        }

        response
    }

    /// Arms the keyword-wait timer. Any previously pending timer is
    /// cancelled first; the new one carries a fresh generation so stale
    /// fires can be told apart.
    fn schedule_keyword_timer(self: &Arc<Self>, call_sid: String) {
        let timeout = self.settings.keyword_timeout;
        let mut shared = self.shared();
        shared.cancel_timer();
        shared.timer_generation += 1;
        let generation = shared.timer_generation;

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            manager.keyword_timeout_fired(generation, call_sid).await;
        });
        shared.timer = Some(KeywordTimer::new(generation, handle.abort_handle()));
        debug!(generation, timeout_secs = timeout.as_secs(), "keyword timer armed");
    }

    /// Timeout path: the keyword never arrived. Terminates the stalled call
    /// (best effort), waits out a short grace period, and places a fresh
    /// one. A fire that lost the race against cancellation, or that belongs
    /// to a previous call, is a no-op.
    async fn keyword_timeout_fired(self: Arc<Self>, generation: u64, call_sid: String) {
        {
            let mut shared = self.shared();
            let current = shared
                .timer
                .as_ref()
                .is_some_and(|t| t.generation == generation);
            if !current || shared.call_sid.as_deref() != Some(call_sid.as_str()) {
                debug!(generation, "stale keyword timer fire ignored");
                return;
            }
            shared.timer = None;
            warn!(
                timeout_secs = self.settings.keyword_timeout.as_secs(),
                "keyword timeout, hanging up and retrying"
            );
            shared.reset_navigation();
        }

        if let Err(e) = self.provider.complete_call(&call_sid).await {
            warn!("error hanging up timed-out call: {e}");
            self.shared().last_error = Some(e.to_string());
        }

        tokio::time::sleep(REDIAL_GRACE).await;
        if let Err(e) = self.place_call().await {
            warn!("redial after keyword timeout failed: {e}");
        }
    }
}
