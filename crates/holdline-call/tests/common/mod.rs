use async_trait::async_trait;
use holdline_call::{CallManager, CallSettings};
use holdline_provider::{Ingress, ProviderError, TelephonyProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Records provider interactions instead of performing them.
#[derive(Debug, Default)]
pub struct MockProvider {
    pub placed: Mutex<Vec<PlacedCall>>,
    pub completed: Mutex<Vec<String>>,
    pub fail_placement: AtomicBool,
}

#[derive(Debug, Clone)]
pub struct PlacedCall {
    pub sid: String,
    pub to: String,
    pub voice_url: String,
}

impl MockProvider {
    pub fn placed_count(&self) -> usize {
        self.placed.lock().unwrap().len()
    }

    pub fn completed_sids(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn last_placed(&self) -> Option<PlacedCall> {
        self.placed.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TelephonyProvider for MockProvider {
    async fn place_call(
        &self,
        _from: &str,
        to: &str,
        voice_url: &str,
    ) -> Result<String, ProviderError> {
        if self.fail_placement.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                status: 400,
                body: "placement rejected".to_string(),
            });
        }
        let sid = format!("CA{}", Uuid::new_v4().simple());
        self.placed.lock().unwrap().push(PlacedCall {
            sid: sid.clone(),
            to: to.to_string(),
            voice_url: voice_url.to_string(),
        });
        Ok(sid)
    }

    async fn complete_call(&self, call_sid: &str) -> Result<(), ProviderError> {
        self.completed.lock().unwrap().push(call_sid.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub manager: Arc<CallManager>,
    pub provider: Arc<MockProvider>,
}

pub fn settings() -> CallSettings {
    CallSettings {
        from_number: "+15550001111".to_string(),
        target_number: "+15552223333".to_string(),
        transfer_number: "+15554445555".to_string(),
        ..CallSettings::default()
    }
}

pub fn harness(settings: CallSettings) -> Harness {
    let provider = Arc::new(MockProvider::default());
    let manager = Arc::new(CallManager::new(
        settings,
        provider.clone(),
        Arc::new(holdline_provider::StaticIngress::new("https://hooks.test")),
    ));
    Harness { manager, provider }
}

/// Starts serving and places the initial call, returning its sid.
pub async fn serving_harness(settings: CallSettings) -> (Harness, String) {
    let h = harness(settings);
    h.manager.start_serving().await.unwrap();
    let sid = h.manager.place_call().await.unwrap();
    (h, sid)
}
