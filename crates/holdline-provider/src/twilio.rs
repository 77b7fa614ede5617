//! Twilio REST implementation of the telephony seam.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

/// Credentials and endpoint for the Twilio REST API.
#[derive(Clone, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Override for tests or regional endpoints.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TwilioConfig {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: default_api_base(),
        }
    }
}

/// The narrow seam between the automation and whatever places real calls.
///
/// Only two operations exist: originating an outbound call pointed at our
/// webhook, and updating an in-progress call to terminated status. The
/// state machine and lifecycle manager depend on nothing else.
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Originates a call from `from` to `to`, instructing the provider to
    /// fetch call-control documents from `voice_url` once connected.
    /// Returns the provider-assigned call identifier.
    async fn place_call(&self, from: &str, to: &str, voice_url: &str)
        -> Result<String, ProviderError>;

    /// Terminates an in-progress call.
    async fn complete_call(&self, call_sid: &str) -> Result<(), ProviderError>;
}

#[derive(Debug)]
pub struct TwilioProvider {
    config: TwilioConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

impl TwilioProvider {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_base, self.config.account_sid
        )
    }

    fn call_url(&self, call_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.config.api_base, self.config.account_sid, call_sid
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Rejected { status, body })
    }
}

#[async_trait]
impl TelephonyProvider for TwilioProvider {
    async fn place_call(
        &self,
        from: &str,
        to: &str,
        voice_url: &str,
    ) -> Result<String, ProviderError> {
        debug!(%to, %voice_url, "requesting outbound call");
        let response = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", to), ("From", from), ("Url", voice_url)])
            .send()
            .await?;

        let call: CallResource = Self::check(response).await?.json().await?;
        Ok(call.sid)
    }

    async fn complete_call(&self, call_sid: &str) -> Result<(), ProviderError> {
        debug!(%call_sid, "requesting call termination");
        let response = self
            .http
            .post(self.call_url(call_sid))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_auth_token() {
        let config = TwilioConfig::new("AC123", "super-secret");
        let debug = format!("{config:?}");
        assert!(debug.contains("AC123"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn urls_follow_rest_layout() {
        let provider = TwilioProvider::new(TwilioConfig::new("AC123", "token"));
        assert_eq!(
            provider.calls_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls.json"
        );
        assert_eq!(
            provider.call_url("CA9"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls/CA9.json"
        );
    }
}
