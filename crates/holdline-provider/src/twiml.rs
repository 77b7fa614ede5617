//! Call-control document builder.
//!
//! The telephony provider steers an in-progress call from an XML document
//! (TwiML) returned by our webhook. Only the verbs this automation emits are
//! modeled: speech gathering, DTMF playback, pauses, dial-out transfer,
//! redirect, and hang-up.

use tracing::debug;

/// Seconds of inter-digit silence represented by a single `w` marker in a
/// `<Play digits>` string.
const PAUSE_MARKER_SECS: f64 = 0.5;

/// Speech-gathering parameters for a `<Gather input="speech">` verb.
#[derive(Debug, Clone, PartialEq)]
pub struct GatherSpec {
    /// Webhook path the transcript is posted to.
    pub action: String,
    /// Seconds the provider waits for inbound speech to begin.
    pub timeout_secs: u32,
    /// Recognition model hint.
    pub speech_model: String,
    /// Comma-separated vocabulary hints.
    pub hints: String,
    /// Recognition language, e.g. "en-US".
    pub language: String,
    /// Whether the provider should mask profanity in transcripts.
    pub profanity_filter: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Verb {
    Gather(GatherSpec),
    PlayDigits(String),
    Pause(u32),
    Dial(String),
    Redirect(String),
    Hangup,
}

/// An ordered sequence of call-control verbs, rendered with [`to_xml`].
///
/// [`to_xml`]: VoiceResponse::to_xml
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts speech recognition, posting the transcript to `spec.action`.
    pub fn gather(mut self, spec: GatherSpec) -> Self {
        self.verbs.push(Verb::Gather(spec));
        self
    }

    /// Plays a DTMF digit string (may include `w` pause markers).
    pub fn play_digits(mut self, digits: impl Into<String>) -> Self {
        self.verbs.push(Verb::PlayDigits(digits.into()));
        self
    }

    /// Waits silently for the given number of seconds.
    pub fn pause(mut self, length_secs: u32) -> Self {
        self.verbs.push(Verb::Pause(length_secs));
        self
    }

    /// Bridges the call out to another number.
    pub fn dial(mut self, number: impl Into<String>) -> Self {
        self.verbs.push(Verb::Dial(number.into()));
        self
    }

    /// Tells the provider to fetch the next document from `url`.
    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect(url.into()));
        self
    }

    /// Ends the call.
    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    /// Renders the document as TwiML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for verb in &self.verbs {
            match verb {
                Verb::Gather(spec) => {
                    xml.push_str(&format!(
                        r#"<Gather input="speech" action="{}" timeout="{}" speechTimeout="auto" speechModel="{}" language="{}" profanityFilter="{}" hints="{}"/>"#,
                        escape(&spec.action),
                        spec.timeout_secs,
                        escape(&spec.speech_model),
                        escape(&spec.language),
                        spec.profanity_filter,
                        escape(&spec.hints),
                    ));
                }
                Verb::PlayDigits(digits) => {
                    xml.push_str(&format!(r#"<Play digits="{}"/>"#, escape(digits)));
                }
                Verb::Pause(secs) => {
                    xml.push_str(&format!(r#"<Pause length="{secs}"/>"#));
                }
                Verb::Dial(number) => {
                    xml.push_str(&format!("<Dial>{}</Dial>", escape(number)));
                }
                Verb::Redirect(url) => {
                    xml.push_str(&format!("<Redirect>{}</Redirect>", escape(url)));
                }
                Verb::Hangup => xml.push_str("<Hangup/>"),
            }
        }
        xml.push_str("</Response>");
        xml
    }

    /// True when the document ends the call rather than gathering more input.
    pub fn is_terminal(&self) -> bool {
        self.verbs
            .iter()
            .any(|v| matches!(v, Verb::Hangup | Verb::Dial(_)))
    }
}

/// Interleaves `w` pause markers between DTMF digits.
///
/// The provider interprets each `w` as half a second of silence, so a
/// requested pause is converted at one marker per 0.5 s, inserted between
/// every pair of digits and trailing after the last. Whitespace inside the
/// digit string is discarded first.
pub fn digits_with_pauses(digits: &str, pause_secs: f64) -> String {
    let digits: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
    let marker_count = (pause_secs / PAUSE_MARKER_SECS) as usize;
    let markers = "w".repeat(marker_count);

    let mut paced = digits
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(&markers);
    paced.push_str(&markers);
    debug!(original = %digits, %paced, "paced digit string");
    paced
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gather_spec() -> GatherSpec {
        GatherSpec {
            action: "/process_speech".to_string(),
            timeout_secs: 2,
            speech_model: "numbers_and_commands".to_string(),
            hints: "0,1,2,code".to_string(),
            language: "en-US".to_string(),
            profanity_filter: false,
        }
    }

    #[test]
    fn short_pause_pacing() {
        // 0.5s per marker: a 0.5s pause is one marker between digits and one
        // trailing.
        assert_eq!(digits_with_pauses("425", 0.5), "4w2w5w");
    }

    #[test]
    fn long_pause_pacing() {
        let paced = digits_with_pauses("3 1 0", 5.0);
        let markers = "w".repeat(10);
        assert_eq!(paced, format!("3{markers}1{markers}0{markers}"));
    }

    #[test]
    fn pacing_strips_whitespace_first() {
        assert_eq!(digits_with_pauses(" 4 2 ", 0.5), "4w2w");
    }

    #[test]
    fn gather_document() {
        let xml = VoiceResponse::new().gather(gather_spec()).to_xml();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#));
        assert!(xml.contains(r#"<Gather input="speech" action="/process_speech""#));
        assert!(xml.contains(r#"speechModel="numbers_and_commands""#));
        assert!(xml.contains(r#"profanityFilter="false""#));
        assert!(xml.ends_with("</Response>"));
    }

    #[test]
    fn play_and_redirect_document() {
        let xml = VoiceResponse::new()
            .pause(1)
            .play_digits("4w2w5w")
            .redirect("/voice")
            .to_xml();
        assert!(xml.contains(r#"<Pause length="1"/>"#));
        assert!(xml.contains(r#"<Play digits="4w2w5w"/>"#));
        assert!(xml.contains("<Redirect>/voice</Redirect>"));
    }

    #[test]
    fn dial_and_hangup_are_terminal() {
        assert!(VoiceResponse::new().dial("+15551234567").is_terminal());
        assert!(VoiceResponse::new().hangup().is_terminal());
        assert!(!VoiceResponse::new().pause(1).redirect("/voice").is_terminal());
    }

    #[test]
    fn attribute_values_are_escaped() {
        let xml = VoiceResponse::new()
            .redirect("https://example.com/voice?a=1&b=2")
            .to_xml();
        assert!(xml.contains("a=1&amp;b=2"));
    }
}
