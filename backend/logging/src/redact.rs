//! Log Redaction
//!
//! Scrubs API keys, bearer tokens, and phone numbers from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static TELEPHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\d[\d\-.\s]{8,14}\d").expect("telephone pattern is valid")
});
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9_\-]{16,})|(Bearer\s+[a-zA-Z0-9\-._~+/]+=*)|(AIza[0-9A-Za-z_\-]{20,})")
        .expect("api key pattern is valid")
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    TELEPHONE_RE
        .replace_all(&redacted, "[REDACTED_PHONE]")
        .into_owned()
}

/// Mask a sender address for logs, keeping the channel prefix and the last
/// four digits so requests from one sender can still be correlated.
///
/// `whatsapp:+14155551234` becomes `whatsapp:***1234`.
pub fn mask_sender(sender: &str) -> String {
    let (prefix, address) = match sender.rsplit_once(':') {
        Some((prefix, address)) => (Some(prefix), address),
        None => (None, sender),
    };
    let chars: Vec<char> = address.chars().collect();
    let tail: String = if chars.len() > 4 {
        chars[chars.len() - 4..].iter().collect()
    } else {
        String::new()
    };
    match prefix {
        Some(prefix) => format!("{prefix}:***{tail}"),
        None => format!("***{tail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_phone_and_bearer() {
        let raw = "Sending to +1-555-123-4567 with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("+1-555-123-4567"));
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(clean.contains("[REDACTED_PHONE]"));
        assert!(clean.contains("[REDACTED_TOKEN]"));
    }

    #[test]
    fn redacts_whatsapp_address() {
        let clean = redact_sensitive_data("from whatsapp:+14155551234 ok");
        assert_eq!(clean, "from whatsapp:[REDACTED_PHONE] ok");
    }

    #[test]
    fn masks_sender_keeps_prefix_and_tail() {
        assert_eq!(mask_sender("whatsapp:+14155551234"), "whatsapp:***1234");
        assert_eq!(mask_sender("+14155551234"), "***1234");
        assert_eq!(mask_sender("abc"), "***");
    }
}
