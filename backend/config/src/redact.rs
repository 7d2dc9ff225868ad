//! Config redaction: produce safe-to-print config snapshots by masking secrets
//! and phone numbers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "authToken",
    "redisToken",
    "accountSid",
    "token",
    "secret",
    "password",
];

/// Phone numbers, with or without a channel prefix such as `whatsapp:`.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z]+:)?\+?[0-9]{10,15}$").expect("phone pattern is valid")
});

/// Redact a config JSON value, masking every sensitive field.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    let hint: String = s.chars().take(4).collect();
    if s.chars().count() > 4 {
        format!("{hint}***")
    } else {
        "***".to_string()
    }
}

fn redact_string(s: &str, key: &str) -> Value {
    if !s.is_empty() && (is_sensitive_key(key) || PHONE_PATTERN.is_match(s)) {
        return Value::String(mask(s));
    }
    Value::String(s.to_string())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_provider_secrets() {
        let v = json!({ "twilio": { "authToken": "abcdef123456", "accountSid": "AC999999" } });
        let redacted = redact(&v);
        assert_eq!(redacted["twilio"]["authToken"], "abcd***");
        assert_eq!(redacted["twilio"]["accountSid"], "AC99***");
    }

    #[test]
    fn masks_whatsapp_numbers() {
        let v = json!({ "delivery": { "fromNumber": "whatsapp:+14155238886" } });
        let redacted = redact(&v);
        let from = redacted["delivery"]["fromNumber"].as_str().unwrap();
        assert!(from.ends_with("***"));
        assert!(!from.contains("5238886"));
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({ "logging": { "level": "debug" }, "rateLimit": { "quota": 30 } });
        let redacted = redact(&v);
        assert_eq!(redacted["logging"]["level"], "debug");
        assert_eq!(redacted["rateLimit"]["quota"], 30);
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let v = json!({ "apiKey": "abc" });
        assert_eq!(redact(&v)["apiKey"], "***");
    }
}
