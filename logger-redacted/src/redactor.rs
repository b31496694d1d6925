use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Option<Regex> =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").ok();
    static ref PHONE_REGEX: Option<Regex> =
        Regex::new(r"\b(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").ok();
    static ref IP_REGEX: Option<Regex> = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").ok();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ip_addresses: bool,
    /// Replace matches with a short hash so redacted values can still be
    /// correlated across log lines
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_emails: true,
            redact_phones: true,
            redact_ip_addresses: false,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Add a custom pattern; invalid patterns are ignored
    pub fn with_custom_pattern(mut self, pattern: &str, replacement: &str) -> Self {
        if let Ok(regex) = Regex::new(pattern) {
            self.custom_patterns.push((regex, replacement.to_string()));
        }
        self
    }
}

/// PII redactor for log messages and submission answers
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Redact free text
    pub fn redact(&self, text: &str) -> String {
        if !self.config.enabled {
            return text.to_string();
        }

        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.replace(&EMAIL_REGEX, &result, "EMAIL", mask_email);
        }

        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", |_| "(***) ***-****".to_string());
        }

        if self.config.redact_ip_addresses {
            result = self.replace(&IP_REGEX, &result, "IP", mask_ip);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Redact a single email address
    pub fn redact_email(&self, email: &str) -> String {
        if !self.config.enabled {
            return email.to_string();
        }
        if self.config.hash_for_correlation {
            format!("EMAIL[{}]", hash_value(email))
        } else {
            mask_email(email)
        }
    }

    /// Opaque form of a unique key value; equal inputs give equal outputs
    pub fn redact_key_value(&self, value: &str) -> String {
        if !self.config.enabled {
            return value.to_string();
        }
        format!("KEY[{}]", hash_value(value))
    }

    /// Copy of a submission payload with the answers of `fields` hashed and
    /// every other string answer passed through [`PiiRedactor::redact`]
    pub fn redact_payload(&self, payload: &Value, fields: &[&str]) -> Value {
        if !self.config.enabled {
            return payload.clone();
        }
        match payload {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(name, answer)| {
                        let redacted = if fields.contains(&name.as_str()) {
                            Value::String(self.redact_key_value(&answer.to_string()))
                        } else {
                            self.redact_value(answer)
                        };
                        (name.clone(), redacted)
                    })
                    .collect(),
            ),
            other => self.redact_value(other),
        }
    }

    fn redact_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.redact(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact_value(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.redact_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn replace(
        &self,
        regex: &Option<Regex>,
        text: &str,
        tag: &str,
        mask: impl Fn(&str) -> String,
    ) -> String {
        let Some(regex) = regex else {
            return text.to_string();
        };
        regex
            .replace_all(text, |caps: &regex::Captures| {
                let matched = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("{}[{}]", tag, hash_value(matched))
                } else {
                    mask(matched)
                }
            })
            .to_string()
    }
}

fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = |s: &str| s.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}***", first(local), first(domain))
        }
        None => "***@***".to_string(),
    }
}

fn mask_ip(ip: &str) -> String {
    let parts: Vec<&str> = ip.split('.').collect();
    match (parts.first(), parts.last()) {
        (Some(first), Some(last)) if parts.len() == 4 => format!("{}.***.***.{}", first, last),
        _ => "***.***.***.***".to_string(),
    }
}

/// Short SHA-256 correlation hash (first 8 bytes, base64)
pub fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    general_purpose::STANDARD.encode(digest.get(..8).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn masking() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking().redact("User john.doe@example.com logged in");
        assert!(redacted.contains("j***@e***"));
        assert!(!redacted.contains("john.doe"));
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = masking().redact("Call me at (555) 123-4567");
        assert!(redacted.contains("(***) ***-****"));
    }

    #[test]
    fn test_hashes_correlate() {
        let redactor = PiiRedactor::default();
        let a = redactor.redact("pi@example.org opened the study");
        let b = redactor.redact("pi@example.org closed the study");
        let tag = |s: &str| s.split_whitespace().next().map(str::to_string);
        assert_eq!(tag(&a), tag(&b));
        assert!(a.starts_with("EMAIL["));
    }

    #[test]
    fn test_key_values_are_hashed() {
        let redactor = PiiRedactor::default();
        let first = redactor.redact_key_value("0042");
        assert_eq!(first, redactor.redact_key_value("0042"));
        assert_ne!(first, redactor.redact_key_value("0043"));
        assert!(!first.contains("0042"));
    }

    #[test]
    fn test_redact_payload() {
        let redactor = PiiRedactor::default();
        let payload = json!({
            "mrn": "0042",
            "contact": "patient@example.org",
            "age": 61
        });
        let redacted = redactor.redact_payload(&payload, &["mrn"]);
        assert!(redacted["mrn"].as_str().unwrap().starts_with("KEY["));
        assert!(redacted["contact"].as_str().unwrap().starts_with("EMAIL["));
        assert_eq!(redacted["age"], json!(61));
    }

    #[test]
    fn test_disabled_passes_through() {
        let redactor = PiiRedactor::new(RedactionConfig::disabled());
        assert_eq!(redactor.redact("a@b.org"), "a@b.org");
        assert_eq!(redactor.redact_key_value("0042"), "0042");
    }

    #[test]
    fn test_custom_pattern() {
        let redactor = PiiRedactor::new(
            RedactionConfig::default().with_custom_pattern(r"\bMRN\d+", "MRN[REDACTED]"),
        );
        assert_eq!(redactor.redact("record MRN123456"), "record MRN[REDACTED]");
    }
}
