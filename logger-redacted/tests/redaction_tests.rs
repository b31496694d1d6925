/// Redaction of the values StudyDesk writes to its logs

#[cfg(test)]
mod tests {
    use logger_redacted::{hash_value, LoggerConfig, PiiRedactor};
    use serde_json::json;

    #[test]
    fn test_config_drives_redaction() {
        let config: LoggerConfig = serde_json::from_value(json!({
            "log_level": "debug",
            "redaction_enabled": false
        }))
        .unwrap();
        assert_eq!(config.log_level, "debug");

        let redactor = PiiRedactor::new(config.redaction());
        assert!(!redactor.is_enabled());
        assert_eq!(redactor.redact_email("pi@example.org"), "pi@example.org");
    }

    #[test]
    fn test_duplicate_attempt_log_line() {
        let redactor = PiiRedactor::new(LoggerConfig::default().redaction());
        let key = redactor.redact_key_value(r#"["HN","7"]"#);
        assert_eq!(key, format!("KEY[{}]", hash_value(r#"["HN","7"]"#)));

        let payload = json!({"hospital_code": "HN", "patient_number": 7, "notes": "call 555-123-4567"});
        let redacted = redactor.redact_payload(&payload, &["hospital_code", "patient_number"]);
        let text = redacted.to_string();
        assert!(!text.contains("\"HN\""));
        assert!(!text.contains("555-123-4567"));
    }

    #[test]
    fn test_hash_is_short() {
        // 8 bytes encode to 12 base64 characters
        assert_eq!(hash_value("anything").len(), 12);
    }
}
