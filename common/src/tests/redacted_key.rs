// Unit tests for credential redaction.

use crate::RedactedKey;

/// **VALUE**: Verifies that Debug output never contains the credential.
///
/// **WHY THIS MATTERS**: Connection errors are logged with their context;
/// if a verify key leaked through a stray `{:?}`, it would end up in log
/// files.
///
/// **BUG THIS CATCHES**: A derived Debug impl replacing the manual one.
#[test]
fn given_key_when_debug_formatted_then_value_is_redacted() {
    let key = RedactedKey::new("super-secret-verify-key");
    let debug = format!("{key:?}");
    let display = format!("{key}");
    assert!(!debug.contains("super-secret"));
    assert!(!display.contains("super-secret"));
    assert!(debug.contains("REDACTED"));
}

/// **VALUE**: Verifies the value is still retrievable for transmission.
///
/// **WHY THIS MATTERS**: The connection address is built from the raw
/// credential; redaction must not destroy the value itself.
///
/// **BUG THIS CATCHES**: Redaction applied to storage rather than display.
#[test]
fn given_key_when_exposed_then_original_value_returned() {
    let key = RedactedKey::from("abc");
    assert_eq!(key.expose(), "abc");
    assert_eq!(key.len(), 3);
    assert!(!key.is_empty());
}
