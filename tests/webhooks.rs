//! Webhook signature verification tests

mod common;

use common::TEST_WEBHOOK_SECRET;
use subsync::payments::verify_webhook_signature;

fn secrets(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Get current Unix timestamp as a string (for webhook signature tests)
fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Get an old timestamp (for testing timestamp rejection)
fn old_timestamp() -> String {
    // 10 minutes ago - beyond the 5-minute tolerance
    (chrono::Utc::now().timestamp() - 600).to_string()
}

fn compute_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn signature_header(payload: &[u8], secret: &str) -> String {
    let timestamp = current_timestamp();
    let signature = compute_signature(payload, secret, &timestamp);
    format!("t={},v1={}", timestamp, signature)
}

#[test]
fn test_valid_signature() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let header = signature_header(payload, TEST_WEBHOOK_SECRET);

    let result = verify_webhook_signature(payload, &header, &secrets(&[TEST_WEBHOOK_SECRET]))
        .expect("Verification should not error");

    assert!(result, "Valid signature should be accepted");
}

#[test]
fn test_invalid_signature() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    // Signed with a secret we don't trust
    let header = signature_header(payload, "whsec_wrong_secret");

    let result = verify_webhook_signature(payload, &header, &secrets(&[TEST_WEBHOOK_SECRET]))
        .expect("Verification should not error");

    assert!(!result, "Invalid signature should be rejected");
}

#[test]
fn test_modified_payload() {
    let original = b"{\"type\":\"checkout.session.completed\"}";
    let modified = b"{\"type\":\"checkout.session.completed\",\"hacked\":true}";
    let header = signature_header(original, TEST_WEBHOOK_SECRET);

    let result = verify_webhook_signature(modified, &header, &secrets(&[TEST_WEBHOOK_SECRET]))
        .expect("Verification should not error");

    assert!(!result, "Modified payload should be rejected");
}

#[test]
fn test_old_timestamp_rejected() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let timestamp = old_timestamp();
    // Valid signature but timestamp too old
    let signature = compute_signature(payload, TEST_WEBHOOK_SECRET, &timestamp);
    let header = format!("t={},v1={}", timestamp, signature);

    let result = verify_webhook_signature(payload, &header, &secrets(&[TEST_WEBHOOK_SECRET]))
        .expect("Verification should not error");

    assert!(!result, "Old timestamp should be rejected (replay attack prevention)");
}

#[test]
fn test_future_timestamp_rejected() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    // 5 minutes in the future - beyond the 60-second skew allowance
    let timestamp = (chrono::Utc::now().timestamp() + 300).to_string();
    let signature = compute_signature(payload, TEST_WEBHOOK_SECRET, &timestamp);
    let header = format!("t={},v1={}", timestamp, signature);

    let result = verify_webhook_signature(payload, &header, &secrets(&[TEST_WEBHOOK_SECRET]))
        .expect("Verification should not error");

    assert!(!result, "Future timestamp should be rejected");
}

#[test]
fn test_second_secret_accepted() {
    // Rotation window: the event is signed with the new secret while the
    // old one is still first in the list.
    let payload = b"{\"type\":\"customer.subscription.updated\"}";
    let header = signature_header(payload, "whsec_new_secret");

    let trusted = secrets(&["whsec_old_secret", "whsec_new_secret"]);
    let result = verify_webhook_signature(payload, &header, &trusted)
        .expect("Verification should not error");

    assert!(result, "Signature matching any trusted secret should be accepted");
}

#[test]
fn test_missing_timestamp() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let header = "v1=somesignature";

    let result = verify_webhook_signature(payload, header, &secrets(&[TEST_WEBHOOK_SECRET]));

    assert!(result.is_err(), "Missing timestamp should error");
}

#[test]
fn test_missing_signature() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let header = "t=1234567890";

    let result = verify_webhook_signature(payload, header, &secrets(&[TEST_WEBHOOK_SECRET]));

    assert!(result.is_err(), "Missing signature should error");
}

#[test]
fn test_malformed_header() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";

    let result = verify_webhook_signature(payload, "garbage", &secrets(&[TEST_WEBHOOK_SECRET]));

    assert!(result.is_err(), "Malformed header should error");
}

#[test]
fn test_empty_header() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";

    let result = verify_webhook_signature(payload, "", &secrets(&[TEST_WEBHOOK_SECRET]));

    assert!(result.is_err(), "Empty header should error");
}

#[test]
fn test_no_secrets_configured() {
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let header = signature_header(payload, TEST_WEBHOOK_SECRET);

    let result = verify_webhook_signature(payload, &header, &[]);

    assert!(result.is_err(), "Empty secret list should error, not silently accept");
}
