mod support;

use sf_core::onboarding::{FlowKind, NewPasswordForm, SessionSnapshot};
use sf_core::ports::ApiError;
use sf_core::security::SecretString;

use support::rejected_code;

const EMAIL: &str = "ada@atelier.test";

async fn enter_code(flow: &sf_app::PasswordResetOrchestrator, code: &str) -> SessionSnapshot {
    let mut snapshot = None;
    for (index, c) in code.chars().enumerate() {
        snapshot = Some(flow.enter_digit(index, c.to_string()).await);
    }
    snapshot.expect("code is not empty")
}

fn new_password(password: &str) -> NewPasswordForm {
    NewPasswordForm {
        password: SecretString::from(password),
        confirm_password: SecretString::from(password),
    }
}

#[tokio::test]
async fn password_reset_flow_happy_path_reaches_done() {
    let h = support::password_reset();

    let snapshot = h.flow.submit_email(EMAIL).await;
    assert_eq!(snapshot.flow, FlowKind::PasswordReset);
    assert_eq!(snapshot.stage, "otp-pending");
    assert_eq!(snapshot.contact.as_deref(), Some(EMAIL));

    let snapshot = enter_code(&h.flow, "654321").await;
    assert_eq!(snapshot.stage, "resetting-password");
    assert!(h
        .countdown
        .cancels
        .lock()
        .unwrap()
        .contains(&FlowKind::PasswordReset));

    let snapshot = h.flow.submit_new_password(new_password("tailored-2024")).await;
    assert_eq!(snapshot.stage, "done");
    assert_eq!(
        h.api.seen_passwords.lock().unwrap().as_slice(),
        &["tailored-2024".to_string()]
    );
    assert_eq!(
        h.events.stages(),
        vec!["collecting-email", "otp-pending", "resetting-password", "done"]
    );
}

#[tokio::test]
async fn password_reset_flow_invalid_email_never_reaches_the_api() {
    let h = support::password_reset();
    let snapshot = h.flow.submit_email("not-an-email").await;
    assert_eq!(snapshot.stage, "collecting-email");
    assert_eq!(snapshot.error.as_deref(), Some("email address is not valid"));
    assert_eq!(snapshot.retryable, Some(false));
    assert_eq!(h.api.count("send_reset_otp"), 0);
}

#[tokio::test]
async fn password_reset_flow_short_password_is_rejected_locally() {
    let h = support::password_reset();
    h.flow.submit_email(EMAIL).await;
    enter_code(&h.flow, "654321").await;

    let snapshot = h.flow.submit_new_password(new_password("short")).await;
    assert_eq!(snapshot.stage, "resetting-password");
    assert_eq!(
        snapshot.error.as_deref(),
        Some("password must be at least 8 characters")
    );
    assert_eq!(h.api.count("reset_password"), 0);
}

#[tokio::test]
async fn password_reset_flow_transport_failure_keeps_attempts() {
    let h = support::password_reset();
    h.api
        .script_verify_reset(Err(ApiError::Transport("dns failure".to_string())));
    h.api.script_verify_reset(Err(rejected_code()));
    h.flow.submit_email(EMAIL).await;

    let snapshot = enter_code(&h.flow, "654321").await;
    assert_eq!(snapshot.otp.as_ref().map(|otp| otp.attempts_remaining), Some(3));
    assert_eq!(snapshot.error.as_deref(), Some("network unavailable: dns failure"));

    let snapshot = h.flow.retry().await;
    assert_eq!(snapshot.otp.as_ref().map(|otp| otp.attempts_remaining), Some(2));

    let snapshot = enter_code(&h.flow, "654321").await;
    assert_eq!(snapshot.stage, "resetting-password");
    assert_eq!(h.api.count("verify_reset_otp"), 3);
}

#[tokio::test]
async fn password_reset_flow_back_from_new_password_allows_immediate_resend() {
    let h = support::password_reset();
    h.flow.submit_email(EMAIL).await;
    enter_code(&h.flow, "654321").await;

    let snapshot = h.flow.back().await;
    assert_eq!(snapshot.stage, "otp-pending");
    let otp = snapshot.otp.unwrap();
    assert!(otp.can_resend);
    assert_eq!(otp.attempts_remaining, 3);

    let snapshot = h.flow.resend_code().await;
    assert_eq!(h.api.count("send_reset_otp"), 2);
    assert_eq!(snapshot.otp.map(|otp| otp.resend_in_secs), Some(60));

    let snapshot = h.flow.back().await;
    assert_eq!(snapshot.stage, "collecting-email");
}

#[tokio::test]
async fn password_reset_flow_server_failure_can_be_retried() {
    let h = support::password_reset();
    h.api.script_reset_password(Err(ApiError::Server {
        status: 503,
        message: "maintenance".to_string(),
    }));
    h.flow.submit_email(EMAIL).await;
    enter_code(&h.flow, "654321").await;

    let snapshot = h
        .flow
        .submit_new_password(new_password("tailored-2024"))
        .await;
    assert_eq!(snapshot.stage, "resetting-password");
    assert_eq!(snapshot.error.as_deref(), Some("server error (503): maintenance"));
    assert_eq!(snapshot.retryable, Some(true));

    // Retry replays the stored password without re-verifying.
    let snapshot = h.flow.retry().await;
    assert_eq!(snapshot.stage, "done");
    assert_eq!(h.api.count("reset_password"), 2);
    assert_eq!(h.api.count("verify_reset_otp"), 1);
    assert_eq!(
        h.api.seen_passwords.lock().unwrap().as_slice(),
        &["tailored-2024".to_string(), "tailored-2024".to_string()]
    );

    let snapshot = h.flow.restart().await;
    assert_eq!(snapshot.stage, "collecting-email");
    assert_eq!(snapshot.contact, None);
}
