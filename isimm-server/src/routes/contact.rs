//! Contact form relay endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use isimm_common::ApiResponse;

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::mail::OutboundEmail;
use crate::models::ContactForm;

/// POST /contact - Validate a submission and forward it by email
pub async fn send_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Json(form) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    let message = form.validate().map_err(|issues| {
        debug!("Rejected contact submission: {:?}", issues);
        ApiError::Validation(issues)
    })?;

    let contact = &state.config.contact;
    let Some(route) = contact.route() else {
        error!(
            has_api_key = contact.api_key.is_some(),
            has_from = contact.from.is_some(),
            has_to = !contact.to.is_empty(),
            "Contact form env vars missing"
        );
        return Err(ApiError::Configuration);
    };

    let submission_id = Uuid::new_v4().to_string();
    let email = OutboundEmail::from_contact(&message, &route, &contact.subject_prefix);

    state
        .mailer
        .send(route.api_key, &submission_id, &email)
        .await
        .map_err(|e| {
            error!(submission = %submission_id, "Contact relay failed");
            ApiError::from(e)
        })?;

    info!(submission = %submission_id, "Contact message relayed");
    Ok(Json(ApiResponse::done("Message sent successfully.")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::super::router;
    use super::super::test_support::*;
    use crate::store::MemoryEventStore;

    const VALID: &str = r#"{
        "name": "Amira",
        "email": "amira@example.tn",
        "subject": "Joining the branch",
        "message": "Hello!\nHow can I become a member this semester?"
    }"#;

    #[tokio::test]
    async fn test_valid_submission_is_relayed() {
        let (state, _, mailer) = test_state();
        let (status, body) = call(router(state), post_json("/contact", VALID)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({ "success": true, "message": "Message sent successfully." })
        );

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (api_key, email) = &sent[0];
        assert_eq!(api_key, "re_test");
        assert_eq!(email.from, "site@cs.tn");
        assert_eq!(email.to, vec!["board@cs.tn".to_string(), "chair@cs.tn".to_string()]);
        assert_eq!(email.reply_to, "amira@example.tn");
        assert_eq!(email.subject, "[CS ISIMM Contact] Joining the branch");
        assert!(email.text.contains("Name: Amira"));
        assert!(email.html.contains("Hello!<br />How can I"));
    }

    #[tokio::test]
    async fn test_short_message_is_400_with_field_issue() {
        let (state, _, mailer) = test_state();
        let payload = r#"{ "name": "Al", "email": "a@b.com", "subject": "Hi!", "message": "short" }"#;

        let (status, body) = call(router(state), post_json("/contact", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation failed.");
        assert_eq!(
            body["issues"],
            serde_json::json!({ "message": ["Must contain at least 10 character(s)"] })
        );
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn test_each_invalid_field_reported_and_nothing_sent() {
        let (state, _, mailer) = test_state();
        let app = router(state);

        let cases = [
            ("name", r#"{ "name": "A", "email": "a@b.com", "subject": "Hello", "message": "long enough message" }"#),
            ("email", r#"{ "name": "Al", "email": "a@b", "subject": "Hello", "message": "long enough message" }"#),
            ("subject", r#"{ "name": "Al", "email": "a@b.com", "subject": "Hi", "message": "long enough message" }"#),
            ("message", r#"{ "name": "Al", "email": "a@b.com", "subject": "Hello" }"#),
        ];

        for (field, payload) in cases {
            let (status, body) = call(app.clone(), post_json("/contact", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "field {}", field);
            let issues = body["issues"].as_object().unwrap();
            assert_eq!(issues.keys().collect::<Vec<_>>(), vec![field]);
        }

        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_500_and_nothing_sent() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(
            Arc::new(MemoryEventStore::new()),
            mailer.clone(),
            &[MAIL_ENV[1], MAIL_ENV[2]],
        );

        let (status, body) = call(router(state), post_json("/contact", VALID)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["message"],
            "Contact form is not configured correctly. Please try again later."
        );
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn test_validation_precedes_configuration() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(Arc::new(MemoryEventStore::new()), mailer.clone(), &[]);

        let (status, _) = call(router(state), post_json("/contact", r#"{ "name": "A" }"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_provider_rejection_is_500_without_raw_body() {
        let mailer = Arc::new(RecordingMailer {
            reject: true,
            ..Default::default()
        });
        let state = state_with(Arc::new(MemoryEventStore::new()), mailer.clone(), &MAIL_ENV);

        let (status, body) = call(router(state), post_json("/contact", VALID)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "message": "Failed to send your message. Please try again later."
            })
        );
        assert_eq!(mailer.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (state, _, mailer) = test_state();
        let (status, body) = call(router(state), post_json("/contact", "name=Al")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request body.");
        assert_eq!(mailer.calls(), 0);
    }
}
