//! Resend HTTP API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info};

use super::{DeliveryError, Mailer, OutboundEmail};

/// Request timeout for the delivery API
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Mailer posting to the Resend send-email endpoint
pub struct ResendMailer {
    endpoint: String,
    client: reqwest::Client,
}

impl ResendMailer {
    /// Create a new Resend mailer
    pub fn new(endpoint: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(
        &self,
        api_key: &str,
        idempotency_key: &str,
        email: &OutboundEmail,
    ) -> Result<(), DeliveryError> {
        debug!("Sending email to {} recipient(s)", email.to.len());

        let resp = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header("Idempotency-Key", idempotency_key)
            .json(email)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            info!("Email accepted by {}", self.endpoint);
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use tokio::net::TcpListener;

    type Captured = Arc<Mutex<Vec<(HeaderMap, serde_json::Value)>>>;

    /// Local stand-in for the provider; answers with `status`
    async fn spawn_provider(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();

        let app = Router::new()
            .route(
                "/emails",
                post(
                    move |State(seen): State<Captured>, headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                        seen.lock().unwrap().push((headers, body));
                        (status, r#"{"message":"provider says no"}"#)
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/emails", addr), captured)
    }

    fn email() -> OutboundEmail {
        OutboundEmail {
            from: "site@cs.tn".to_string(),
            to: vec!["board@cs.tn".to_string()],
            reply_to: "amira@example.tn".to_string(),
            subject: "[CS ISIMM Contact] Hello".to_string(),
            text: "Name: Amira".to_string(),
            html: "<p>Amira</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_authorized_json() {
        let (endpoint, captured) = spawn_provider(StatusCode::OK).await;
        let mailer = ResendMailer::new(endpoint).unwrap();

        mailer.send("re_123", "key-1", &email()).await.unwrap();

        let seen = captured.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (headers, body) = &seen[0];
        assert_eq!(headers[AUTHORIZATION], "Bearer re_123");
        assert_eq!(headers["idempotency-key"], "key-1");
        assert_eq!(body["reply_to"], "amira@example.tn");
        assert_eq!(body["to"], serde_json::json!(["board@cs.tn"]));
    }

    #[tokio::test]
    async fn test_non_success_is_rejected_with_body() {
        let (endpoint, _captured) = spawn_provider(StatusCode::UNPROCESSABLE_ENTITY).await;
        let mailer = ResendMailer::new(endpoint).unwrap();

        let err = mailer.send("re_123", "key-2", &email()).await.unwrap_err();
        match err {
            DeliveryError::Rejected { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("provider says no"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_a_transport_error() {
        // bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mailer = ResendMailer::new(format!("http://{}/emails", addr)).unwrap();
        let err = mailer.send("re_123", "key-3", &email()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }
}
