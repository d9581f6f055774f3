//! JSON response envelope shared by every endpoint.

use serde::{Deserialize, Serialize};

use crate::contact::ValidationIssues;

/// `{ success, data?, message?, error?, issues? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Underlying error detail (only outside production)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Field-level validation messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<ValidationIssues>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            issues: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
            issues: None,
        }
    }

    /// Failed response
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: None,
            issues: None,
        }
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn with_issues(mut self, issues: ValidationIssues) -> Self {
        self.issues = Some(issues);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_failure_omits_empty_fields() {
        let json = serde_json::to_value(ApiResponse::failure("Missing required fields")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "message": "Missing required fields" })
        );
    }

    #[test]
    fn test_ok_with_message() {
        let resp = ApiResponse::ok(vec![1, 2]).with_message("Event created successfully");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["message"], "Event created successfully");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_empty_list_is_still_present() {
        let json = serde_json::to_value(ApiResponse::ok(Vec::<u8>::new())).unwrap();
        assert_eq!(json["data"], serde_json::json!([]));
    }

    #[test]
    fn test_event_envelope_parses_back() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 18, 30, 0).unwrap();
        let event = Event {
            id: "65f1c0ffee0000000000abcd".to_string(),
            title: "Hack Night".to_string(),
            description: "Build something".to_string(),
            date: "2025-03-01".to_string(),
            location: "Lab A".to_string(),
            attendees: 0,
            images: vec![],
            created_at: at,
            updated_at: at,
        };

        let json = serde_json::to_string(&ApiResponse::ok(event.clone())).unwrap();
        let parsed: ApiResponse<Event> = serde_json::from_str(&json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.data, Some(event));

        let failed: ApiResponse<Event> =
            serde_json::from_str(r#"{"success":false,"message":"Missing required fields"}"#).unwrap();
        assert!(failed.data.is_none());
        assert_eq!(failed.message.as_deref(), Some("Missing required fields"));
    }
}
