//! Contact form submissions.
//!
//! A [`ContactForm`] is validated field by field into a [`ContactMessage`].
//! Every violation is collected so the caller gets the full list at once.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Character bounds per field (inclusive)
pub const NAME_LEN: (usize, usize) = (2, 80);
pub const SUBJECT_LEN: (usize, usize) = (3, 120);
pub const MESSAGE_LEN: (usize, usize) = (10, 2000);

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Per-field validation messages, serialized as `{ "field": ["message", ...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationIssues(BTreeMap<String, Vec<String>>);

impl ValidationIssues {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Names of the fields with at least one issue
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Raw contact form payload (`POST /contact`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// A validated contact submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(self) -> Result<ContactMessage, ValidationIssues> {
        let mut issues = ValidationIssues::default();

        let name = check_length("name", self.name, NAME_LEN, &mut issues);
        let email = check_email(self.email, &mut issues);
        let subject = check_length("subject", self.subject, SUBJECT_LEN, &mut issues);
        let message = check_length("message", self.message, MESSAGE_LEN, &mut issues);

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(ContactMessage {
            name,
            email,
            subject,
            message,
        })
    }
}

fn check_length(
    field: &'static str,
    value: Option<String>,
    (min, max): (usize, usize),
    issues: &mut ValidationIssues,
) -> String {
    let Some(value) = value else {
        issues.push(field, "Required");
        return String::new();
    };

    let len = value.chars().count();
    if len < min {
        issues.push(field, format!("Must contain at least {min} character(s)"));
    } else if len > max {
        issues.push(field, format!("Must contain at most {max} character(s)"));
    }

    value
}

fn check_email(value: Option<String>, issues: &mut ValidationIssues) -> String {
    let Some(value) = value else {
        issues.push("email", "Required");
        return String::new();
    };

    if !is_valid_email(&value) {
        issues.push("email", "Invalid email");
    }

    value
}

/// Email syntax check: no leading dot, no consecutive dots, a dotted domain
/// ending in an alphabetic TLD of two or more letters.
pub fn is_valid_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL_RE.is_match(value)
}

impl ContactMessage {
    /// Subject line of the relayed email
    pub fn subject_line(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.subject.clone()
        } else {
            format!("{} {}", prefix, self.subject)
        }
    }

    /// Plain-text rendering
    pub fn text_body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\nSubject: {}\n\nMessage:\n{}\n",
            self.name, self.email, self.subject, self.message
        )
    }

    /// HTML rendering; user content is escaped and message newlines become `<br />`
    pub fn html_body(&self) -> String {
        let message = escape_html(&self.message).replace('\n', "<br />");

        format!(
            concat!(
                r#"<div style="font-family: Inter, Arial, sans-serif; line-height: 1.6;">"#,
                "<p><strong>Name:</strong> {}</p>",
                "<p><strong>Email:</strong> {}</p>",
                "<p><strong>Subject:</strong> {}</p>",
                "<hr />",
                "<p>{}</p>",
                "</div>"
            ),
            escape_html(&self.name),
            escape_html(&self.email),
            escape_html(&self.subject),
            message
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
