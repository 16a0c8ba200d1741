//! Application status lookup against a CRM provider.
//!
//! A lookup tries the caller's phone number, then email, then first and last
//! name. The first step that yields a record wins. A name search that matches
//! more than one lead is reported as ambiguous so the assistant can ask for a
//! more specific identifier.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by CRM providers.
#[derive(Debug, Error)]
pub enum CrmError {
    /// Credentials are missing so no request can be made
    #[error("CRM credentials are not configured")]
    NotConfigured,

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the CRM API
    #[error("CRM request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Access token exchange failed
    #[error("Token exchange failed: {0}")]
    Token(String),

    /// Response body could not be decoded
    #[error("Failed to decode CRM response: {0}")]
    Decode(String),
}

/// Result type for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;

// =============================================================================
// CRM Records
// =============================================================================

/// A lead row as returned by the CRM.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LeadRecord {
    #[serde(rename = "First_Name", default)]
    pub first_name: Option<String>,
    #[serde(rename = "Last_Name", default)]
    pub last_name: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    #[serde(rename = "Phone", default)]
    pub phone: Option<String>,
    #[serde(rename = "Mobile", default)]
    pub mobile: Option<String>,
    #[serde(rename = "Lead_Status", default)]
    pub lead_status: Option<String>,
    #[serde(rename = "Training_Status", default)]
    pub training_status: Option<String>,
    #[serde(rename = "Language", default)]
    pub language: Option<String>,
}

/// Outcome of a first-and-last-name search.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    None,
    Single(LeadRecord),
    /// More than one lead shares the name; carries the number of rows seen
    Multiple(usize),
}

/// Read-only CRM queries used by the status lookup.
#[async_trait]
pub trait CrmProvider: Send + Sync {
    /// Find a lead whose phone or mobile number contains `phone`.
    async fn find_by_phone(&self, phone: &str) -> CrmResult<Option<LeadRecord>>;

    /// Find a lead with exactly this email address.
    async fn find_by_email(&self, email: &str) -> CrmResult<Option<LeadRecord>>;

    /// Find leads with this first and last name.
    async fn find_by_name(&self, first_name: &str, last_name: &str) -> CrmResult<NameMatch>;
}

// =============================================================================
// Query & Result
// =============================================================================

/// Identifiers supplied for a lookup. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusQuery {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl StatusQuery {
    /// Query with only a phone number, as used by the call-setup prefetch.
    pub fn phone(phone: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            ..Default::default()
        }
    }

    /// Build a query from tool-call arguments. Non-string values are ignored.
    pub fn from_arguments(arguments: &Map<String, Value>) -> Self {
        let field = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            phone: field("phone"),
            email: field("email"),
            first_name: field("first_name"),
            last_name: field("last_name"),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A matched application with its caller-facing status message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationStatus {
    pub first_name: String,
    pub last_name: String,
    pub status: String,
    pub language: Option<String>,
    pub training_status: Option<String>,
    pub message: String,
}

/// Result of an application status lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusLookup {
    Found(ApplicationStatus),
    /// Several leads matched by name
    Ambiguous { candidates: usize },
    NotFound,
}

pub const AMBIGUOUS_MESSAGE: &str =
    "Multiple candidates found with that name. Please provide your phone number or email.";
pub const NOT_FOUND_MESSAGE: &str = "I couldn't find a record with that information.";

impl StatusLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, StatusLookup::Found(_))
    }

    pub fn first_name(&self) -> Option<&str> {
        match self {
            StatusLookup::Found(status) => Some(status.first_name.as_str()),
            _ => None,
        }
    }

    /// JSON shape returned to the AI session as a function call output.
    pub fn to_json(&self) -> Value {
        match self {
            StatusLookup::Found(status) => json!({
                "found": true,
                "first_name": status.first_name,
                "last_name": status.last_name,
                "status": status.status,
                "language": status.language,
                "training_status": status.training_status,
                "message": status.message,
            }),
            StatusLookup::Ambiguous { candidates } => json!({
                "found": false,
                "ambiguous": true,
                "candidates": candidates,
                "message": AMBIGUOUS_MESSAGE,
            }),
            StatusLookup::NotFound => json!({
                "found": false,
                "message": NOT_FOUND_MESSAGE,
            }),
        }
    }
}

/// Caller-facing message for a lead status.
pub fn status_message(status: &str) -> String {
    let message = match status {
        "Not Contacted" => "We have received your application and will contact you soon.",
        "Contacted" => "We have reached out to you. Please check your email or phone.",
        "Pre-Qualified" => "Your application is currently being reviewed.",
        "Qualified" => {
            "Congratulations! You have been qualified. We will reach out with next steps."
        }
        "Not Qualified" => {
            "Unfortunately, your application did not meet our requirements at this time."
        }
        "Invited for training" => "You have been invited for training. Please check your email.",
        "Scheduled for Next training" => "You are scheduled for our next training session.",
        "Training completed successfully" => {
            "Congratulations! You have completed your training successfully."
        }
        other => return format!("Your current status is: {other}"),
    };
    message.to_string()
}

impl From<LeadRecord> for ApplicationStatus {
    fn from(lead: LeadRecord) -> Self {
        let status = lead
            .lead_status
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let message = status_message(&status);

        Self {
            first_name: lead.first_name.unwrap_or_default(),
            last_name: lead.last_name.unwrap_or_default(),
            status,
            language: lead.language,
            training_status: lead.training_status,
            message,
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Phone → email → name lookup over a [`CrmProvider`].
#[derive(Clone)]
pub struct ApplicationStatusLookup {
    crm: Arc<dyn CrmProvider>,
}

impl ApplicationStatusLookup {
    pub fn new(crm: Arc<dyn CrmProvider>) -> Self {
        Self { crm }
    }

    /// Run the lookup. CRM failures are logged and treated as "no match" for
    /// the step that failed.
    pub async fn lookup(&self, query: &StatusQuery) -> StatusLookup {
        if let Some(phone) = non_empty(&query.phone) {
            match self.crm.find_by_phone(phone).await {
                Ok(Some(lead)) => return StatusLookup::Found(lead.into()),
                Ok(None) => tracing::debug!(phone = %phone, "No lead matched phone"),
                Err(e) => tracing::warn!(error = %e, "CRM phone search failed"),
            }
        }

        if let Some(email) = non_empty(&query.email) {
            match self.crm.find_by_email(email).await {
                Ok(Some(lead)) => return StatusLookup::Found(lead.into()),
                Ok(None) => tracing::debug!("No lead matched email"),
                Err(e) => tracing::warn!(error = %e, "CRM email search failed"),
            }
        }

        if let (Some(first), Some(last)) = (non_empty(&query.first_name), non_empty(&query.last_name))
        {
            match self.crm.find_by_name(first, last).await {
                Ok(NameMatch::Single(lead)) => return StatusLookup::Found(lead.into()),
                Ok(NameMatch::Multiple(candidates)) => {
                    tracing::info!(candidates, "Name search matched several leads");
                    return StatusLookup::Ambiguous { candidates };
                }
                Ok(NameMatch::None) => tracing::debug!("No lead matched name"),
                Err(e) => tracing::warn!(error = %e, "CRM name search failed"),
            }
        }

        StatusLookup::NotFound
    }
}
