//! Zoho CRM provider.
//!
//! Exchanges a long-lived refresh token for an access token and runs COQL
//! queries against the `Leads` module.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use zeroize::Zeroize;

use super::status::{CrmError, CrmProvider, CrmResult, LeadRecord, NameMatch};
use crate::config::ServerConfig;

/// Fields selected by every lead query.
const LEAD_FIELDS: &str = "First_Name, Last_Name, Email, Phone, Mobile, Lead_Status, \
                           Training_Status, Training_Start_Date, Training_End_Date, Language";

/// Number of trailing digits compared when searching by phone.
const PHONE_MATCH_DIGITS: usize = 10;

/// Upper bound on rows fetched for a name search.
const NAME_SEARCH_LIMIT: usize = 5;

/// Access tokens are refreshed this long before Zoho says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// =============================================================================
// Configuration
// =============================================================================

/// OAuth client credentials for the Zoho API.
#[derive(Clone)]
pub struct ZohoCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for ZohoCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZohoCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

impl Drop for ZohoCredentials {
    fn drop(&mut self) {
        self.client_secret.zeroize();
        self.refresh_token.zeroize();
    }
}

#[derive(Debug, Clone)]
pub struct ZohoConfig {
    /// `None` makes every query fail with [`CrmError::NotConfigured`]
    pub credentials: Option<ZohoCredentials>,
    pub token_url: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl ZohoConfig {
    pub fn from_server_config(config: &ServerConfig) -> Self {
        let credentials = if config.has_zoho_credentials() {
            Some(ZohoCredentials {
                client_id: config.zoho_client_id.clone().unwrap_or_default(),
                client_secret: config.zoho_client_secret.clone().unwrap_or_default(),
                refresh_token: config.zoho_refresh_token.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        Self {
            credentials,
            token_url: config.zoho_token_url.clone(),
            api_base: config.zoho_api_base.trim_end_matches('/').to_string(),
            timeout: config.lookup_timeout(),
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoqlResponse {
    #[serde(default)]
    data: Vec<LeadRecord>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

// =============================================================================
// Query Builders
// =============================================================================

/// Escape a value for use inside a single-quoted COQL literal.
pub fn sanitize_coql(value: &str) -> String {
    value.replace('\'', "''")
}

/// Digits of `phone`, keeping at most the last ten. `None` when there are no digits.
fn phone_suffix(phone: &str) -> Option<String> {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let start = digits.len().saturating_sub(PHONE_MATCH_DIGITS);
    Some(digits[start..].iter().collect())
}

fn phone_query(phone: &str) -> Option<String> {
    let suffix = sanitize_coql(&phone_suffix(phone)?);
    Some(format!(
        "SELECT {LEAD_FIELDS} FROM Leads \
         WHERE (Phone like '%{suffix}%' OR Mobile like '%{suffix}%') LIMIT 1"
    ))
}

fn email_query(email: &str) -> String {
    let email = sanitize_coql(email);
    format!("SELECT {LEAD_FIELDS} FROM Leads WHERE Email = '{email}' LIMIT 1")
}

fn name_query(first_name: &str, last_name: &str) -> String {
    let first = sanitize_coql(first_name);
    let last = sanitize_coql(last_name);
    format!(
        "SELECT {LEAD_FIELDS} FROM Leads \
         WHERE First_Name = '{first}' AND Last_Name = '{last}' LIMIT {NAME_SEARCH_LIMIT}"
    )
}

// =============================================================================
// Provider
// =============================================================================

/// [`CrmProvider`] backed by the Zoho CRM REST API.
pub struct ZohoCrm {
    client: Client,
    config: ZohoConfig,
    token: Mutex<Option<CachedToken>>,
}

impl ZohoCrm {
    pub fn new(client: Client, config: ZohoConfig) -> Self {
        Self {
            client,
            config,
            token: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.credentials.is_some()
    }

    /// Return a cached access token or exchange the refresh token for a new one.
    async fn access_token(&self) -> CrmResult<String> {
        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or(CrmError::NotConfigured)?;

        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        let response = self
            .client
            .post(&self.config.token_url)
            .timeout(self.config.timeout)
            .form(&[
                ("refresh_token", credentials.refresh_token.as_str()),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CrmError::Token(format!("status {status}: {error_text}")));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CrmError::Decode(e.to_string()))?;

        let Some(access_token) = body.access_token else {
            return Err(CrmError::Token(
                body.error.unwrap_or_else(|| "no access_token in response".to_string()),
            ));
        };

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.token.lock() = Some(CachedToken {
            value: access_token.clone(),
            expires_at,
        });

        tracing::debug!(expires_in = lifetime.as_secs(), "Refreshed Zoho access token");
        Ok(access_token)
    }

    /// Run a COQL select and return the matching rows.
    async fn coql(&self, query: String) -> CrmResult<Vec<LeadRecord>> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}/coql", self.config.api_base))
            .timeout(self.config.timeout)
            .header("Authorization", format!("Zoho-oauthtoken {token}"))
            .json(&serde_json::json!({ "select_query": query }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: CoqlResponse = response
            .json()
            .await
            .map_err(|e| CrmError::Decode(e.to_string()))?;
        Ok(body.data)
    }
}

#[async_trait]
impl CrmProvider for ZohoCrm {
    async fn find_by_phone(&self, phone: &str) -> CrmResult<Option<LeadRecord>> {
        let Some(query) = phone_query(phone) else {
            return Ok(None);
        };
        Ok(self.coql(query).await?.into_iter().next())
    }

    async fn find_by_email(&self, email: &str) -> CrmResult<Option<LeadRecord>> {
        Ok(self.coql(email_query(email)).await?.into_iter().next())
    }

    async fn find_by_name(&self, first_name: &str, last_name: &str) -> CrmResult<NameMatch> {
        let mut rows = self.coql(name_query(first_name, last_name)).await?;
        Ok(match rows.len() {
            0 => NameMatch::None,
            1 => NameMatch::Single(rows.remove(0)),
            n => NameMatch::Multiple(n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_coql_doubles_quotes() {
        assert_eq!(sanitize_coql("O'Brien"), "O''Brien");
        assert_eq!(sanitize_coql("plain"), "plain");
    }

    #[test]
    fn test_phone_suffix_keeps_last_ten_digits() {
        assert_eq!(phone_suffix("+1 (951) 440-9567").as_deref(), Some("9514409567"));
        assert_eq!(phone_suffix("440-9567").as_deref(), Some("4409567"));
        assert_eq!(phone_suffix("anonymous"), None);
    }

    #[test]
    fn test_phone_query() {
        let query = phone_query("+19514409567").unwrap();
        assert!(query.contains("Phone like '%9514409567%'"));
        assert!(query.contains("Mobile like '%9514409567%'"));
        assert!(query.ends_with("LIMIT 1"));
        assert!(phone_query("").is_none());
    }

    #[test]
    fn test_name_query_is_sanitized_and_limited() {
        let query = name_query("D'Arcy", "O'Neil");
        assert!(query.contains("First_Name = 'D''Arcy'"));
        assert!(query.contains("Last_Name = 'O''Neil'"));
        assert!(query.ends_with("LIMIT 5"));
    }

    #[test]
    fn test_email_query() {
        let query = email_query("maria@example.com");
        assert!(query.contains("WHERE Email = 'maria@example.com'"));
    }

    #[test]
    fn test_config_without_credentials() {
        let config = ZohoConfig::from_server_config(&ServerConfig::default());
        assert!(config.credentials.is_none());

        let crm = ZohoCrm::new(Client::new(), config);
        assert!(!crm.is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_errors_without_request() {
        let crm = ZohoCrm::new(Client::new(), ZohoConfig::from_server_config(&ServerConfig::default()));
        let result = crm.find_by_email("maria@example.com").await;
        assert!(matches!(result, Err(CrmError::NotConfigured)));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = ZohoCredentials {
            client_id: "id".to_string(),
            client_secret: "very-secret".to_string(),
            refresh_token: "refresh-value".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("refresh-value"));
    }
}
