//! Gmail API provider implementation.
//!
//! This module provides an [`EmailProvider`] implementation using the Gmail REST API.
//!
//! # Authentication
//!
//! Gmail uses OAuth 2.0. The refresh token and client credentials are stored in
//! the system keychain, referenced by account ID, and exchanged for an access
//! token on [`authenticate`](EmailProvider::authenticate).
//!
//! # API Usage
//!
//! This provider uses the Gmail API v1:
//! - `users.labels.list` for enumerating user labels
//! - `users.threads.list` for the threads carrying a label (all pages)
//! - `users.threads.get` (metadata only) for each thread's last activity
//! - `users.threads.modify` for archiving and marking read
//! - `users.threads.trash` for moving threads to trash

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::{EmailProvider, ProviderError, Result};
use crate::domain::{AccountId, Label, LabelId, ProviderType, ThreadId, ThreadSummary};
use crate::storage::KeychainAccess;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const THREAD_PAGE_SIZE: &str = "500";

/// Gmail API thread list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    threads: Option<Vec<GmailThreadRef>>,
    next_page_token: Option<String>,
}

/// Thread entry of a list response; only the ID is used.
#[derive(Debug, Deserialize)]
struct GmailThreadRef {
    id: String,
}

/// Gmail API thread fetched with `format=metadata`.
#[derive(Debug, Deserialize)]
struct GmailThread {
    id: String,
    messages: Option<Vec<GmailMessage>>,
}

/// Gmail API message (metadata only).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    internal_date: Option<String>,
    payload: Option<GmailMessagePayload>,
}

/// Gmail message payload headers.
#[derive(Debug, Deserialize)]
struct GmailMessagePayload {
    headers: Option<Vec<GmailHeader>>,
}

/// Gmail message header.
#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

/// Gmail API label.
#[derive(Debug, Deserialize)]
struct GmailLabel {
    id: String,
    name: String,
    #[serde(rename = "type")]
    label_type: Option<String>,
}

/// Gmail labels list response.
#[derive(Debug, Deserialize)]
struct LabelsListResponse {
    labels: Option<Vec<GmailLabel>>,
}

/// Gmail modify request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    add_label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    remove_label_ids: Vec<String>,
}

impl ModifyRequest {
    fn remove(label_id: &str) -> Self {
        Self {
            add_label_ids: vec![],
            remove_label_ids: vec![label_id.to_string()],
        }
    }
}

/// OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OAuth credentials stored in keychain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailCredentials {
    /// OAuth refresh token.
    pub refresh_token: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Gmail API provider.
///
/// # Example
///
/// ```ignore
/// use mailreap::providers::email::{EmailProvider, GmailProvider};
///
/// let mut provider = GmailProvider::new(account_id);
/// provider.authenticate().await?;
///
/// let labels = provider.fetch_labels().await?;
/// ```
pub struct GmailProvider {
    /// Account ID for keychain credential lookup.
    account_id: AccountId,
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// Keychain holding the OAuth credentials.
    keychain: KeychainAccess,
    /// Base URL of the Gmail API for the authenticated user.
    api_base: String,
    /// OAuth token endpoint.
    token_url: String,
    /// OAuth credentials.
    credentials: Option<GmailCredentials>,
    /// Current OAuth access token.
    access_token: Option<String>,
    /// Whether the provider is authenticated.
    authenticated: bool,
}

impl GmailProvider {
    /// Creates a new Gmail provider for the specified account.
    ///
    /// Credentials are read from the keychain when
    /// [`authenticate`](EmailProvider::authenticate) is called.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            client: reqwest::Client::new(),
            keychain: KeychainAccess::new(),
            api_base: GMAIL_API_BASE.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            credentials: None,
            access_token: None,
            authenticated: false,
        }
    }

    /// Creates a new Gmail provider with explicit credentials.
    pub fn with_credentials(account_id: AccountId, credentials: GmailCredentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::new(account_id)
        }
    }

    /// Overrides the API and token endpoints.
    pub fn with_endpoints(mut self, api_base: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.token_url = token_url.into();
        self
    }

    /// Returns whether the provider is currently authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns the account ID for this provider.
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Loads credentials from the system keychain.
    async fn load_credentials_from_keychain(&self) -> Result<GmailCredentials> {
        let key = KeychainAccess::gmail_credentials_key(&self.account_id.0);
        let creds_json = self
            .keychain
            .require(&key)
            .await
            .map_err(|e| ProviderError::Authentication(format!("no credentials found: {}", e)))?;

        serde_json::from_str(&creds_json)
            .map_err(|e| ProviderError::Authentication(format!("invalid credentials: {}", e)))
    }

    /// Refreshes the OAuth access token using the refresh token.
    async fn refresh_access_token(&mut self) -> Result<String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("no credentials available".to_string()))?;

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse token response: {}", e)))?;

        self.access_token = Some(token_response.access_token.clone());
        Ok(token_response.access_token)
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(ProviderError::Authentication(
                "not authenticated".to_string(),
            ))
        }
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("not authenticated".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, endpoint);
        let headers = self.auth_headers()?;

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Makes an authenticated POST request whose response body is ignored.
    async fn post_no_response<B: Serialize>(&self, endpoint: &str, body: Option<&B>) -> Result<()> {
        let url = format!("{}{}", self.api_base, endpoint);
        let headers = self.auth_headers()?;

        let mut request = self.client.post(&url).headers(headers);
        request = match body {
            Some(body) => request.json(body),
            // Gmail expects an explicit empty body on action endpoints
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }
        Ok(())
    }

    /// Handles API response, checking for errors.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    /// Handles API error responses.
    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            400 => ProviderError::InvalidRequest(body),
            401 | 403 => ProviderError::Authentication(format!("unauthorized: {}", body)),
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited { retry_after_secs },
            _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
        }
    }

    /// Lists the IDs of every thread carrying `label_id`, following page tokens.
    async fn list_thread_ids(&self, label_id: &LabelId) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response: ThreadListResponse = {
                let mut query = vec![
                    ("labelIds", label_id.0.as_str()),
                    ("maxResults", THREAD_PAGE_SIZE),
                ];
                if let Some(token) = page_token.as_deref() {
                    query.push(("pageToken", token));
                }
                self.get("/threads", &query).await?
            };
            ids.extend(response.threads.unwrap_or_default().into_iter().map(|t| t.id));

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(ids)
    }

    /// Fetches a thread's metadata and reduces it to a summary.
    async fn fetch_summary(&self, thread_id: &str) -> Result<ThreadSummary> {
        let endpoint = format!("/threads/{}", thread_id);
        let thread: GmailThread = self
            .get(
                &endpoint,
                &[("format", "metadata"), ("metadataHeaders", "Subject")],
            )
            .await?;

        Self::thread_to_summary(thread)
    }

    /// Converts a Gmail thread to a summary whose activity date is the latest
    /// message's internal date.
    fn thread_to_summary(thread: GmailThread) -> Result<ThreadSummary> {
        let messages = thread.messages.unwrap_or_default();

        let last_message_date = messages
            .iter()
            .filter_map(|m| m.internal_date.as_ref())
            .filter_map(|d| d.parse::<i64>().ok())
            .filter_map(DateTime::<Utc>::from_timestamp_millis)
            .max()
            .ok_or_else(|| {
                ProviderError::Provider(format!("thread {} has no dated messages", thread.id))
            })?;

        let subject = messages
            .first()
            .and_then(|m| m.payload.as_ref())
            .and_then(|p| p.headers.as_ref())
            .and_then(|h| h.iter().find(|hdr| hdr.name.eq_ignore_ascii_case("Subject")))
            .map(|h| h.value.clone());

        Ok(ThreadSummary {
            id: ThreadId::from(thread.id),
            subject,
            last_message_date,
        })
    }

    async fn modify(&self, thread_id: &ThreadId, body: &ModifyRequest) -> Result<()> {
        self.ensure_authenticated()?;
        let endpoint = format!("/threads/{}/modify", thread_id);
        self.post_no_response(&endpoint, Some(body)).await
    }
}

#[async_trait]
impl EmailProvider for GmailProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Gmail
    }

    async fn authenticate(&mut self) -> Result<()> {
        if self.credentials.is_none() {
            self.credentials = Some(self.load_credentials_from_keychain().await?);
        }

        self.refresh_access_token().await?;
        self.authenticated = true;

        tracing::info!(account_id = %self.account_id, "Gmail provider authenticated");
        Ok(())
    }

    async fn fetch_labels(&self) -> Result<Vec<Label>> {
        self.ensure_authenticated()?;

        let response: LabelsListResponse = self.get("/labels", &[]).await?;

        let labels = response
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter(|l| l.label_type.as_deref() != Some("system"))
            .map(|l| Label::new(l.id, l.name))
            .collect();

        Ok(labels)
    }

    async fn fetch_threads(&self, label: &Label) -> Result<Vec<ThreadSummary>> {
        self.ensure_authenticated()?;

        let ids = self.list_thread_ids(&label.id).await?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            summaries.push(self.fetch_summary(&id).await?);
        }

        tracing::debug!(label = %label.name, count = summaries.len(), "Fetched label threads");
        Ok(summaries)
    }

    async fn archive(&self, thread_id: &ThreadId) -> Result<()> {
        self.modify(thread_id, &ModifyRequest::remove("INBOX")).await
    }

    async fn trash(&self, thread_id: &ThreadId) -> Result<()> {
        self.ensure_authenticated()?;
        let endpoint = format!("/threads/{}/trash", thread_id);
        self.post_no_response::<ModifyRequest>(&endpoint, None).await
    }

    async fn mark_read(&self, thread_id: &ThreadId) -> Result<()> {
        self.modify(thread_id, &ModifyRequest::remove("UNREAD")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> GmailCredentials {
        GmailCredentials {
            refresh_token: "refresh-1".to_string(),
            client_id: "client-1".to_string(),
            client_secret: "secret-1".to_string(),
        }
    }

    async fn authenticated_provider(server: &MockServer) -> GmailProvider {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;

        let mut provider =
            GmailProvider::with_credentials(AccountId::from("me@example.com"), credentials())
                .with_endpoints(server.uri(), format!("{}/token", server.uri()));
        provider.authenticate().await.unwrap();
        provider
    }

    #[test]
    fn gmail_provider_creation() {
        let provider = GmailProvider::new(AccountId::from("test-account"));
        assert_eq!(provider.account_id().0, "test-account");
        assert!(!provider.is_authenticated());
        assert_eq!(provider.provider_type(), ProviderType::Gmail);
    }

    #[tokio::test]
    async fn gmail_provider_requires_auth() {
        let provider = GmailProvider::new(AccountId::from("test-account"));

        let result = provider.fetch_labels().await;
        assert!(matches!(result, Err(ProviderError::Authentication(_))));

        let result = provider.trash(&ThreadId::from("t1")).await;
        assert!(matches!(result, Err(ProviderError::Authentication(_))));
    }

    #[tokio::test]
    async fn authenticate_exchanges_refresh_token() {
        let server = MockServer::start().await;
        let provider = authenticated_provider(&server).await;
        assert!(provider.is_authenticated());
    }

    #[tokio::test]
    async fn authenticate_fails_on_rejected_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let mut provider =
            GmailProvider::with_credentials(AccountId::from("me@example.com"), credentials())
                .with_endpoints(server.uri(), format!("{}/token", server.uri()));

        let result = provider.authenticate().await;
        assert!(matches!(result, Err(ProviderError::Authentication(_))));
        assert!(!provider.is_authenticated());
    }

    #[tokio::test]
    async fn fetch_labels_skips_system_labels() {
        let server = MockServer::start().await;
        let provider = authenticated_provider(&server).await;

        Mock::given(method("GET"))
            .and(path("/labels"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": [
                    {"id": "INBOX", "name": "INBOX", "type": "system"},
                    {"id": "Label_1", "name": "TTL: 30 days", "type": "user"},
                    {"id": "Label_2", "name": "TTR: 1 week", "type": "user"}
                ]
            })))
            .mount(&server)
            .await;

        let labels = provider.fetch_labels().await.unwrap();
        assert_eq!(
            labels,
            vec![
                Label::new("Label_1", "TTL: 30 days"),
                Label::new("Label_2", "TTR: 1 week"),
            ]
        );
    }

    #[tokio::test]
    async fn fetch_threads_follows_pages_and_uses_latest_message() {
        let server = MockServer::start().await;
        let provider = authenticated_provider(&server).await;

        Mock::given(method("GET"))
            .and(path("/threads"))
            .and(query_param("labelIds", "Label_1"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "threads": [{"id": "t2"}]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/threads"))
            .and(query_param("labelIds", "Label_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "threads": [{"id": "t1"}],
                "nextPageToken": "page-2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/threads/t1"))
            .and(query_param("format", "metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "t1",
                "messages": [
                    {
                        "internalDate": "1704067200000",
                        "payload": {"headers": [{"name": "Subject", "value": "Invoice"}]}
                    },
                    {"internalDate": "1704153600000"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/threads/t2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "t2",
                "messages": [{"internalDate": "1700000000000"}]
            })))
            .mount(&server)
            .await;

        let threads = provider
            .fetch_threads(&Label::new("Label_1", "TTL: 30 days"))
            .await
            .unwrap();

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, ThreadId::from("t1"));
        assert_eq!(threads[0].subject.as_deref(), Some("Invoice"));
        assert_eq!(
            threads[0].last_message_date,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(threads[1].id, ThreadId::from("t2"));
        assert_eq!(threads[1].subject, None);
    }

    #[test]
    fn thread_without_messages_is_an_error() {
        let thread = GmailThread {
            id: "t1".to_string(),
            messages: None,
        };
        let result = GmailProvider::thread_to_summary(thread);
        assert!(matches!(result, Err(ProviderError::Provider(_))));
    }

    #[tokio::test]
    async fn mutations_hit_expected_endpoints() {
        let server = MockServer::start().await;
        let provider = authenticated_provider(&server).await;

        Mock::given(method("POST"))
            .and(path("/threads/t1/trash"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/threads/t2/modify"))
            .and(body_json(json!({"removeLabelIds": ["UNREAD"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t2"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/threads/t3/modify"))
            .and(body_json(json!({"removeLabelIds": ["INBOX"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t3"})))
            .expect(1)
            .mount(&server)
            .await;

        provider.trash(&ThreadId::from("t1")).await.unwrap();
        provider.mark_read(&ThreadId::from("t2")).await.unwrap();
        provider.archive(&ThreadId::from("t3")).await.unwrap();
    }

    #[tokio::test]
    async fn api_errors_are_classified() {
        let server = MockServer::start().await;
        let provider = authenticated_provider(&server).await;

        Mock::given(method("GET"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/threads/gone/trash"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Requested entity was not found."))
            .mount(&server)
            .await;

        let result = provider.fetch_labels().await;
        assert!(matches!(
            result,
            Err(ProviderError::RateLimited {
                retry_after_secs: Some(30)
            })
        ));

        let result = provider.trash(&ThreadId::from("gone")).await;
        assert!(matches!(result, Err(ProviderError::NotFound(_))));
    }
}
