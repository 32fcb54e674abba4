//! Account and subscription operations for the Smotreshka API.
//!
//! # Design
//! Each operation comes in two forms. `build_*` produces the `HttpRequest`
//! without touching the network, so request shapes are testable on their own.
//! The executing form sends that request through the client's `Transport`
//! and returns the response text.
//!
//! All executing methods funnel through [`SmotreshkaClient::execute`], which
//! applies [`normalize_response`]: success bodies and JSON error bodies pass
//! through verbatim, anything else becomes `{"error":"<reason phrase>"}`.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode, CONTROLS};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport, APPLICATION_JSON, CONTENT_TYPE};
use crate::types::{AccountInfo, AccountUpdate, NewAccount, PasswordReset, SubscriptionChange};

/// Synchronous client for one operator/node tenant.
///
/// Holds an immutable base address and a transport, so a single instance can
/// be shared across threads.
pub struct SmotreshkaClient<T = UreqTransport> {
    base_url: String,
    transport: T,
}

impl SmotreshkaClient<UreqTransport> {
    /// Client for `http://{operator}.{node}.lfstrm.tv/v2/` with a 5 second timeout.
    pub fn new(operator: &str, node: &str) -> Result<Self, ApiError> {
        Self::from_config(ClientConfig::new(operator, node))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> SmotreshkaClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            base_url: config.base_url(),
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_create_account(&self, account: &NewAccount) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "accounts", account)
    }

    pub fn build_get_account_info(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("accounts/{}", segment(id)), None)
    }

    pub fn build_update_account(&self, id: &str, info: &AccountInfo) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            &format!("accounts/{}/update", segment(id)),
            &AccountUpdate { info },
        )
    }

    pub fn build_reset_account_password(
        &self,
        id: &str,
        password: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            &format!("accounts/{}/reset-password", segment(id)),
            &PasswordReset { password },
        )
    }

    pub fn build_delete_account(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("accounts/{}", segment(id)), None)
    }

    pub fn build_list_account_subscriptions(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("accounts/{}/subscriptions", segment(id)), None)
    }

    pub fn build_update_account_subscription(
        &self,
        id: &str,
        subscription_id: &str,
        valid: bool,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            &format!("accounts/{}/subscriptions", segment(id)),
            &SubscriptionChange {
                id: subscription_id,
                valid,
            },
        )
    }

    pub fn build_list_available_subscriptions(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "subscriptions", None)
    }

    pub fn build_list_all_accounts(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "accounts", None)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub fn create_account(&self, account: &NewAccount) -> Result<String, ApiError> {
        self.execute(self.build_create_account(account)?)
    }

    pub fn get_account_info(&self, id: &str) -> Result<String, ApiError> {
        self.execute(self.build_get_account_info(id))
    }

    pub fn update_account(&self, id: &str, info: &AccountInfo) -> Result<String, ApiError> {
        self.execute(self.build_update_account(id, info)?)
    }

    /// Without a password (or with an empty one) the provider generates one.
    pub fn reset_account_password(&self, id: &str, password: Option<&str>) -> Result<String, ApiError> {
        self.execute(self.build_reset_account_password(id, password)?)
    }

    pub fn delete_account(&self, id: &str) -> Result<String, ApiError> {
        self.execute(self.build_delete_account(id))
    }

    pub fn list_account_subscriptions(&self, id: &str) -> Result<String, ApiError> {
        self.execute(self.build_list_account_subscriptions(id))
    }

    pub fn update_account_subscription(
        &self,
        id: &str,
        subscription_id: &str,
        valid: bool,
    ) -> Result<String, ApiError> {
        self.execute(self.build_update_account_subscription(id, subscription_id, valid)?)
    }

    pub fn list_available_subscriptions(&self) -> Result<String, ApiError> {
        self.execute(self.build_list_available_subscriptions())
    }

    pub fn list_all_accounts(&self) -> Result<String, ApiError> {
        self.execute(self.build_list_all_accounts())
    }

    /// Send one request and normalize the outcome to JSON text.
    ///
    /// Returns `Err` only when the transport got no response at all.
    pub fn execute(&self, request: HttpRequest) -> Result<String, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let response = self.transport.execute(&request).inspect_err(|err| {
            warn!(method = request.method.as_str(), url = %request.url, error = %err, "request failed");
        })?;

        debug!(status = response.status, url = %request.url, "received response");
        Ok(normalize_response(response))
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())],
            body,
        }
    }

    fn json_request<P: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &P,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload).map_err(ApiError::Serialization)?;
        Ok(self.request(method, path, Some(body)))
    }
}

/// Characters escaped inside a single path segment. `/` and `%` are escaped
/// too, so an id always maps to exactly one literal segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn segment(id: &str) -> PercentEncode<'_> {
    utf8_percent_encode(id, PATH_SEGMENT)
}

impl<T> fmt::Debug for SmotreshkaClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmotreshkaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Fold a response into the text handed back to callers.
///
/// Bad responses keep their body when it is well-formed JSON (the provider's
/// own error object); otherwise the reason phrase is wrapped as
/// `{"error": ...}`.
pub fn normalize_response(response: HttpResponse) -> String {
    if !response.is_bad_response() {
        return response.body;
    }
    if serde_json::from_str::<serde::de::IgnoredAny>(&response.body).is_ok() {
        return response.body;
    }

    let reason = response.reason_phrase();
    warn!(status = response.status, reason = %reason, "non-JSON error response");
    serde_json::json!({ "error": reason }).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    /// Records every request and answers with a canned response.
    struct RecordingTransport {
        requests: Mutex<Vec<HttpRequest>>,
        reply: Option<HttpResponse>,
    }

    impl RecordingTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Some(HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
            }
        }

        fn unreachable() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: None,
            }
        }

        fn last(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for RecordingTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply
                .clone()
                .ok_or_else(|| ApiError::Transport("connection refused".to_string()))
        }
    }

    fn client() -> SmotreshkaClient<RecordingTransport> {
        client_with(RecordingTransport::replying(200, "{}"))
    }

    fn client_with(transport: RecordingTransport) -> SmotreshkaClient<RecordingTransport> {
        SmotreshkaClient::with_transport(ClientConfig::new("op1", "nodeA"), transport).unwrap()
    }

    fn body_json(req: &HttpRequest) -> serde_json::Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn new_rejects_empty_operator() {
        let err = SmotreshkaClient::new("", "nodeA").unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
    }

    #[test]
    fn new_composes_provider_base_url() {
        let client = SmotreshkaClient::new("op1", "nodeA").unwrap();
        assert_eq!(client.base_url(), "http://op1.nodeA.lfstrm.tv/v2/");
    }

    #[test]
    fn build_create_account_email_only() {
        let req = client().build_create_account(&NewAccount::new("a@b.c")).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://op1.nodeA.lfstrm.tv/v2/accounts");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(body_json(&req), json!({"email": "a@b.c"}));
    }

    #[test]
    fn build_create_account_all_fields() {
        let account = NewAccount::new("a@b.c")
            .username("alice")
            .password("secret")
            .purchase("basic")
            .info("name", "Alice");
        let req = client().build_create_account(&account).unwrap();
        assert_eq!(
            body_json(&req),
            json!({
                "email": "a@b.c",
                "password": "secret",
                "username": "alice",
                "purchases": ["basic"],
                "info": {"name": "Alice"}
            })
        );
    }

    #[test]
    fn build_create_account_omits_empty_optionals() {
        let account = NewAccount::new("a@b.c").username("").password("secret");
        let req = client().build_create_account(&account).unwrap();
        let body = body_json(&req);
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["email", "password"]);
    }

    #[test]
    fn ids_are_percent_encoded_as_one_segment() {
        let c = client();
        assert_eq!(
            c.build_get_account_info("john doe").url,
            "http://op1.nodeA.lfstrm.tv/v2/accounts/john%20doe"
        );
        assert_eq!(
            c.build_delete_account("a/b?c").url,
            "http://op1.nodeA.lfstrm.tv/v2/accounts/a%2Fb%3Fc"
        );
        assert_eq!(
            c.build_list_account_subscriptions("50%").url,
            "http://op1.nodeA.lfstrm.tv/v2/accounts/50%25/subscriptions"
        );
        assert_eq!(
            c.build_reset_account_password("иван", None).unwrap().url,
            "http://op1.nodeA.lfstrm.tv/v2/accounts/%D0%B8%D0%B2%D0%B0%D0%BD/reset-password"
        );
    }

    #[test]
    fn plain_ids_are_left_alone() {
        let req = client().build_update_account_subscription("5f0c-ab_9.x~", "s1", true).unwrap();
        assert_eq!(req.url, "http://op1.nodeA.lfstrm.tv/v2/accounts/5f0c-ab_9.x~/subscriptions");
    }

    #[test]
    fn build_get_account_info_has_no_body() {
        let req = client().build_get_account_info("abc123");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://op1.nodeA.lfstrm.tv/v2/accounts/abc123");
        assert!(req.body.is_none());
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn build_update_account_wraps_info() {
        let mut info = AccountInfo::new();
        info.insert("phone".to_string(), json!("+100"));
        let req = client().build_update_account("42", &info).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://op1.nodeA.lfstrm.tv/v2/accounts/42/update");
        assert_eq!(body_json(&req), json!({"info": {"phone": "+100"}}));
    }

    #[test]
    fn build_reset_account_password_variants() {
        let c = client();
        let with = c.build_reset_account_password("u1", Some("secret")).unwrap();
        assert_eq!(with.url, "http://op1.nodeA.lfstrm.tv/v2/accounts/u1/reset-password");
        assert_eq!(with.body.as_deref(), Some(r#"{"password":"secret"}"#));

        let empty = c.build_reset_account_password("u1", Some("")).unwrap();
        assert_eq!(empty.body.as_deref(), Some("{}"));

        let none = c.build_reset_account_password("u1", None).unwrap();
        assert_eq!(none.body.as_deref(), Some("{}"));
    }

    #[test]
    fn build_delete_account() {
        let req = client().build_delete_account("u1");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://op1.nodeA.lfstrm.tv/v2/accounts/u1");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_subscription_requests() {
        let c = client();
        let list = c.build_list_account_subscriptions("u1");
        assert_eq!(list.method, HttpMethod::Get);
        assert_eq!(list.url, "http://op1.nodeA.lfstrm.tv/v2/accounts/u1/subscriptions");

        let update = c.build_update_account_subscription("u1", "s1", true).unwrap();
        assert_eq!(update.method, HttpMethod::Post);
        assert_eq!(update.url, "http://op1.nodeA.lfstrm.tv/v2/accounts/u1/subscriptions");
        assert_eq!(update.body.as_deref(), Some(r#"{"id":"s1","valid":true}"#));

        let catalog = c.build_list_available_subscriptions();
        assert_eq!(catalog.method, HttpMethod::Get);
        assert_eq!(catalog.url, "http://op1.nodeA.lfstrm.tv/v2/subscriptions");
    }

    #[test]
    fn build_list_all_accounts() {
        let req = client().build_list_all_accounts();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://op1.nodeA.lfstrm.tv/v2/accounts");
    }

    #[test]
    fn get_account_info_returns_body_verbatim() {
        let c = client_with(RecordingTransport::replying(200, r#"{"id":"abc123"}"#));
        assert_eq!(c.get_account_info("abc123").unwrap(), r#"{"id":"abc123"}"#);
        assert_eq!(c.transport().last(), c.build_get_account_info("abc123"));
    }

    #[test]
    fn operations_send_what_builders_produce() {
        let c = client();
        let account = NewAccount::new("a@b.c").purchase("basic");
        c.create_account(&account).unwrap();
        assert_eq!(c.transport().last(), c.build_create_account(&account).unwrap());

        c.update_account_subscription("u1", "s1", false).unwrap();
        assert_eq!(
            c.transport().last(),
            c.build_update_account_subscription("u1", "s1", false).unwrap()
        );

        c.reset_account_password("u1", None).unwrap();
        assert_eq!(c.transport().last().body.as_deref(), Some("{}"));

        c.delete_account("u1").unwrap();
        assert_eq!(c.transport().last().method, HttpMethod::Delete);

        c.list_all_accounts().unwrap();
        c.list_available_subscriptions().unwrap();
        c.list_account_subscriptions("u1").unwrap();
        c.update_account("u1", &AccountInfo::new()).unwrap();
        assert_eq!(c.transport().requests.lock().unwrap().len(), 8);
    }

    #[test]
    fn bad_response_with_json_body_passes_through() {
        let c = client_with(RecordingTransport::replying(
            404,
            r#"{"code":404,"message":"not found"}"#,
        ));
        assert_eq!(
            c.get_account_info("missing").unwrap(),
            r#"{"code":404,"message":"not found"}"#
        );
    }

    #[test]
    fn bad_response_with_text_body_is_wrapped() {
        let c = client_with(RecordingTransport::replying(503, "Service Unavailable"));
        assert_eq!(
            c.list_available_subscriptions().unwrap(),
            r#"{"error":"Service Unavailable"}"#
        );
    }

    #[test]
    fn transport_failure_is_an_error() {
        let c = client_with(RecordingTransport::unreachable());
        let err = c.list_all_accounts().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn normalize_passes_success_body_even_if_not_json() {
        assert_eq!(normalize_response(response(200, "OK")), "OK");
        assert_eq!(normalize_response(response(204, "")), "");
    }

    #[test]
    fn normalize_wraps_empty_error_body() {
        assert_eq!(
            normalize_response(response(500, "")),
            r#"{"error":"Internal Server Error"}"#
        );
    }

    #[test]
    fn normalize_wraps_html_error_page() {
        assert_eq!(
            normalize_response(response(502, "<html><body>Bad Gateway</body></html>")),
            r#"{"error":"Bad Gateway"}"#
        );
    }

    #[test]
    fn normalize_keeps_any_json_error_value() {
        assert_eq!(normalize_response(response(400, "[1,2]")), "[1,2]");
        assert_eq!(normalize_response(response(400, "\"bad\"")), "\"bad\"");
    }

    #[test]
    fn normalize_falls_back_to_status_code() {
        assert_eq!(normalize_response(response(599, "oops")), r#"{"error":"599"}"#);
    }
}
