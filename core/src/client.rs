//! Open5e client: request building, execution and response parsing.
//!
//! # Design
//! Each query goes through three steps that are also public on their own:
//! `build_*` applies the resource allow-list and produces an `HttpRequest`,
//! the `Transport` executes it, and `parse_response` checks the status and
//! decodes the JSON body. Callers with their own HTTP stack can use the
//! first and last steps and skip the bundled transport.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::config::{ClientConfig, ValidatedConfig};
use crate::error::ApiError;
use crate::filters::only_allowed;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{Filters, Resource};

/// Blocking client for the Open5e API.
///
/// Holds one pooled HTTP agent configured at construction. The client is
/// `Send + Sync` but not `Clone`; share it by reference or behind an `Arc`.
/// It is released when dropped or when [`Open5eClient::close`] consumes it.
#[derive(Debug)]
pub struct Open5eClient {
    config: ValidatedConfig,
    transport: Transport,
}

impl Open5eClient {
    /// Client against the public API with a 10 s timeout and 3 retries.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let config = config.validate()?;
        let transport = Transport::new(&config);
        tracing::debug!(
            base_url = %config.base_url,
            timeout = ?config.timeout,
            retries = config.retries,
            "open5e client created"
        );
        Ok(Self { config, transport })
    }

    /// Run `f` with a fresh client and release the client afterwards,
    /// whether `f` succeeds or not.
    pub fn scoped<T, E, F>(config: ClientConfig, f: F) -> Result<T, E>
    where
        F: FnOnce(&Open5eClient) -> Result<T, E>,
        E: From<ApiError>,
    {
        let client = Self::with_config(config)?;
        let result = f(&client);
        client.close();
        result
    }

    /// Release the underlying connection pool.
    pub fn close(self) {
        tracing::debug!(base_url = %self.config.base_url, "open5e client closed");
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn retries(&self) -> u32 {
        self.config.retries
    }

    /// Fetch spells matching the allow-listed subset of `filters`.
    pub fn spells(&self, filters: &Filters) -> Result<Value, ApiError> {
        self.query(Resource::Spells, filters)
    }

    /// Fetch monsters matching the allow-listed subset of `filters`.
    pub fn monsters(&self, filters: &Filters) -> Result<Value, ApiError> {
        self.query(Resource::Monsters, filters)
    }

    /// Fetch magic items matching the allow-listed subset of `filters`.
    pub fn magic_items(&self, filters: &Filters) -> Result<Value, ApiError> {
        self.query(Resource::MagicItems, filters)
    }

    /// Build, execute and parse a query against `resource`.
    ///
    /// Every call issues a new request; nothing is cached.
    pub fn query(&self, resource: Resource, filters: &Filters) -> Result<Value, ApiError> {
        let request = self.build_query(resource, filters)?;
        tracing::debug!(%resource, url = %request.url, "sending request");
        let response = self.transport.execute(&request)?;
        tracing::debug!(%resource, status = response.status, "response received");
        self.parse_response(response)
    }

    pub fn build_spells(&self, filters: &Filters) -> Result<HttpRequest, ApiError> {
        self.build_query(Resource::Spells, filters)
    }

    pub fn build_monsters(&self, filters: &Filters) -> Result<HttpRequest, ApiError> {
        self.build_query(Resource::Monsters, filters)
    }

    pub fn build_magic_items(&self, filters: &Filters) -> Result<HttpRequest, ApiError> {
        self.build_query(Resource::MagicItems, filters)
    }

    /// Build the GET request for `resource`, dropping filters that are not
    /// allow-listed or not set.
    pub fn build_query(
        &self,
        resource: Resource,
        filters: &Filters,
    ) -> Result<HttpRequest, ApiError> {
        let params = only_allowed(filters, resource.allowed_filters());
        let endpoint = format!("{}{}", self.config.base_url, resource.path());
        let url = if params.is_empty() {
            Url::parse(&endpoint)?
        } else {
            let pairs = params.iter().map(|(k, v)| (k.as_str(), v.to_string()));
            Url::parse_with_params(&endpoint, pairs)?
        };

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: vec![
                ("accept".to_string(), "application/json".to_string()),
                ("user-agent".to_string(), self.config.user_agent.clone()),
            ],
        })
    }

    /// Check the status, then decode the body bytes as JSON.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Map a non-2xx status to `ApiError::HttpError`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Open5eClient {
        Open5eClient::new().unwrap()
    }

    fn response(status: u16, body: impl AsRef<[u8]>) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_ref().to_vec(),
        }
    }

    #[test]
    fn spells_drop_unknown_filter() {
        let filters = Filters::new().with("level", 3).with("foo", "bar");
        let req = client().build_spells(&filters).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://api.open5e.com/v2/spells/?level=3");
    }

    #[test]
    fn monsters_drop_unknown_flag() {
        let filters = Filters::new().with("cr", "5").with("unknown_flag", true);
        let req = client().build_monsters(&filters).unwrap();
        assert_eq!(req.url, "https://api.open5e.com/v1/monsters/?cr=5");
    }

    #[test]
    fn magic_items_send_both_allowed_filters() {
        let filters = Filters::new()
            .with("rarity", "rare")
            .with("requires_attunement", true);
        let req = client().build_magic_items(&filters).unwrap();
        assert_eq!(
            req.url,
            "https://api.open5e.com/v1/magicitems/?rarity=rare&requires_attunement=true"
        );
    }

    #[test]
    fn no_filters_means_no_query_string() {
        let req = client().build_spells(&Filters::new()).unwrap();
        assert_eq!(req.url, "https://api.open5e.com/v2/spells/");
    }

    #[test]
    fn values_are_url_encoded() {
        let filters = Filters::new().with("name", "Tasha's Hideous Laughter & co");
        let req = client().build_spells(&filters).unwrap();
        let url = Url::parse(&req.url).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("name".to_string(), "Tasha's Hideous Laughter & co".to_string())]
        );
        assert!(!req.url.contains(' '));
    }

    #[test]
    fn path_is_fixed_regardless_of_filters() {
        let filters = Filters::new()
            .with("name", "../../v1/documents/")
            .with("level", 9)
            .with("cr", "30")
            .with("slug", "a/b");
        for resource in Resource::ALL {
            let req = client().build_query(resource, &filters).unwrap();
            let url = Url::parse(&req.url).unwrap();
            assert_eq!(url.host_str(), Some("api.open5e.com"));
            assert_eq!(url.path(), resource.path(), "{resource}");
        }
    }

    #[test]
    fn base_url_override_keeps_resource_path() {
        let config = ClientConfig::default().with_base_url("http://127.0.0.1:3000/");
        let client = Open5eClient::with_config(config).unwrap();
        let req = client.build_magic_items(&Filters::new()).unwrap();
        assert_eq!(req.url, "http://127.0.0.1:3000/v1/magicitems/");
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
    }

    #[test]
    fn requests_ask_for_json() {
        let req = client().build_monsters(&Filters::new()).unwrap();
        assert!(req
            .headers
            .contains(&("accept".to_string(), "application/json".to_string())));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "user-agent" && v.starts_with("open5e-core/")));
    }

    #[test]
    fn constructor_applies_settings() {
        let config = ClientConfig::default().with_timeout(2.5).with_retries(0);
        let client = Open5eClient::with_config(config).unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(2500));
        assert_eq!(client.retries(), 0);
    }

    #[test]
    fn constructor_rejects_bad_timeout() {
        let config = ClientConfig::default().with_timeout(0.0);
        let err = Open5eClient::with_config(config).unwrap_err();
        assert!(matches!(err, ApiError::ConfigError(_)));
    }

    #[test]
    fn parse_success_returns_body_verbatim() {
        let body = concat!(
            r#"{"count":1,"next":null,"previous":null,"#,
            r#""results":[{"name":"Fireball","level":3}]}"#,
        );
        let value = client().parse_response(response(200, body)).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["results"][0]["name"], "Fireball");
        assert_eq!(value, serde_json::from_str::<Value>(body).unwrap());
    }

    #[test]
    fn parse_not_found_is_http_error() {
        let err = client()
            .parse_response(response(404, r#"{"detail":"Not found."}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 404, .. }));
    }

    #[test]
    fn parse_server_error_keeps_body() {
        let err = client().parse_response(response(502, "bad gateway")).unwrap_err();
        match err {
            ApiError::HttpError { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_non_utf8_error_body_is_http_error() {
        let err = client()
            .parse_response(response(404, b"\xff\xfe not found"))
            .unwrap_err();
        match err {
            ApiError::HttpError { status, body } => {
                assert_eq!(status, 404);
                assert!(body.ends_with(" not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_non_utf8_success_body_is_decode_error() {
        let err = client().parse_response(response(200, b"\xff\xfe\x00")).unwrap_err();
        assert!(matches!(err, ApiError::DecodeError(_)));
    }

    #[test]
    fn parse_redirect_is_http_error() {
        let err = client().parse_response(response(302, "")).unwrap_err();
        assert_eq!(err.status(), Some(302));
    }

    #[test]
    fn parse_bad_json_is_decode_error() {
        let err = client().parse_response(response(200, "<html>")).unwrap_err();
        assert!(matches!(err, ApiError::DecodeError(_)));
    }

    #[test]
    fn scoped_propagates_closure_result() {
        let config = ClientConfig::default();
        let url = Open5eClient::scoped(config.clone(), |client| {
            client.build_spells(&Filters::new()).map(|r| r.url)
        })
        .unwrap();
        assert_eq!(url, "https://api.open5e.com/v2/spells/");

        let err = Open5eClient::scoped(config, |_| -> Result<(), ApiError> {
            Err(ApiError::ConfigError("boom".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::ConfigError(_)));
    }

    #[test]
    fn scoped_reports_invalid_config() {
        let config = ClientConfig::default().with_timeout(-1.0);
        let result = Open5eClient::scoped(config, |_| Ok::<_, ApiError>(()));
        assert!(matches!(result, Err(ApiError::ConfigError(_))));
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Open5eClient>();
    }
}
