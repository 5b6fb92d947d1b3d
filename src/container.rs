//! REST transport container for the Stratus API.

use serde_json::{json, Value};

use crate::error::{Error, Result};

/// Holds the endpoint and credentials shared by every request.
///
/// The container performs no authentication flow itself; the API key and
/// access token are opaque strings attached to each payload.
pub struct Container {
    end_point: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    http: reqwest::Client,
}

impl Container {
    pub fn new(end_point: impl Into<String>) -> Self {
        let end_point = end_point.into().trim_end_matches('/').to_string();
        Self {
            end_point,
            api_key: None,
            access_token: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn end_point(&self) -> &str {
        &self.end_point
    }

    /// POST an action payload to the server. The action name maps onto the
    /// request path with `:` as the separator, so `record:query` posts to
    /// `<end_point>/record/query`.
    pub async fn make_request(&self, action: &str, payload: Value) -> Result<Value> {
        let mut body = match payload {
            Value::Object(map) => map,
            _ => {
                return Err(Error::InvalidArgumentType(
                    "request payload must be an object".to_string(),
                ))
            }
        };
        body.insert("action".to_string(), json!(action));
        if let Some(api_key) = &self.api_key {
            body.insert("api_key".to_string(), json!(api_key));
        }
        if let Some(access_token) = &self.access_token {
            body.insert("access_token".to_string(), json!(access_token));
        }

        let url = format!("{}/{}", self.end_point, action.replace(':', "/"));
        let response = self
            .http
            .post(&url)
            .json(&Value::Object(body))
            .send()
            .await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown server error");
            return Err(Error::Server(message.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Server(format!("unexpected status {}", status)));
        }
        Ok(body)
    }

    /// WebSocket endpoint for the pubsub transport, mirroring the HTTP
    /// scheme. Internal clients use the `/_/pubsub` path.
    pub fn pubsub_url(&self, internal: bool) -> String {
        let base = if let Some(rest) = self.end_point.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.end_point.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", self.end_point)
        };
        let path = if internal { "/_/pubsub" } else { "/pubsub" };
        match &self.api_key {
            Some(api_key) => {
                format!("{}{}?api_key={}", base, path, urlencoding::encode(api_key))
            }
            None => format!("{}{}", base, path),
        }
    }
}
