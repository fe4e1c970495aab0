//! Generic JSON client shared by every service

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Configuration;
use crate::error::{SdkError, SdkResult};

/// HTTP client bound to one service endpoint
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Configuration,
}

impl ApiClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        log::debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> SdkResult<T> {
        let response = builder.send().await?;
        decode(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> SdkResult<T> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> SdkResult<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> SdkResult<T> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> SdkResult<T> {
        self.send(self.request(Method::PATCH, path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> SdkResult<()> {
        self.send::<Value>(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> SdkResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(SdkError::api(status.as_u16(), error_message(&body)));
    }

    // Some endpoints answer 202/204 without a body
    if body.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(&body)?)
}

/// Pull a readable message out of an error body
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "description"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        "no response body".to_string()
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"message":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(error_message(r#"{"error":"not allowed"}"#), "not allowed");
        assert_eq!(error_message("plain failure\n"), "plain failure");
        assert_eq!(error_message(""), "no response body");
    }

    #[test]
    fn url_joins_endpoint_and_path() {
        let config = Configuration::new("kms").with_endpoint(Some("http://localhost:1234"));
        let client = ApiClient::new(config).unwrap();
        assert_eq!(client.url("/v1beta/projects/p"), "http://localhost:1234/v1beta/projects/p");
    }
}
