use crate::config::Config;
use crate::errors::ApiError;
use reqwest;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing;

/// Authenticated client for the Graph Marketing API.
///
/// Every service in this crate funnels its requests through the helpers
/// here: the client owns the access token, the API version prefix, and the
/// shared response handling (success decoding and error envelope parsing).
#[derive(Clone)]
pub struct GraphApiClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl GraphApiClient {
    /// Creates a new `GraphApiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The Graph API host, e.g. `https://graph.facebook.com`.
    /// * `api_version` - Version prefix for every node path, e.g. `v19.0`.
    /// * `access_token` - The access token for authentication.
    pub fn new(
        base_url: String,
        api_version: String,
        access_token: String,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ApiError::ExternalApiError(format!("Failed to create Graph API client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
            access_token,
        })
    }

    /// Creates a client from an environment-loaded [`Config`].
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.base_url.clone(),
            config.api_version.clone(),
            config.access_token.clone(),
        )
    }

    fn node_path(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, path)
    }

    /// Builds the node URL with proper parameter encoding to prevent
    /// injection attacks. The access token always travels as a query
    /// parameter, like the platform's own tooling sends it.
    fn node_url(&self, path: &str, params: &[(String, String)]) -> Result<reqwest::Url, ApiError> {
        let mut pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.push(("access_token", self.access_token.as_str()));

        reqwest::Url::parse_with_params(&self.node_path(path), &pairs)
            .map_err(|e| ApiError::ExternalApiError(format!("Failed to build URL: {}", e)))
    }

    /// Issues a GET against a node or edge, with `params` as query string.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = self.node_url(path, params)?;
        tracing::debug!("GET {}", self.node_path(path));

        let response = self.client.get(url).send().await.map_err(|e| {
            ApiError::ExternalApiError(format!(
                "Graph API request failed: {}",
                e.without_url()
            ))
        })?;

        Self::handle_response(response).await
    }

    /// Issues a POST with `params` form-encoded in the body.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = self.node_url(path, &[])?;
        tracing::debug!("POST {}", self.node_path(path));

        let form: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ApiError::ExternalApiError(format!(
                    "Graph API request failed: {}",
                    e.without_url()
                ))
            })?;

        Self::handle_response(response).await
    }

    /// Issues a DELETE with `params` form-encoded in the body.
    ///
    /// Edge deletions (member removal, unsharing) carry payloads far too
    /// large for a query string, so parameters go in the body for DELETE
    /// just as they do for POST.
    pub async fn delete_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = self.node_url(path, &[])?;
        tracing::debug!("DELETE {}", self.node_path(path));

        let form: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let response = self
            .client
            .delete(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ApiError::ExternalApiError(format!(
                    "Graph API request failed: {}",
                    e.without_url()
                ))
            })?;

        Self::handle_response(response).await
    }

    /// Shared response handling: decode JSON on success, decode the Graph
    /// error envelope otherwise.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("Graph API returned {}: {}", status, body);
            return Err(ApiError::from_error_body(status.as_u16(), &body));
        }

        response.json::<T>().await.map_err(|e| {
            ApiError::ExternalApiError(format!(
                "Failed to parse Graph API response: {}",
                e.without_url()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GraphApiClient::new(
            "https://graph.facebook.com".to_string(),
            "v19.0".to_string(),
            "token".to_string(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_node_url_encodes_params_and_token() {
        let client = GraphApiClient::new(
            "https://graph.facebook.com/".to_string(),
            "v19.0".to_string(),
            "secret token".to_string(),
        )
        .unwrap();

        let url = client
            .node_url(
                "act_123/customaudiences",
                &[("fields".to_string(), "id,name".to_string())],
            )
            .unwrap();

        assert_eq!(url.path(), "/v19.0/act_123/customaudiences");
        assert!(url.query().unwrap().contains("fields=id%2Cname"));
        // Space in token must be percent-encoded, not truncated
        assert!(url.query().unwrap().contains("access_token=secret+token")
            || url.query().unwrap().contains("access_token=secret%20token"));
    }
}
