//! Blocking HTTP plumbing shared by the OpenAI-compatible providers.
//!
//! Both the embedding engine and the chat generator talk to either the OpenAI
//! REST API or an Azure OpenAI deployment; this module hides the differences
//! in URL layout and authentication.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::domain::DomainError;
use crate::settings::{ApiFlavor, ProviderEndpoint};

/// Error payload returned by OpenAI-compatible services.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// A configured endpoint plus an HTTP agent with the endpoint's timeout.
pub struct ProviderClient {
    endpoint: ProviderEndpoint,
    api_key: String,
    agent: ureq::Agent,
}

impl ProviderClient {
    /// Builds a client, reading the API key from the environment variable the
    /// endpoint names.
    pub fn from_endpoint(endpoint: ProviderEndpoint) -> Result<Self, DomainError> {
        let api_key = std::env::var(&endpoint.api_key_env).map_err(|_| {
            DomainError::validation(format!(
                "environment variable `{}` must hold the provider API key",
                endpoint.api_key_env
            ))
        })?;
        Self::with_api_key(endpoint, api_key)
    }

    pub fn with_api_key(
        endpoint: ProviderEndpoint,
        api_key: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if endpoint.base_url.trim().is_empty() {
            return Err(DomainError::validation("provider base_url is required"));
        }
        if endpoint.model.trim().is_empty() {
            return Err(DomainError::validation("provider model is required"));
        }
        if endpoint.flavor == ApiFlavor::Azure && endpoint.api_version.is_none() {
            return Err(DomainError::validation(
                "azure endpoints require an api_version",
            ));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(endpoint.timeout_secs.max(1)))
            .build();

        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            agent,
        })
    }

    pub fn model(&self) -> &str {
        &self.endpoint.model
    }

    /// Full URL for an operation such as `embeddings` or `chat/completions`.
    pub fn operation_url(&self, operation: &str) -> String {
        let base = self.endpoint.base_url.trim_end_matches('/');
        match self.endpoint.flavor {
            ApiFlavor::OpenAi => format!("{base}/{operation}"),
            ApiFlavor::Azure => format!(
                "{base}/openai/deployments/{}/{operation}?api-version={}",
                self.endpoint.model,
                self.endpoint.api_version.as_deref().unwrap_or_default()
            ),
        }
    }

    /// Whether request bodies should name the model (Azure routes by deployment).
    pub fn sends_model(&self) -> bool {
        self.endpoint.flavor == ApiFlavor::OpenAi
    }

    pub fn post_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<T, DomainError> {
        let url = self.operation_url(operation);
        debug!(target: "ragdesk::providers", %url, "provider request");

        let request = self.agent.post(&url);
        let request = match self.endpoint.flavor {
            ApiFlavor::OpenAi => request.set("Authorization", &format!("Bearer {}", self.api_key)),
            ApiFlavor::Azure => request.set("api-key", &self.api_key),
        };

        let response = request.send_json(body).map_err(handle_http_error)?;
        response.into_json::<T>().map_err(|err| {
            DomainError::provider(format!("failed to parse {operation} response: {err}"))
        })
    }
}

/// Convert HTTP errors to provider failures.
pub fn handle_http_error(error: ureq::Error) -> DomainError {
    match error {
        ureq::Error::Status(code, response) => {
            if let Ok(envelope) = response.into_json::<ErrorEnvelope>() {
                let code_label = envelope
                    .error
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".into());
                DomainError::provider(format!(
                    "HTTP {} - {}: {}",
                    code, code_label, envelope.error.message
                ))
            } else {
                DomainError::provider(format!("HTTP error: {}", code))
            }
        }
        ureq::Error::Transport(transport) => {
            DomainError::provider(format!("Transport error: {}", transport))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(flavor: ApiFlavor) -> ProviderEndpoint {
        ProviderEndpoint {
            flavor,
            base_url: "https://example.test/v1/".into(),
            model: "text-embedding-3-small".into(),
            api_version: Some("2024-12-01-preview".into()),
            api_key_env: "RAGDESK_TEST_KEY".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn openai_urls_append_the_operation() {
        let client = ProviderClient::with_api_key(endpoint(ApiFlavor::OpenAi), "k").unwrap();
        assert_eq!(
            client.operation_url("embeddings"),
            "https://example.test/v1/embeddings"
        );
        assert!(client.sends_model());
    }

    #[test]
    fn azure_urls_route_through_the_deployment() {
        let client = ProviderClient::with_api_key(endpoint(ApiFlavor::Azure), "k").unwrap();
        assert_eq!(
            client.operation_url("chat/completions"),
            "https://example.test/v1/openai/deployments/text-embedding-3-small/chat/completions?api-version=2024-12-01-preview"
        );
        assert!(!client.sends_model());
    }

    #[test]
    fn azure_without_api_version_is_invalid() {
        let mut config = endpoint(ApiFlavor::Azure);
        config.api_version = None;
        assert!(matches!(
            ProviderClient::with_api_key(config, "k"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn missing_api_key_variable_is_reported() {
        let mut config = endpoint(ApiFlavor::OpenAi);
        config.api_key_env = "RAGDESK_TEST_KEY_THAT_IS_NEVER_SET".into();
        let err = ProviderClient::from_endpoint(config).err().unwrap();
        assert!(err.to_string().contains("RAGDESK_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn unreachable_hosts_are_provider_failures() {
        let mut config = endpoint(ApiFlavor::OpenAi);
        config.base_url = "http://127.0.0.1:9".into();
        config.timeout_secs = 1;
        let client = ProviderClient::with_api_key(config, "k").unwrap();
        let err = client
            .post_json::<serde_json::Value>("embeddings", serde_json::json!({}))
            .unwrap_err();
        assert!(err.is_provider_failure());
    }
}
