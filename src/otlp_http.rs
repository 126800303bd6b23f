use crate::sink::{ExportError, LogSink};
use crate::wire::WireEnvelope;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};

/// Credential sent with every export request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessToken {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// A backend-specific header carrying the raw token, e.g. `x-api-key`.
    Header { name: String, value: String },
}

impl AccessToken {
    fn header(&self) -> (String, String) {
        match self {
            AccessToken::Bearer(token) => {
                (AUTHORIZATION.as_str().to_string(), format!("Bearer {}", token))
            }
            AccessToken::Header { name, value } => (name.clone(), value.clone()),
        }
    }
}

/// Configuration for [`OtlpHttpSink`].
#[derive(Clone, Debug)]
pub struct OtlpHttpConfig {
    /// Full collector URL, e.g. "https://collector.example.com/v1/logs".
    pub endpoint: String,
    pub access_token: Option<AccessToken>,
}

/// OTLP/JSON over HTTP implementation of [`LogSink`].
///
/// Each envelope becomes exactly one POST. No timeout beyond the client
/// default is applied and nothing is retried.
#[derive(Clone)]
pub struct OtlpHttpSink {
    client: Client,
    config: OtlpHttpConfig,
}

impl OtlpHttpSink {
    /// Construct a new sink instance using the provided configuration.
    ///
    /// **Parameters**
    /// - `config`: [`OtlpHttpConfig`] describing the collector URL and
    ///   optional credential.
    pub fn new(config: OtlpHttpConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl LogSink for OtlpHttpSink {
    async fn send(&self, envelope: &WireEnvelope) -> Result<(), ExportError> {
        let body = envelope.to_json()?;

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len());
        if let Some(token) = &self.config.access_token {
            let (name, value) = token.header();
            request = request.header(name, value);
        }

        let resp = request.body(body).send().await?;
        if resp.status() == StatusCode::OK {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(ExportError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
