//! `http://` and `https://` repositories

use super::{scheme_of, TransportError, Transporter, TransporterFactory};
use crate::repository::RemoteRepository;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts applied to every HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Blocking HTTP transporter for one repository
pub struct HttpTransporter {
    client: Client,
    base_url: String,
}

impl HttpTransporter {
    pub fn new(repository: &RemoteRepository, settings: HttpSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(format!("artifact-resolver/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Unreachable {
                url: repository.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: repository.base_url().to_string(),
        })
    }
}

impl Transporter for HttpTransporter {
    fn get(&self, resource: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let url = format!("{}/{}", self.base_url, resource);

        let unreachable = |e: reqwest::Error| TransportError::Unreachable {
            url: url.clone(),
            reason: e.to_string(),
        };

        let response = self.client.get(&url).send().map_err(unreachable)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url: url.clone(),
            });
        }

        let bytes = response.bytes().map_err(unreachable)?;
        Ok(Some(bytes.to_vec()))
    }
}

/// Factory for `http://` and `https://` repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransporterFactory {
    settings: HttpSettings,
}

impl HttpTransporterFactory {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl TransporterFactory for HttpTransporterFactory {
    fn name(&self) -> &'static str {
        "http"
    }

    fn supports(&self, repository: &RemoteRepository) -> bool {
        matches!(scheme_of(&repository.url).as_deref(), Some("http" | "https"))
    }

    fn new_transporter(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Box<dyn Transporter>, TransportError> {
        Ok(Box::new(HttpTransporter::new(repository, self.settings)?))
    }
}
