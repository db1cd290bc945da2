//! Stream URL validation

use crate::error::{BtRecoverError, UrlValidationError};
use crate::utils::{has_playlist_extension, has_scheme_and_host, is_expected_stream_mime, is_http_url};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Advisory findings from the HEAD probe; none of these fail validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeWarning {
    UnexpectedStatus(u16),
    UnexpectedContentType(String),
    MissingContentType,
}

impl std::fmt::Display for ProbeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeWarning::UnexpectedStatus(status) => {
                write!(f, "Server answered the probe with HTTP {}", status)
            }
            ProbeWarning::UnexpectedContentType(content_type) => {
                write!(f, "Unexpected content type: {}", content_type)
            }
            ProbeWarning::MissingContentType => write!(f, "Server did not report a content type"),
        }
    }
}

/// Result of a HEAD probe that reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: u16,
    pub content_type: Option<String>,
    pub warnings: Vec<ProbeWarning>,
}

impl ProbeReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A URL that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedUrl {
    pub url: Url,
    /// `None` when probing was disabled or the scheme is not HTTP
    pub probe: Option<ProbeReport>,
}

/// Checks that a URL plausibly names an m3u8 stream
#[derive(Debug, Clone)]
pub struct StreamUrlValidator {
    client: reqwest::Client,
    timeout: Duration,
    probe: bool,
}

impl StreamUrlValidator {
    /// Create a validator with a 5 second probe timeout
    pub fn new() -> Result<Self, BtRecoverError> {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Create a validator with a custom probe timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, BtRecoverError> {
        Self::build(reqwest::Client::builder(), timeout)
    }

    /// Validator that ignores proxy environment variables
    #[cfg(test)]
    fn direct(timeout: Duration) -> Result<Self, BtRecoverError> {
        Self::build(reqwest::Client::builder().no_proxy(), timeout)
    }

    fn build(builder: reqwest::ClientBuilder, timeout: Duration) -> Result<Self, BtRecoverError> {
        let client = builder
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("bt-recover/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            timeout,
            probe: true,
        })
    }

    /// Enable or disable the network probe
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Validate `url`: syntax, playlist extension, then (optionally) reachability
    pub async fn validate(&self, url: &str) -> Result<ValidatedUrl, UrlValidationError> {
        let parsed = check_syntax(url)?;

        if !self.probe {
            debug!("Network probe disabled, skipping reachability check");
            return Ok(ValidatedUrl { url: parsed, probe: None });
        }

        if !is_http_url(&parsed) {
            debug!("Scheme {} cannot be probed over HTTP, skipping", parsed.scheme());
            return Ok(ValidatedUrl { url: parsed, probe: None });
        }

        let report = self.probe_url(&parsed).await?;
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        Ok(ValidatedUrl {
            url: parsed,
            probe: Some(report),
        })
    }

    /// Issue the HEAD request; only transport failures are errors
    async fn probe_url(&self, url: &Url) -> Result<ProbeReport, UrlValidationError> {
        debug!("Probing {} (timeout {:?})", url, self.timeout);

        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| UrlValidationError::Unreachable {
                url: url.to_string(),
                reason: describe_transport_error(&e),
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut warnings = Vec::new();
        if !status.is_success() {
            warnings.push(ProbeWarning::UnexpectedStatus(status.as_u16()));
        }
        match &content_type {
            Some(ct) if !is_expected_stream_mime(ct) => {
                warnings.push(ProbeWarning::UnexpectedContentType(ct.clone()));
            }
            None => warnings.push(ProbeWarning::MissingContentType),
            _ => {}
        }

        debug!("Probe answered {} with content type {:?}", status, content_type);

        Ok(ProbeReport {
            status: status.as_u16(),
            content_type,
            warnings,
        })
    }
}

/// The offline part of validation: well-formedness and extension
pub fn check_syntax(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| UrlValidationError::Malformed(format!("{}: {}", url, e)))?;

    if !has_scheme_and_host(&parsed) {
        return Err(UrlValidationError::Malformed(format!(
            "{}: missing scheme or host",
            url
        )));
    }

    if !has_playlist_extension(&parsed) {
        return Err(UrlValidationError::WrongExtension(url.to_string()));
    }

    Ok(parsed)
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}
