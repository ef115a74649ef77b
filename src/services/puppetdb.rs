//! PuppetDB client service
//!
//! Minimal client for the PuppetDB v4 query API, used to look up the facts of
//! the node being classified. Supports SSL/TLS with client certificates.

use anyhow::{Context, Result};
use reqwest::{Certificate, Client, Identity};
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::PuppetDbConfig;
use crate::models::Fact;
use crate::utils::{EncError, EncResult};

/// Longest response body excerpt carried in an error message
const MAX_BODY_EXCERPT: usize = 500;

/// Check that an SSL file exists and is readable, logging the result
fn check_ssl_file_access(path: &Path, file_type: &str) -> Result<usize> {
    if !path.is_file() {
        error!(
            "PuppetDB SSL ERROR: {} file does not exist or is not a file: {}",
            file_type,
            path.display()
        );
        anyhow::bail!("{} file not found: {}", file_type, path.display());
    }

    match fs::read(path) {
        Ok(contents) => {
            debug!(
                "PuppetDB SSL: {} readable ({} bytes): {}",
                file_type,
                contents.len(),
                path.display()
            );
            Ok(contents.len())
        }
        Err(e) => {
            error!(
                "PuppetDB SSL ERROR: {} file exists but cannot be read: {} - {}",
                file_type,
                path.display(),
                e
            );
            warn!(
                "Check that the user running the classifier has read access to: {}",
                path.display()
            );
            Err(e).with_context(|| format!("Cannot read {}: {}", file_type, path.display()))
        }
    }
}

/// Cut a response body down to an excerpt suitable for an error message
fn truncate_body(body: &str) -> String {
    if body.len() > MAX_BODY_EXCERPT {
        let mut end = MAX_BODY_EXCERPT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

/// Builder for AST queries
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    conditions: Vec<serde_json::Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition: ["=", field, value]
    pub fn equals(mut self, field: &str, value: &str) -> Self {
        self.conditions.push(serde_json::json!(["=", field, value]));
        self
    }

    /// The query AST, or `None` when no condition was added
    ///
    /// Several conditions are joined with "and".
    pub fn build(&self) -> Option<String> {
        match self.conditions.as_slice() {
            [] => None,
            [single] => Some(single.to_string()),
            many => {
                let mut and = vec![serde_json::Value::from("and")];
                and.extend(many.iter().cloned());
                Some(serde_json::Value::Array(and).to_string())
            }
        }
    }
}

/// PuppetDB API client
#[derive(Clone)]
pub struct PuppetDbClient {
    client: Client,
    base_url: String,
}

impl PuppetDbClient {
    /// Create a new PuppetDB client with optional SSL/TLS configuration
    pub fn new(config: &PuppetDbConfig) -> Result<Self> {
        info!("Initializing PuppetDB client for {}", config.url);

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls();

        // CA must be loaded before the identity for rustls
        if let Some(ca_path) = config.effective_ssl_ca() {
            check_ssl_file_access(ca_path, "CA certificate")?;

            let ca_cert = fs::read(ca_path)
                .with_context(|| format!("Failed to read CA certificate: {:?}", ca_path))?;
            let certs = Certificate::from_pem_bundle(&ca_cert)
                .context("Failed to parse CA certificate(s) as PEM")?;

            debug!(
                "PuppetDB SSL: Parsed {} certificate(s) from CA bundle",
                certs.len()
            );

            // Only trust the Puppet CA
            builder = builder.tls_certs_only(certs);
        }

        match (config.effective_ssl_cert(), config.effective_ssl_key()) {
            (Some(cert_path), Some(key_path)) => {
                check_ssl_file_access(cert_path, "Client certificate")?;
                check_ssl_file_access(key_path, "Client private key")?;

                let mut pem_bundle = fs::read(cert_path).with_context(|| {
                    format!("Failed to read client certificate: {:?}", cert_path)
                })?;
                let key = fs::read(key_path)
                    .with_context(|| format!("Failed to read client key: {:?}", key_path))?;
                pem_bundle.push(b'\n');
                pem_bundle.extend_from_slice(&key);

                let identity = Identity::from_pem(&pem_bundle)
                    .context("Failed to create identity from certificate and key")?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            (cert, key) => {
                warn!(
                    "Partial SSL configuration: cert={:?}, key={:?}. Both must be provided for client authentication.",
                    cert.is_some(),
                    key.is_some()
                );
            }
        }

        // Must come after the identity for rustls compatibility
        if !config.effective_ssl_verify() {
            warn!("SSL certificate verification is DISABLED - this is insecure!");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get all facts for a specific node
    ///
    /// An unknown node yields an empty list.
    pub async fn get_node_facts(&self, certname: &str) -> EncResult<Vec<Fact>> {
        // The /nodes/{certname}/facts endpoint is not supported by all PuppetDB versions
        let query = QueryBuilder::new().equals("certname", certname);
        self.query_facts(&query).await
    }

    /// Query the facts endpoint with an AST query
    pub async fn query_facts(&self, query: &QueryBuilder) -> EncResult<Vec<Fact>> {
        let url = format!("{}/pdb/query/v4/facts", self.base_url);
        let params: Vec<(&str, String)> = query.build().map(|q| ("query", q)).into_iter().collect();
        self.get(&url, &params).await
    }

    /// Internal GET request handler
    async fn get<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> EncResult<T> {
        let url = reqwest::Url::parse_with_params(url, params)
            .map_err(|e| EncError::Config(format!("Invalid PuppetDB URL {}: {}", url, e)))?;
        debug!("PuppetDB: Sending GET request to {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                error!("PuppetDB ERROR: HTTP request failed to {}: {}", url, e);
                if e.is_connect() {
                    error!("PuppetDB ERROR: Connection failed. Check the URL, firewall and SSL certificates");
                }
                if e.is_timeout() {
                    error!("PuppetDB ERROR: Request timed out. Consider increasing puppetdb.timeout");
                }

                // Walk the error chain for the root cause
                let mut current: Option<&dyn StdError> = e.source();
                while let Some(cause) = current {
                    error!("PuppetDB ERROR: Caused by: {}", cause);
                    current = cause.source();
                }
                EncError::from(e)
            })?;

        self.handle_response(response).await
    }

    /// Handle HTTP response and parse JSON
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> EncResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(EncError::FactSource(format!(
                "PuppetDB request failed with status {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            EncError::FactSource(format!(
                "Failed to parse PuppetDB response JSON ({}): {}",
                e,
                truncate_body(&body)
            ))
        })
    }
}
