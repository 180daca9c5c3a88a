use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::errors::NotifyError;

type HmacSha256 = Hmac<Sha256>;

/// Endpoint and access key parsed from an `endpoint=...;accesskey=...`
/// connection string.
#[derive(Clone)]
pub struct AcsCredentials {
    pub endpoint: Url,
    access_key: Vec<u8>,
}

impl std::fmt::Debug for AcsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcsCredentials")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl AcsCredentials {
    pub fn from_connection_string(raw: &str) -> Result<Self, NotifyError> {
        let mut endpoint = None;
        let mut access_key = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Access keys are base64 and may end in '=', so split on the first one only
            let Some((key, value)) = part.split_once('=') else {
                return Err(invalid("segment without '='"));
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim()),
                "accesskey" => access_key = Some(value.trim()),
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or_else(|| invalid("missing endpoint"))?;
        let endpoint = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
        if endpoint.host_str().is_none() {
            return Err(invalid("endpoint has no host"));
        }
        let access_key = STANDARD
            .decode(access_key.ok_or_else(|| invalid("missing accesskey"))?)
            .map_err(|_| invalid("accesskey is not valid base64"))?;

        Ok(Self {
            endpoint,
            access_key,
        })
    }

    /// Headers authenticating a request to `url` with `body`, signed at `date`.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        date: DateTime<Utc>,
    ) -> Result<Vec<(&'static str, String)>, NotifyError> {
        let content_hash = STANDARD.encode(Sha256::digest(body));
        let date = date.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let host = authority(url);

        let string_to_sign = format!(
            "{}\n{}\n{};{};{}",
            method.to_ascii_uppercase(),
            path_and_query(url),
            date,
            host,
            content_hash
        );

        let mut mac = HmacSha256::new_from_slice(&self.access_key)
            .map_err(|_| invalid("accesskey cannot be used as an HMAC key"))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(vec![
            ("x-ms-date", date),
            ("x-ms-content-sha256", content_hash),
            (
                "Authorization",
                format!(
                    "HMAC-SHA256 SignedHeaders=x-ms-date;host;x-ms-content-sha256&Signature={}",
                    signature
                ),
            ),
        ])
    }
}

fn invalid(reason: &str) -> NotifyError {
    NotifyError::Configuration(format!("CONNECTION_STRING is invalid: {}", reason))
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
