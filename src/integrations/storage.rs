// src/integrations/storage.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::{common::error::AppError, config::settings::StorageSettings};

type HmacSha256 = Hmac<Sha256>;

/// Object storage as the services see it: presigned URLs plus note reads.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn presign_put(&self, key: &str, content_type: &str, ttl: Duration) -> Result<String, AppError>;

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AppError>;

    /// `Ok(None)` when the object does not exist.
    async fn read_text(&self, key: &str) -> Result<Option<String>, AppError>;
}

// ---
// S3 (SigV4 query-string signing)
// ---

pub struct S3Storage {
    http_client: reqwest::Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl S3Storage {
    pub fn new(settings: &StorageSettings) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http_client,
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            endpoint: settings.endpoint.as_ref().map(|e| e.trim_end_matches('/').to_string()),
            access_key_id: settings.access_key_id.clone(),
            secret_access_key: settings.secret_access_key.clone(),
            session_token: settings.session_token.clone(),
        })
    }

    // (scheme://host, path) for the object
    fn location(&self, key: &str) -> (String, String) {
        let encoded_key = uri_encode(key, false);
        match &self.endpoint {
            Some(endpoint) => (endpoint.clone(), format!("/{}/{}", self.bucket, encoded_key)),
            None if self.region == "us-east-1" => (
                format!("https://{}.s3.amazonaws.com", self.bucket),
                format!("/{encoded_key}"),
            ),
            None => (
                format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
                format!("/{encoded_key}"),
            ),
        }
    }

    /// Builds a presigned URL valid for `ttl` from `now`.
    /// `extra_headers` are signed too, so the client must send them verbatim.
    pub fn presign_at(
        &self,
        method: &str,
        key: &str,
        extra_headers: &[(&str, &str)],
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let (base, path) = self.location(key);
        let host = base
            .split("://")
            .nth(1)
            .ok_or_else(|| AppError::Storage(format!("invalid storage endpoint '{base}'")))?
            .to_string();

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/s3/aws4_request", self.region);

        // Canonical headers, sorted by lowercase name
        let mut headers: Vec<(String, String)> = extra_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        headers.push(("host".to_string(), host));
        headers.sort();
        let signed_headers = headers.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(";");
        let canonical_headers: String = headers.iter().map(|(n, v)| format!("{n}:{v}\n")).collect();

        let mut query = vec![
            ("X-Amz-Algorithm".to_string(), "AWS4-HMAC-SHA256".to_string()),
            ("X-Amz-Credential".to_string(), format!("{}/{scope}", self.access_key_id)),
            ("X-Amz-Date".to_string(), amz_date.clone()),
            ("X-Amz-Expires".to_string(), ttl.as_secs().to_string()),
            ("X-Amz-SignedHeaders".to_string(), signed_headers.clone()),
        ];
        if let Some(token) = &self.session_token {
            query.push(("X-Amz-Security-Token".to_string(), token.clone()));
        }
        query.sort();
        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{method}\n{path}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\nUNSIGNED-PAYLOAD"
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = self.signing_key(&date)?;
        let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes())?);

        Ok(format!("{base}{path}?{canonical_query}&X-Amz-Signature={signature}"))
    }

    fn signing_key(&self, date: &str) -> Result<Vec<u8>, AppError> {
        let k_date = hmac(format!("AWS4{}", self.secret_access_key).as_bytes(), date.as_bytes())?;
        let k_region = hmac(&k_date, self.region.as_bytes())?;
        let k_service = hmac(&k_region, b"s3")?;
        hmac(&k_service, b"aws4_request")
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| AppError::Storage(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// RFC 3986 encoding as SigV4 wants it. `/` survives in paths only.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn presign_put(&self, key: &str, content_type: &str, ttl: Duration) -> Result<String, AppError> {
        self.presign_at("PUT", key, &[("content-type", content_type)], ttl, Utc::now())
    }

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        self.presign_at("GET", key, &[], ttl, Utc::now())
    }

    async fn read_text(&self, key: &str) -> Result<Option<String>, AppError> {
        let url = self.presign_get(key, Duration::from_secs(60))?;
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let status = response.status();
        // S3 answers 403 for missing keys when the caller cannot list the bucket
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::FORBIDDEN {
            tracing::warn!(key = %key, status = status.as_u16(), "Note object is missing");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Storage(format!("reading {key} returned {status}")));
        }

        let body = response.text().await.map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(Some(body))
    }
}
