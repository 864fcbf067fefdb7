//! Downstream masking service client: job submission and status polling.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use transformat_data::{FieldDefinition, TransformType};

use crate::error::{DownstreamError, Result};

/// Maximum number of attempts made before `submit_masking_request` gives up.
const MAX_ATTEMPTS: u32 = 3;
const MIN_DELAY: Duration = Duration::from_secs(2);
const MAX_DELAY: Duration = Duration::from_secs(10);
const BODY_EXCERPT_LEN: usize = 512;

/// Connection parameters for the downstream client.
#[derive(Debug, Clone)]
pub struct DownstreamConfig {
    /// Base URL of the masking service, no trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// One `{field_name, transform_type}` pair sent as part of a masking job.
#[derive(Debug, Clone, Serialize)]
pub struct FieldConfig {
    field_name: String,
    transform_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct MaskRequest<'a> {
    task_id: &'a str,
    input_file_path: &'a str,
    output_file_path: &'a str,
    field_configs: Vec<FieldConfig>,
}

/// Downstream-reported status of a previously submitted masking job.
#[derive(Debug, Clone, Deserialize)]
pub struct MaskStatus {
    /// Service-reported status label (e.g. `"queued"`, `"complete"`).
    pub status: String,
    /// Optional free-text detail accompanying the status.
    #[serde(default)]
    pub detail: Option<String>,
}

/// Thin HTTP client for the downstream masking service.
pub struct DownstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl DownstreamClient {
    /// Build a client against `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DownstreamError::ConnectionFailed`] if the underlying HTTP
    /// client cannot be constructed (e.g. the TLS backend fails to load).
    pub fn new(config: DownstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| DownstreamError::ConnectionFailed {
                url: config.base_url.clone(),
                attempts: 0,
                source: source.into(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// Submit a masking job for `task_id`.
    ///
    /// Retried up to [`MAX_ATTEMPTS`] times with bounded exponential
    /// backoff; a non-2xx response is retried the same as a transport
    /// failure, since the downstream service may recover mid-batch.
    ///
    /// # Errors
    ///
    /// Returns [`DownstreamError::ConnectionFailed`] if every attempt fails
    /// below the HTTP layer, or [`DownstreamError::ApiError`] if the last
    /// attempt receives a non-2xx response.
    pub async fn submit_masking_request(
        &self,
        task_id: &str,
        input_file_path: &str,
        output_file_path: &str,
        field_defs: &[FieldDefinition],
    ) -> Result<()> {
        let url = format!("{}/mask/process", self.base_url);
        let body = MaskRequest {
            task_id,
            input_file_path,
            output_file_path,
            field_configs: field_defs
                .iter()
                .map(|def| FieldConfig {
                    field_name: def.field_name.clone(),
                    transform_type: transform_type_label(def.transform_type),
                })
                .collect(),
        };

        for attempt in 0..MAX_ATTEMPTS {
            let outcome = self.http.post(&url).json(&body).send().await;
            match outcome {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt + 1 == MAX_ATTEMPTS {
                        let body_excerpt = excerpt(response.text().await.unwrap_or_default());
                        return Err(DownstreamError::ApiError { status, body_excerpt });
                    }
                    tracing::warn!(task_id, url = %url, status, attempt, "masking submission rejected, retrying");
                }
                Err(source) => {
                    if attempt + 1 == MAX_ATTEMPTS {
                        return Err(DownstreamError::ConnectionFailed {
                            url,
                            attempts: MAX_ATTEMPTS,
                            source: source.into(),
                        });
                    }
                    tracing::warn!(task_id, url = %url, error = %source, attempt, "masking submission failed, retrying");
                }
            }
            tokio::time::sleep(backoff_delay(attempt)).await;
        }

        unreachable!("loop above always returns within MAX_ATTEMPTS iterations")
    }

    /// Query the status of a previously submitted masking job.
    ///
    /// # Errors
    ///
    /// Returns [`DownstreamError::NotFound`] on a 404, or
    /// [`DownstreamError::ApiError`] for any other non-2xx or
    /// unparseable response.
    pub async fn query_status(&self, task_id: &str) -> Result<MaskStatus> {
        let url = format!("{}/mask/status/{task_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| DownstreamError::ConnectionFailed {
                url: url.clone(),
                attempts: 1,
                source: source.into(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DownstreamError::NotFound {
                task_id: task_id.to_string(),
            });
        }

        let status = response.status();
        if !status.is_success() {
            let body_excerpt = excerpt(response.text().await.unwrap_or_default());
            return Err(DownstreamError::ApiError {
                status: status.as_u16(),
                body_excerpt,
            });
        }

        response.json::<MaskStatus>().await.map_err(|source| DownstreamError::ApiError {
            status: status.as_u16(),
            body_excerpt: excerpt(source.to_string()),
        })
    }
}

fn transform_type_label(kind: TransformType) -> &'static str {
    match kind {
        TransformType::Plain => "plain",
        TransformType::Mask => "mask",
        TransformType::Encrypt => "encrypt",
    }
}

fn excerpt(body: String) -> String {
    if body.len() <= BODY_EXCERPT_LEN {
        return body;
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

fn backoff_delay(attempt: u32) -> Duration {
    let scaled = MIN_DELAY.as_millis() as u64 * 2u64.saturating_pow(attempt);
    Duration::from_millis(scaled).clamp(MIN_DELAY, MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_is_bounded_between_two_and_ten_seconds() {
        assert_eq!(backoff_delay(0), Duration::from_secs(2));
        assert_eq!(backoff_delay(1), Duration::from_secs(4));
        assert_eq!(backoff_delay(2), Duration::from_secs(8));
        assert_eq!(backoff_delay(5), Duration::from_secs(10));
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "a".repeat(BODY_EXCERPT_LEN + 100);
        assert_eq!(excerpt(long).len(), BODY_EXCERPT_LEN);
    }

    #[test]
    fn excerpt_leaves_short_bodies_untouched() {
        assert_eq!(excerpt("short".to_string()), "short");
    }

    #[test]
    fn transform_type_label_matches_wire_vocabulary() {
        assert_eq!(transform_type_label(TransformType::Plain), "plain");
        assert_eq!(transform_type_label(TransformType::Mask), "mask");
        assert_eq!(transform_type_label(TransformType::Encrypt), "encrypt");
    }
}
