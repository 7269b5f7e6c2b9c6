//! Thin client for the console REST API
//!
//! Every endpoint answers the same JSON envelope `{code, msg, result}` with
//! `code == 0` on success. This module owns the envelope handling; the
//! playback resolver and the console's list views are built on top of it.

use crate::{Error, Result, SourceDescriptor};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

/// Standard response envelope of the console API
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i32,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

/// Playback URLs for one source, exactly one field populated
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayUrls {
    #[serde(default)]
    pub http_flv_url: Option<String>,
    #[serde(default)]
    pub rtc_url: Option<String>,
}

/// One row of the device table
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub protocol: Option<i32>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One row of the file table
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub file_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// One row of the RTMP stream table
#[derive(Debug, Clone, Deserialize)]
pub struct RtmpStreamSummary {
    pub stream: String,
    #[serde(default)]
    pub app: Option<String>,
}

/// One row of the WebRTC session table
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcSessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub video_codec: Option<String>,
    #[serde(default)]
    pub audio_codec: Option<String>,
}

/// Console API client
#[derive(Debug, Clone)]
pub struct ConsoleApi {
    http: reqwest::Client,
    base_url: String,
}

impl ConsoleApi {
    /// Create a client for the given API base URL (e.g. `http://host:8080/api`)
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    /// The configured API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn unwrap_envelope<T>(env: ApiEnvelope<T>) -> Result<T> {
        if env.code != 0 {
            return Err(Error::Api {
                code: env.code,
                msg: env.msg.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        env.result.ok_or(Error::Api {
            code: 0,
            msg: "empty result".to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut request = self.http.get(format!("{}{}", self.base_url, path));
        if !query.is_empty() {
            request = request.query(query);
        }
        let env: ApiEnvelope<T> = request.send().await?.json().await?;
        Self::unwrap_envelope(env)
    }

    /// Resolve the playback URL(s) for one source descriptor
    pub async fn play_url(&self, descriptor: &SourceDescriptor) -> Result<PlayUrls> {
        match descriptor {
            SourceDescriptor::Device { device_id } => {
                self.get_json("/device/url", &[("deviceId", device_id.as_str())])
                    .await
            }
            SourceDescriptor::File { file_id } => {
                self.get_json("/file/url", &[("fileId", file_id.as_str())])
                    .await
            }
            SourceDescriptor::RtmpStream { stream } => {
                self.get_json("/rtmp/stream/url", &[("stream", stream.as_str())])
                    .await
            }
            SourceDescriptor::WebrtcSession { session_id } => {
                self.get_json("/rtc/session/url", &[("sessionId", session_id.as_str())])
                    .await
            }
            SourceDescriptor::GbRecord {
                device_id,
                start_time,
                end_time,
                record_type,
            } => {
                // Record playback resolution is a POST with a JSON body
                let body = json!({
                    "deviceId": device_id,
                    "startTime": start_time,
                    "endTime": end_time,
                    "type": record_type,
                });
                let env: ApiEnvelope<PlayUrls> = self
                    .http
                    .post(format!("{}/gb/record/url", self.base_url))
                    .json(&body)
                    .send()
                    .await?
                    .json()
                    .await?;
                Self::unwrap_envelope(env)
            }
        }
    }

    /// List registered devices
    pub async fn devices(&self) -> Result<Vec<DeviceSummary>> {
        self.get_json("/device", &[]).await
    }

    /// List catalog files
    pub async fn files(&self) -> Result<Vec<FileSummary>> {
        self.get_json("/file", &[]).await
    }

    /// List published RTMP streams
    pub async fn rtmp_streams(&self) -> Result<Vec<RtmpStreamSummary>> {
        self.get_json("/rtmp/stream", &[]).await
    }

    /// List active WebRTC ingest sessions
    pub async fn webrtc_sessions(&self) -> Result<Vec<RtcSessionSummary>> {
        self.get_json("/rtc/session", &[]).await
    }
}
