//! Twilio messaging API: inbound webhook form, media metadata/content, and
//! the outbound Messages resource.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use docsnap_core::{
    InboundMessage, MediaApi, MediaLocation, OversizedMedia, PipelineError, ReplySender, SendError,
};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

/// Form-encoded body Twilio posts to the webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
    #[serde(rename = "NumMedia")]
    pub num_media: Option<String>,
    #[serde(rename = "MediaUrl0")]
    pub media_url0: Option<String>,
    #[serde(rename = "MediaContentType0")]
    pub media_content_type0: Option<String>,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl InboundForm {
    /// Convert to the pipeline's message type. A missing sender is a malformed
    /// request and cannot be answered.
    pub fn into_inbound(self) -> Result<InboundMessage, PipelineError> {
        let sender = non_empty(self.from).ok_or_else(|| {
            PipelineError::InfrastructureFault("inbound request has no From field".into())
        })?;

        let declared_media = self
            .num_media
            .as_deref()
            .and_then(|n| n.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let media = non_empty(self.media_url0);
        if declared_media > 0 && media.is_none() {
            warn!(declared_media, "NumMedia set but MediaUrl0 missing");
        }

        let mut message = InboundMessage::new(sender);
        if let Some(body) = non_empty(self.body) {
            message = message.with_body(body);
        }
        if let Some(media) = media {
            message = message.with_media(media);
        }
        if let Some(sid) = non_empty(self.message_sid) {
            message = message.with_message_id(sid);
        }
        if let Some(to) = non_empty(self.to) {
            message = message.with_origin(to);
        }
        Ok(message)
    }
}

/// Account credentials shared by the media and messaging clients.
#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

/// Media metadata document served at `<MediaUrl>.json`.
#[derive(Debug, Deserialize)]
struct MediaMetadata {
    #[serde(default)]
    content_type: Option<String>,
}

/// Media client. Credentials are only ever sent to the configured API origin;
/// media references are caller-supplied and may name any host.
pub struct TwilioMediaApi {
    client: reqwest::Client,
    api_base: Url,
    credentials: TwilioCredentials,
}

fn origin_of(url: &Url) -> (&str, Option<&str>, Option<u16>) {
    (url.scheme(), url.host_str(), url.port_or_known_default())
}

impl TwilioMediaApi {
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        credentials: TwilioCredentials,
    ) -> Result<Self> {
        let api_base = Url::parse(api_base)
            .with_context(|| format!("invalid Twilio base URL {api_base:?}"))?;
        Ok(Self {
            client,
            api_base,
            credentials,
        })
    }

    fn get(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        let target =
            Url::parse(url).with_context(|| format!("media reference {url:?} is not a URL"))?;
        if origin_of(&target) != origin_of(&self.api_base) {
            bail!(
                "media host {} is not the configured API host {}",
                target.host_str().unwrap_or("<none>"),
                self.api_base.host_str().unwrap_or("<none>")
            );
        }
        Ok(self.client.get(target).basic_auth(
            &self.credentials.account_sid,
            Some(&self.credentials.auth_token),
        ))
    }
}

#[async_trait]
impl MediaApi for TwilioMediaApi {
    async fn resolve(&self, media_ref: &str) -> Result<MediaLocation> {
        let media_url = media_ref.trim_end_matches(".json");
        let resp = self
            .get(&format!("{media_url}.json"))?
            .send()
            .await
            .context("media metadata request failed")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("media metadata returned {status}");
        }
        let meta: MediaMetadata = resp
            .json()
            .await
            .context("media metadata was not valid JSON")?;
        debug!(content_type = ?meta.content_type, "resolved media metadata");

        Ok(MediaLocation {
            url: media_url.to_string(),
            content_type: meta.content_type,
            size_bytes: None,
        })
    }

    async fn download(
        &self,
        location: &MediaLocation,
        max_bytes: u64,
    ) -> Result<(Bytes, Option<String>)> {
        let mut resp = self
            .get(&location.url)?
            .send()
            .await
            .context("media download request failed")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("media download returned {status}");
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(declared) = resp.content_length().filter(|len| *len > max_bytes) {
            return Err(OversizedMedia {
                size: declared,
                limit: max_bytes,
            }
            .into());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await.context("media download was interrupted")? {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > max_bytes {
                return Err(OversizedMedia {
                    size: body.len() as u64,
                    limit: max_bytes,
                }
                .into());
            }
        }
        Ok((body.freeze(), content_type))
    }
}

/// Error document returned by the Messages resource.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

pub struct TwilioReplySender {
    client: reqwest::Client,
    base_url: String,
    credentials: TwilioCredentials,
}

impl TwilioReplySender {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: TwilioCredentials,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.credentials.account_sid
        )
    }
}

#[async_trait]
impl ReplySender for TwilioReplySender {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String, SendError> {
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| SendError::transport(e.to_string()))?;

        let status = resp.status();
        let payload: Option<serde_json::Value> = resp.json().await.ok();

        if !status.is_success() {
            let api_error = payload
                .clone()
                .and_then(|p| serde_json::from_value::<ApiError>(p).ok());
            return Err(SendError {
                status: Some(status.as_u16()),
                code: api_error.as_ref().and_then(|e| e.code),
                message: api_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| format!("messages API returned {status}")),
                payload,
            });
        }

        payload
            .and_then(|p| serde_json::from_value::<MessageResource>(p).ok())
            .map(|m| m.sid)
            .ok_or_else(|| SendError {
                status: Some(status.as_u16()),
                code: None,
                message: "messages API response had no sid".into(),
                payload: None,
            })
    }
}
