use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client;
use reqwest::{Proxy, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::GenerationError;
use crate::mime::{mime_from_extension, sniff_image_mime, PNG};
use crate::{GeneratedTexture, GenerationRequest, TextureGenerator};

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-pro-image-preview:generateContent";

const API_KEY_HEADER: &str = "x-goog-api-key";
const ERROR_SNIPPET_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub endpoint: Url,
    pub proxy: Option<String>,
}

impl GenerationConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingCredential);
        }
        Ok(Self {
            api_key,
            endpoint: parse_endpoint(DEFAULT_ENDPOINT)?,
            proxy: None,
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, GenerationError> {
        self.endpoint = parse_endpoint(endpoint)?;
        Ok(self)
    }

    /// Routes every request through `proxy`. Blank values leave the client unproxied.
    pub fn with_proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        self
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, GenerationError> {
    Url::parse(endpoint.trim()).map_err(|err| GenerationError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    })
}

/// Blocking client for the Gemini `generateContent` image endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        // Generation can take minutes; the request runs until the transport gives up.
        let builder = Client::builder().timeout(None::<Duration>);
        let builder = match &config.proxy {
            Some(proxy) => {
                let proxy_config =
                    Proxy::all(proxy.as_str()).map_err(|source| GenerationError::InvalidProxy {
                        proxy: proxy.clone(),
                        source,
                    })?;
                debug!(%proxy, "routing generation requests through proxy");
                builder.proxy(proxy_config)
            }
            None => builder.no_proxy(),
        };
        let http = builder.build().map_err(GenerationError::Client)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn submit(&self, body: &GenerateContentRequest) -> Result<String, GenerationError> {
        let url = self.config.endpoint.clone();
        debug!(%url, "submitting generation request");
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .map_err(GenerationError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: describe_error_body(&body),
            });
        }

        response.text().map_err(GenerationError::Transport)
    }
}

impl TextureGenerator for GeminiClient {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedTexture, GenerationError> {
        info!(
            prompt = %request.prompt,
            reference = ?request.reference_image,
            aspect_ratio = ?request.aspect_ratio,
            resolution = ?request.resolution,
            "generating texture"
        );
        let body = build_request_body(request)?;
        let response = self.submit(&body)?;
        let image = parse_inline_image(&response)?;
        let texture = persist_image(&image, &request.output)?;
        info!(
            path = %texture.path.display(),
            mime = %texture.mime_type,
            "texture generated"
        );
        Ok(texture)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: RequestInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestInlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_modalities: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

fn build_request_body(request: &GenerationRequest) -> Result<GenerateContentRequest, GenerationError> {
    if request.prompt.trim().is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }

    let mut parts = vec![RequestPart::Text {
        text: request.prompt.clone(),
    }];

    if let Some(reference) = &request.reference_image {
        let bytes = fs::read(reference).map_err(|source| GenerationError::ReadReference {
            path: reference.clone(),
            source,
        })?;
        let mime_type = mime_from_extension(reference);
        debug!(path = %reference.display(), mime = mime_type, bytes = bytes.len(), "attaching reference image");
        parts.push(RequestPart::Inline {
            inline_data: RequestInlineData {
                mime_type,
                data: BASE64.encode(&bytes),
            },
        });
    }

    let aspect_ratio = non_empty(request.aspect_ratio.as_deref());
    let image_size = non_empty(request.resolution.as_deref());
    let image_config = (aspect_ratio.is_some() || image_size.is_some()).then(|| ImageSettings {
        aspect_ratio,
        image_size,
    });

    Ok(GenerateContentRequest {
        contents: vec![RequestContent { parts }],
        generation_config: GenerationSettings {
            response_modalities: ["TEXT", "IMAGE"],
            image_config,
        },
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason", alias = "finish_reason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Decoded image carried inline by a generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub declared_mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// Extracts the inline image from the first part of the first candidate.
pub fn parse_inline_image(body: &str) -> Result<InlineImage, GenerationError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GenerationError::NoContent { reason: None });
    };
    let reason = candidate.finish_reason;
    let inline = candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.inline_data)
        .ok_or(GenerationError::NoContent { reason })?;

    let bytes = BASE64.decode(inline.data.trim())?;
    Ok(InlineImage {
        declared_mime: inline.mime_type,
        bytes,
    })
}

/// Writes `image` to `output`, replacing any existing file.
pub fn persist_image(image: &InlineImage, output: &Path) -> Result<GeneratedTexture, GenerationError> {
    let write_error = |source| GenerationError::Write {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(output, &image.bytes).map_err(write_error)?;

    let path = std::path::absolute(output).unwrap_or_else(|_| PathBuf::from(output));
    let mime_type = sniff_image_mime(&image.bytes)
        .map(str::to_string)
        .or_else(|| image.declared_mime.clone())
        .unwrap_or_else(|| PNG.to_string());
    Ok(GeneratedTexture { path, mime_type })
}

fn describe_error_body(body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiErrorBody>(body) {
        return match api_error.error.status {
            Some(status) => format!("{} ({status})", api_error.error.message),
            None => api_error.error.message,
        };
    }
    body.chars().take(ERROR_SNIPPET_LEN).collect()
}
