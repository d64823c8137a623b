//! HTTP clients for the external image generator, object store and feature
//! extractor, using [`reqwest`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use atelier_core::features::ExtractedFeatures;
use atelier_core::retry::{retry, RetryPolicy};
use atelier_core::views::ViewType;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::ports::{
    ExtractionError, FeatureExtractor, GeneratedImage, GenerationRequest, GeneratorError,
    ImageGenerator, ObjectStore, UploadError, UploadOptions, UploadedImage,
};

/// Delay before the first generator retry; doubles per attempt.
const GENERATOR_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the delay between generator attempts.
const GENERATOR_MAX_DELAY: Duration = Duration::from_secs(16);

/// Build the shared HTTP client used by every collaborator.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Read the body of a non-2xx response for error messages.
async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
}

// ---------------------------------------------------------------------------
// Image generator
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    reference_image: Option<&'a str>,
    additional_reference_image: Option<&'a str>,
    structural_reference: Option<&'a str>,
    view: &'a str,
    style: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    url: Option<String>,
}

/// Client for the image generation service.
///
/// Capacity (429/503) and transport failures are retried with exponential
/// backoff within the request's retry budget. When fallback is enabled the
/// first capacity error switches the remaining attempts to the fallback
/// model.
pub struct HttpImageGenerator {
    client: reqwest::Client,
    base_url: String,
    primary_model: String,
    fallback_model: String,
}

impl HttpImageGenerator {
    pub fn new(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.image_generator_url.clone(),
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
        }
    }

    async fn call(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<GeneratedImage, GeneratorError> {
        let body = GenerateBody {
            prompt: &request.prompt,
            reference_image: request.reference_image.as_deref(),
            additional_reference_image: request.additional_reference_image.as_deref(),
            structural_reference: request.structural_reference.as_deref(),
            view: request.view.as_str(),
            style: &request.style,
            model,
        };

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(GeneratorError::Capacity(error_body(response).await));
        }
        if status.is_server_error() {
            return Err(GeneratorError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_body(response).await
            )));
        }
        if !status.is_success() {
            return Err(GeneratorError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_body(response).await
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;
        match parsed.url.filter(|u| !u.trim().is_empty()) {
            Some(url) => Ok(GeneratedImage {
                url,
                model: model.to_string(),
            }),
            None => Err(GeneratorError::EmptyResult),
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError> {
        let policy = RetryPolicy::exponential(
            request.options.retry_budget,
            GENERATOR_INITIAL_DELAY,
            GENERATOR_MAX_DELAY,
        );
        let primary = request
            .options
            .preferred_model
            .as_deref()
            .unwrap_or(&self.primary_model);
        let models = ModelSelector::new(
            primary,
            &self.fallback_model,
            request.options.fallback_enabled,
        );

        generate_with_fallback(&policy, &models, request.view, |model| async move {
            self.call(request, &model).await
        })
        .await
    }
}

/// Picks the model for each generator attempt.
///
/// Attempts start on the primary model. When fallback is enabled, the first
/// capacity error moves every later attempt to the fallback model.
#[derive(Debug)]
struct ModelSelector {
    primary: String,
    fallback: String,
    fallback_enabled: bool,
    switched: AtomicBool,
}

impl ModelSelector {
    fn new(primary: &str, fallback: &str, fallback_enabled: bool) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: fallback.to_string(),
            fallback_enabled: fallback_enabled && primary != fallback,
            switched: AtomicBool::new(false),
        }
    }

    fn current(&self) -> &str {
        if self.switched.load(Ordering::Relaxed) {
            &self.fallback
        } else {
            &self.primary
        }
    }

    /// Record an attempt's outcome. Returns `true` if it caused the switch.
    fn observe<T>(&self, result: &Result<T, GeneratorError>) -> bool {
        matches!(result, Err(GeneratorError::Capacity(_)))
            && self.fallback_enabled
            && !self.switched.swap(true, Ordering::Relaxed)
    }
}

/// Run generator attempts under `policy`, asking `models` which model each
/// attempt uses. Only retryable errors consume further attempts.
async fn generate_with_fallback<F, Fut>(
    policy: &RetryPolicy,
    models: &ModelSelector,
    view: ViewType,
    mut call: F,
) -> Result<GeneratedImage, GeneratorError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<GeneratedImage, GeneratorError>>,
{
    retry(policy, "image_generation", GeneratorError::is_retryable, |attempt| {
        let model = models.current().to_string();
        let pending = call(model.clone());
        async move {
            let result = pending.await;
            if models.observe(&result) {
                tracing::warn!(
                    view = %view,
                    attempt,
                    from = %model,
                    to = %models.fallback,
                    "Generator at capacity, switching to fallback model",
                );
            }
            result
        }
    })
    .await
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct UploadBody<'a> {
    source_url: &'a str,
    project_id: &'a str,
    preset: &'a str,
    preserve_original: bool,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    url: Option<String>,
    thumbnail_url: Option<String>,
    error: Option<String>,
}

/// Client for the image object store / CDN.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.object_store_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<UploadedImage, UploadError> {
        let body = UploadBody {
            source_url,
            project_id: &options.project_id,
            preset: &options.preset,
            preserve_original: options.preserve_original,
        };

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::Failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_body(response).await
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Failed(e.to_string()))?;
        if !parsed.success {
            return Err(UploadError::Failed(
                parsed.error.unwrap_or_else(|| "upload reported failure".to_string()),
            ));
        }
        match parsed.url.filter(|u| !u.trim().is_empty()) {
            Some(url) => Ok(UploadedImage {
                url,
                thumbnail_url: parsed.thumbnail_url,
            }),
            None => Err(UploadError::EmptyResult),
        }
    }
}

// ---------------------------------------------------------------------------
// Feature extractor
// ---------------------------------------------------------------------------

/// Client for the vision service that derives product features.
pub struct HttpFeatureExtractor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeatureExtractor {
    pub fn new(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.feature_extractor_url.clone(),
        }
    }
}

#[async_trait]
impl FeatureExtractor for HttpFeatureExtractor {
    async fn analyze(&self, image_url: &str) -> Result<ExtractedFeatures, ExtractionError> {
        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(&serde_json::json!({ "image_url": image_url }))
            .send()
            .await
            .map_err(|e| ExtractionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_body(response).await
            )));
        }

        response
            .json::<ExtractedFeatures>()
            .await
            .map_err(|e| ExtractionError(e.to_string()))
    }
}
