//! Client for the external X-ray classification service.
//!
//! Forwards uploaded images as multipart form data and normalizes the
//! upstream's response shapes into one result type. When the upstream is
//! unreachable the caller falls back to [`mock_result`], which is the demo
//! behavior of the product.

use rand::Rng;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::InferenceConfig;
use crate::error::Result;
use crate::history::ClassProbabilities;

/// An image received from a client, ready to forward upstream.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Original file name
    pub name: String,
    /// MIME type reported by the uploader
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// Normalized classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub classification: String,
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
    pub gradcam_url: Option<String>,
    pub attention_url: Option<String>,
}

/// Raw upstream response. Field names vary between service versions, so
/// every field is optional and aliased.
#[derive(Debug, Deserialize)]
struct RawPrediction {
    #[serde(alias = "label")]
    classification: Option<String>,
    #[serde(alias = "score")]
    confidence: Option<f64>,
    probabilities: Option<RawProbabilities>,
    prob_normal: Option<f64>,
    prob_benign: Option<f64>,
    prob_malignant: Option<f64>,
    #[serde(alias = "gradcam")]
    gradcam_url: Option<String>,
    #[serde(alias = "attention")]
    attention_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProbabilities {
    normal: Option<f64>,
    benign: Option<f64>,
    malignant: Option<f64>,
}

/// HTTP client for the inference service.
pub struct InferenceClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl InferenceClient {
    /// Build a client from configuration.
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Forward an image to the inference service and normalize the response.
    pub async fn classify(&self, image: &ImageUpload) -> Result<InferenceResult> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.name.clone())
            .mime_str(&image.content_type)?;
        let form = Form::new().part("image", part);

        let mut request = self.http.post(&self.url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let raw: RawPrediction = response.json().await?;

        debug!(url = %self.url, "Inference service responded");
        Ok(self.normalize(raw))
    }

    /// Collapse the upstream's field variants into the normalized shape.
    fn normalize(&self, raw: RawPrediction) -> InferenceResult {
        let nested = raw.probabilities.as_ref();
        let probabilities = ClassProbabilities {
            normal: nested
                .and_then(|p| p.normal)
                .or(raw.prob_normal)
                .unwrap_or(0.0),
            benign: nested
                .and_then(|p| p.benign)
                .or(raw.prob_benign)
                .unwrap_or(0.0),
            malignant: nested
                .and_then(|p| p.malignant)
                .or(raw.prob_malignant)
                .unwrap_or(0.0),
        };

        InferenceResult {
            classification: raw.classification.unwrap_or_else(|| "unknown".to_string()),
            confidence: raw.confidence.unwrap_or(0.0),
            probabilities,
            gradcam_url: self.resolve_visualization_url(raw.gradcam_url),
            attention_url: self.resolve_visualization_url(raw.attention_url),
        }
    }

    /// Resolve a relative visualization path against the upstream origin.
    fn resolve_visualization_url(&self, raw: Option<String>) -> Option<String> {
        let raw = raw?;
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Some(raw);
        }
        if !raw.starts_with('/') {
            return Some(raw);
        }
        match reqwest::Url::parse(&self.url) {
            Ok(base) => Some(format!("{}{}", base.origin().ascii_serialization(), raw)),
            Err(_) => Some(raw),
        }
    }
}

/// Generate a plausible classification for demo use when the inference
/// service is unavailable.
pub fn mock_result() -> InferenceResult {
    let mut rng = rand::thread_rng();

    let classes = ["normal", "benign", "malignant"];
    let classification = classes[rng.gen_range(0..classes.len())];
    let confidence = rng.gen_range(0.7..0.95);

    let class_prob = |class: &str, rng: &mut rand::rngs::ThreadRng| {
        if class == classification {
            confidence
        } else {
            rng.gen_range(0.0..0.2)
        }
    };
    let mut probabilities = ClassProbabilities {
        normal: class_prob("normal", &mut rng),
        benign: class_prob("benign", &mut rng),
        malignant: class_prob("malignant", &mut rng),
    };

    let total = probabilities.normal + probabilities.benign + probabilities.malignant;
    probabilities.normal /= total;
    probabilities.benign /= total;
    probabilities.malignant /= total;

    InferenceResult {
        classification: classification.to_string(),
        confidence,
        probabilities,
        gradcam_url: None,
        attention_url: None,
    }
}
