//! Client for the external classifier service.
//!
//! [`Classifier`] dispatches over the concrete backends with an enum
//! rather than a trait object, since async methods are not
//! dyn-compatible.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`HttpClassifier`] | The real service: `POST /predict`, `POST /predict-face`, `GET /health` |
//! | [`ScriptedClassifier`] | Fixed replies for tests and offline demos |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};
use wavegrid_types::{FacePrediction, FrameMessage, GesturePrediction};

/// Errors talking to the classifier service.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The request failed or the response body was not the expected JSON.
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("classifier returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// A scripted backend was told to fail.
    #[error("classifier unavailable")]
    Unavailable,
}

/// HTTP client for the classifier service.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClassifier {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        image_base64: &str,
    ) -> Result<T, ClassifierError> {
        let url = format!("{}{path}", self.base_url);
        let body = FrameMessage {
            image_base64: image_base64.to_owned(),
        };
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("classifier health check failed: {e}");
                false
            }
        }
    }
}

/// Backend returning canned predictions. `None` means "fail".
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    gesture: Option<GesturePrediction>,
    face: Option<FacePrediction>,
    calls: AtomicU64,
}

impl ScriptedClassifier {
    /// Always answer `/predict` with `prediction`; fail `/predict-face`.
    pub fn gestures(prediction: GesturePrediction) -> Self {
        Self {
            gesture: Some(prediction),
            ..Self::default()
        }
    }

    /// Always answer `/predict-face` with `prediction`; fail `/predict`.
    pub fn faces(prediction: FacePrediction) -> Self {
        Self {
            face: Some(prediction),
            ..Self::default()
        }
    }

    /// Fail every request.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Requests served so far, failures included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

/// The classifier backend used by the gateway.
#[derive(Debug)]
pub enum Classifier {
    /// The real service.
    Http(HttpClassifier),
    /// Canned replies.
    Scripted(ScriptedClassifier),
}

impl Classifier {
    /// Classify a hand gesture.
    pub async fn predict(&self, image_base64: &str) -> Result<GesturePrediction, ClassifierError> {
        let result = match self {
            Self::Http(http) => http.post("/predict", image_base64).await,
            Self::Scripted(scripted) => {
                scripted.count();
                scripted.gesture.clone().ok_or(ClassifierError::Unavailable)
            }
        };
        if let Err(e) = &result {
            warn!("gesture prediction failed: {e}");
        }
        result
    }

    /// Classify head direction and mouth state.
    pub async fn predict_face(&self, image_base64: &str) -> Result<FacePrediction, ClassifierError> {
        let result = match self {
            Self::Http(http) => http.post("/predict-face", image_base64).await,
            Self::Scripted(scripted) => {
                scripted.count();
                scripted.face.clone().ok_or(ClassifierError::Unavailable)
            }
        };
        if let Err(e) = &result {
            warn!("face prediction failed: {e}");
        }
        result
    }

    /// Whether the service reports healthy.
    pub async fn health(&self) -> bool {
        match self {
            Self::Http(http) => http.health().await,
            Self::Scripted(scripted) => scripted.gesture.is_some() || scripted.face.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fist() -> GesturePrediction {
        GesturePrediction {
            gesture_name: String::from("fist"),
            confidence: 0.9,
            latency_ms: 11.0,
            hand_detected: true,
        }
    }

    #[tokio::test]
    async fn scripted_gestures_answer_predict_only() {
        let classifier = Classifier::Scripted(ScriptedClassifier::gestures(fist()));
        assert!(classifier.predict("abc").await.is_ok());
        assert!(matches!(
            classifier.predict_face("abc").await,
            Err(ClassifierError::Unavailable)
        ));
        assert!(classifier.health().await);
        if let Classifier::Scripted(s) = &classifier {
            assert_eq!(s.calls(), 2);
        }
    }

    #[tokio::test]
    async fn failing_is_unhealthy() {
        let classifier = Classifier::Scripted(ScriptedClassifier::failing());
        assert!(classifier.predict("abc").await.is_err());
        assert!(!classifier.health().await);
    }

    #[tokio::test]
    async fn unreachable_service_is_error() {
        let http = HttpClassifier::new("http://127.0.0.1:1/", Duration::from_millis(500));
        assert!(http.is_ok());
        let Ok(http) = http else { return };
        let classifier = Classifier::Http(http);
        assert!(classifier.predict("abc").await.is_err());
        assert!(!classifier.health().await);
    }
}
