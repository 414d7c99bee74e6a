use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("verification service returned status {0}")]
    UpstreamStatus(reqwest::StatusCode),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
pub enum ImageQuality {
    Good,
    Poor,
}

/// Outcome of the face-match gate as seen by the caller.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FaceVerification {
    pub is_match: bool,
    pub quality: ImageQuality,
    pub reason: String,
}

impl FaceVerification {
    /// The fail-closed default used whenever the upstream service cannot
    /// be trusted: never a match, quality Poor.
    fn rejected(reason: String) -> Self {
        Self {
            is_match: false,
            quality: ImageQuality::Poor,
            reason,
        }
    }
}

/// Raw upstream response, before the local quality gate is applied.
#[derive(Debug, Deserialize)]
struct WireVerdict {
    is_match: bool,
    quality: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Local policy over the upstream verdict: a POOR (or unrecognized)
/// quality classification forces the match to false no matter what the
/// raw signal said.
fn apply_quality_gate(raw: WireVerdict) -> FaceVerification {
    let quality = match raw.quality.to_ascii_uppercase().as_str() {
        "GOOD" | "OK" => ImageQuality::Good,
        _ => ImageQuality::Poor,
    };
    let is_match = raw.is_match && quality == ImageQuality::Good;
    let reason = raw.reason.unwrap_or_else(|| {
        if is_match {
            "OK".to_string()
        } else {
            "Face does not match reference image.".to_string()
        }
    });
    FaceVerification { is_match, quality, reason }
}

/// Client for the external face-match service. The provider is opaque:
/// anything that accepts a reference image and a live capture and answers
/// `{ is_match, quality, reason }` is substitutable.
#[derive(Clone)]
pub struct FaceVerifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl FaceVerifier {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.verify_api_url.clone(),
            api_key: config.verify_api_key.clone(),
        }
    }

    /// Compare the stored reference photo against a freshly captured one.
    /// Never returns an error to the caller: any failure of the upstream
    /// service degrades to a non-match so that verification failures can
    /// never default to allowing attendance.
    pub async fn verify(&self, reference_image_url: &str, live_image: &str) -> FaceVerification {
        match self.call(reference_image_url, live_image).await {
            Ok(raw) => apply_quality_gate(raw),
            Err(e) => {
                tracing::warn!(error = %e, "Face verification unavailable, failing closed");
                FaceVerification::rejected(format!("Verification service unavailable: {e}"))
            }
        }
    }

    async fn call(
        &self,
        reference_image_url: &str,
        live_image: &str,
    ) -> Result<WireVerdict, VerifyError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "reference_image": reference_image_url,
                "live_image": live_image,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(VerifyError::UpstreamStatus(resp.status()));
        }

        Ok(resp.json::<WireVerdict>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(is_match: bool, quality: &str) -> WireVerdict {
        WireVerdict {
            is_match,
            quality: quality.to_string(),
            reason: None,
        }
    }

    #[test]
    fn poor_quality_forces_non_match() {
        // Raw signal says match; the gate must override it.
        let v = apply_quality_gate(wire(true, "POOR"));
        assert!(!v.is_match);
        assert_eq!(v.quality, ImageQuality::Poor);
    }

    #[test]
    fn unknown_quality_is_treated_as_poor() {
        let v = apply_quality_gate(wire(true, "BLURRY"));
        assert!(!v.is_match);
        assert_eq!(v.quality, ImageQuality::Poor);
    }

    #[test]
    fn good_and_ok_both_pass() {
        assert!(apply_quality_gate(wire(true, "GOOD")).is_match);
        assert!(apply_quality_gate(wire(true, "OK")).is_match);
        assert!(apply_quality_gate(wire(true, "ok")).is_match);
    }

    #[test]
    fn good_quality_non_match_stays_non_match() {
        let v = apply_quality_gate(wire(false, "GOOD"));
        assert!(!v.is_match);
        assert_eq!(v.quality, ImageQuality::Good);
        assert_eq!(v.reason, "Face does not match reference image.");
    }

    #[test]
    fn rejection_is_fail_closed() {
        let v = FaceVerification::rejected("service down".into());
        assert!(!v.is_match);
        assert_eq!(v.quality, ImageQuality::Poor);
    }
}
