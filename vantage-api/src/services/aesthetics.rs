//! Aesthetic rating via the Gemini vision API
//!
//! The model is prompted as an architectural critic and asked for a fixed
//! `REVIEW:` / `SCORE:` response shape; the reply is parsed with regexes
//! rather than structured output, with a loose numeric fallback because
//! the model occasionally drops the labels.

use async_trait::async_trait;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use super::RateLimiter;

const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const USER_AGENT: &str = "Vantage/0.1.0 (https://github.com/vantage-maps/vantage)";
const RATE_LIMIT_MS: u64 = 100;

/// Rating client errors
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty model response")]
    EmptyResponse,

    #[error("Could not parse a score from model response: {0}")]
    ParseFailed(String),
}

/// A parsed aesthetic rating
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    /// Beauty score in [1, 10]
    pub score: f64,
    /// 2-3 sentence review, when the model produced one
    pub review: Option<String>,
}

/// Rates a street image's aesthetic quality
#[async_trait]
pub trait Rater: Send + Sync {
    async fn rate(&self, image: &[u8], address: &str) -> Result<Rating, RatingError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Build the critic prompt for one address
pub fn build_prompt(address: &str) -> String {
    format!(
        r#"You are an expert architectural and urban design critic evaluating the aesthetic quality of street scenes.

Analyze this street-level image of {address} and provide:

1. **Aesthetic Review** (2-3 sentences): Describe the architectural style, building condition, street environment, and overall visual appeal. Consider factors like:
   - Architectural quality and style
   - Road and pavement materials can make a surprising difference to the overall aesthetic. Brick or flagstone can greatly improve a street scene compared to concrete or asphalt.
   - Building maintenance and appearance
   - Street cleanliness and landscaping
   - Visual harmony and composition
   - Overall neighborhood character

2. **Beauty Score** (1-10): Rate the overall aesthetic appeal where:
   - 1-2: Bad (ugly, neglected, or visually jarring). Eg. industrial sites, derelict buildings
   - 3-4: Lackluster (bland, uninspiring). Eg. Grim housing blocks, dirty streets
   - 5-6: Okay (pleasant but unremarkable). Eg. Unadorned houses, bland modern developments
   - 7-8: Good (attractive, well-designed). Eg. Ornamented houses, greenery, flagstone paths
   - 9-10: Excellent (beautiful, exquisite, iconic) Eg. Ornate facades, colourful gardens, well composed street scenes

Be fair and open minded, while maintaining high standards. Don't be afraid to use the full range of the scale.

Format your response EXACTLY as:
REVIEW: [Your 2-3 sentence review here]
SCORE: [Single number from 1-10]

Example 1:
REVIEW: A well-maintained Victorian terrace with original period features and attractive brickwork. The street is clean with mature trees providing natural beauty, though some modern additions slightly detract from the historic character.
SCORE: 7

Example 2:
REVIEW: A bland residential block with integrated ground-level garages dominating the streetscape. While appearing adequately maintained, the design lacks visual interest and is devoid of notable aesthetic appeal or landscaping.
SCORE: 2"#
    )
}

/// Extract review and score from the model's text response.
///
/// The score is clamped to [1, 10]. When the labeled score is missing, any
/// standalone number in range is accepted; the review stays optional.
pub fn parse_rating(text: &str) -> Result<Rating, RatingError> {
    static REVIEW_RE: OnceLock<Regex> = OnceLock::new();
    static SCORE_RE: OnceLock<Regex> = OnceLock::new();
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();

    let review_re = REVIEW_RE
        .get_or_init(|| Regex::new(r"(?is)REVIEW:\s*(.+?)(?:SCORE:|$)").unwrap());
    let score_re =
        SCORE_RE.get_or_init(|| Regex::new(r"(?i)SCORE:\s*(\d+(?:\.\d+)?)").unwrap());
    let number_re = NUMBER_RE.get_or_init(|| Regex::new(r"\b(\d+(?:\.\d+)?)\b").unwrap());

    let review = review_re
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|r| !r.is_empty());

    let mut score = score_re
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(|s| s.clamp(1.0, 10.0));

    // Fallback: the first standalone number already in range
    if score.is_none() {
        score = number_re
            .captures_iter(text)
            .filter_map(|c| c[1].parse::<f64>().ok())
            .find(|s| (1.0..=10.0).contains(s));
    }

    match score {
        Some(score) => Ok(Rating { score, review }),
        None => Err(RatingError::ParseFailed(text.chars().take(200).collect())),
    }
}

/// Gemini vision rating client
pub struct GeminiRater {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
}

impl GeminiRater {
    pub fn new(api_key: String) -> Result<Self, RatingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RatingError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
        })
    }
}

#[async_trait]
impl Rater for GeminiRater {
    async fn rate(&self, image: &[u8], address: &str) -> Result<Rating, RatingError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, GEMINI_MODEL);
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": build_prompt(address) },
                    {
                        "inline_data": {
                            "mime_type": "image/jpeg",
                            "data": base64::engine::general_purpose::STANDARD.encode(image),
                        }
                    }
                ]
            }]
        });

        tracing::debug!(address = %address, image_bytes = image.len(), "Requesting rating");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RatingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RatingError::Api(status.as_u16(), error_text));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| RatingError::Network(e.to_string()))?;

        let text: String = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RatingError::EmptyResponse);
        }

        let rating = parse_rating(&text)?;
        tracing::info!(
            address = %address,
            score = rating.score,
            "Aesthetic rating complete"
        );

        Ok(rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_response() {
        let text = "REVIEW: A handsome Georgian terrace with original sash windows. \
                    The flagstone pavement lifts the whole scene.\nSCORE: 8";

        let rating = parse_rating(text).unwrap();
        assert_eq!(rating.score, 8.0);
        assert!(rating.review.unwrap().starts_with("A handsome Georgian terrace"));
    }

    #[test]
    fn test_parse_is_case_insensitive_and_multiline() {
        let text = "review:\nBland infill housing with no landscaping.\nIt reads as filler.\nscore: 3.5";

        let rating = parse_rating(text).unwrap();
        assert_eq!(rating.score, 3.5);
        assert_eq!(
            rating.review.as_deref(),
            Some("Bland infill housing with no landscaping.\nIt reads as filler.")
        );
    }

    #[test]
    fn test_parse_clamps_out_of_range_score() {
        let rating = parse_rating("REVIEW: Remarkable.\nSCORE: 15").unwrap();
        assert_eq!(rating.score, 10.0);

        let rating = parse_rating("REVIEW: Grim.\nSCORE: 0").unwrap();
        assert_eq!(rating.score, 1.0);
    }

    #[test]
    fn test_parse_falls_back_to_any_in_range_number() {
        let text = "I would rate this street a 7 out of 10. Pleasant but unremarkable.";

        let rating = parse_rating(text).unwrap();
        assert_eq!(rating.score, 7.0);
        assert!(rating.review.is_none());
    }

    #[test]
    fn test_parse_rejects_scoreless_response() {
        assert!(parse_rating("I cannot evaluate this image.").is_err());
        assert!(parse_rating("").is_err());
    }

    #[test]
    fn test_prompt_carries_the_response_contract() {
        let prompt = build_prompt("10 Downing Street, London");
        assert!(prompt.contains("10 Downing Street, London"));
        assert!(prompt.contains("REVIEW:"));
        assert!(prompt.contains("SCORE:"));
        assert!(prompt.contains("1-10"));
    }
}
