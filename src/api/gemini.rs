// ============================================================================
// API Client : Gemini (generateContent)
// ============================================================================
// Envoie la paire (ticker, intervalle) au service de complétion et récupère
// un rapport conforme à la forme demandée (texte ou structuré)
//
// CONCEPT : Sortie contrainte par schéma
// - generationConfig.responseMimeType = "application/json"
// - generationConfig.responseSchema décrit la forme attendue
// - Le texte du premier candidat est donc un document JSON à désérialiser
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::models::{AnalysisReport, AnalysisShape, InstrumentRef, IntervalCode, StructuredAnalysis, TextAnalysis};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Erreurs du client d'analyse
///
/// Aucune n'est montrée telle quelle : l'UI affiche un message générique.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no candidate text")]
    EmptyResponse,

    #[error("response did not match the {shape:?} shape: {source}")]
    Malformed {
        shape: AnalysisShape,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Structures de la requête / réponse
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    shape: AnalysisShape,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>, shape: AnalysisShape) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            shape,
        }
    }

    pub fn shape(&self) -> AnalysisShape {
        self.shape
    }

    /// Demande une analyse pour la paire (ticker, intervalle)
    ///
    /// Un seul appel, aucun retry automatique.
    #[instrument(skip(self), fields(model = %self.model, shape = ?self.shape))]
    pub async fn analyze(
        &self,
        ticker: &InstrumentRef,
        interval: &IntervalCode,
    ) -> Result<AnalysisReport, AnalysisError> {
        let api_key = self.api_key.as_deref().ok_or(AnalysisError::MissingApiKey)?;

        let url = format!("{}/models/{}:generateContent", API_BASE, self.model);
        let body = build_request(ticker, interval, self.shape);

        info!("Requesting chart analysis");
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Analysis service returned error status");
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateResponse = response.json().await?;
        let report = parse_response(payload, self.shape)?;

        info!(shape = ?report.shape(), "Chart analysis received");
        Ok(report)
    }
}

/// Construit le corps de la requête generateContent
fn build_request(ticker: &InstrumentRef, interval: &IntervalCode, shape: AnalysisShape) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(prompt(ticker, interval, shape)),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(shape),
        },
    }
}

fn prompt(ticker: &InstrumentRef, interval: &IntervalCode, shape: AnalysisShape) -> String {
    let timeframe = interval.label();
    match shape {
        AnalysisShape::Text => format!(
            "Act as a financial market analyst. Write a short analysis of {ticker} \
             on the {timeframe} chart: current trend, key support and resistance, \
             and what to watch next."
        ),
        AnalysisShape::Structured => format!(
            "Act as a financial market analyst covering {ticker} on the {timeframe} chart.\n\
             Technical analysis: trend (Bullish, Bearish or Neutral), key support, key \
             resistance, notable chart patterns.\n\
             Fundamental analysis: market capitalization, P/E ratio, latest earnings summary.\n\
             News sentiment: Positive, Negative or Neutral, with a summary that starts with \
             \"Based on recent simulated news...\".\n\
             End with a concise overall summary."
        ),
    }
}

/// Schéma de sortie (sous-ensemble OpenAPI accepté par le service)
fn response_schema(shape: AnalysisShape) -> Value {
    let text = json!({ "type": "STRING" });
    match shape {
        AnalysisShape::Text => json!({
            "type": "OBJECT",
            "properties": { "analysis": text },
            "required": ["analysis"]
        }),
        AnalysisShape::Structured => json!({
            "type": "OBJECT",
            "properties": {
                "summary": text,
                "technicalAnalysis": {
                    "type": "OBJECT",
                    "properties": {
                        "trend": text,
                        "support": text,
                        "resistance": text,
                        "patterns": { "type": "ARRAY", "items": text }
                    },
                    "required": ["trend", "support", "resistance", "patterns"]
                },
                "fundamentalAnalysis": {
                    "type": "OBJECT",
                    "properties": {
                        "marketCap": text,
                        "peRatio": text,
                        "earningsSummary": text
                    },
                    "required": ["marketCap", "peRatio", "earningsSummary"]
                },
                "newsSentiment": {
                    "type": "OBJECT",
                    "properties": {
                        "sentiment": text,
                        "summary": text
                    },
                    "required": ["sentiment", "summary"]
                }
            },
            "required": ["summary", "technicalAnalysis", "fundamentalAnalysis", "newsSentiment"]
        }),
    }
}

/// Extrait le rapport du premier candidat, dans la forme attendue
fn parse_response(payload: GenerateResponse, shape: AnalysisShape) -> Result<AnalysisReport, AnalysisError> {
    let text: String = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .filter(|text: &String| !text.trim().is_empty())
        .ok_or(AnalysisError::EmptyResponse)?;

    let malformed = |source| AnalysisError::Malformed { shape, source };
    match shape {
        AnalysisShape::Text => serde_json::from_str::<TextAnalysis>(&text)
            .map(AnalysisReport::Text)
            .map_err(malformed),
        AnalysisShape::Structured => serde_json::from_str::<StructuredAnalysis>(&text)
            .map(AnalysisReport::Structured)
            .map_err(malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(text: &str) -> GenerateResponse {
        serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
        .unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let ticker = InstrumentRef::parse("AAPL").unwrap();
        let body = serde_json::to_value(build_request(&ticker, &IntervalCode::new("60"), AnalysisShape::Structured)).unwrap();

        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("AAPL"));
        assert!(prompt.contains("1h"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["properties"]["technicalAnalysis"]["required"][0],
            "trend"
        );
    }

    #[test]
    fn test_parse_structured_response() {
        let text = r#"{
            "summary": "Constructive.",
            "technicalAnalysis": {"trend": "Bullish", "support": "180", "resistance": "200", "patterns": []},
            "fundamentalAnalysis": {"marketCap": "2.9T", "peRatio": "29", "earningsSummary": "Beat."},
            "newsSentiment": {"sentiment": "Positive", "summary": "Based on recent simulated news..."}
        }"#;

        let report = parse_response(payload(text), AnalysisShape::Structured).unwrap();
        assert_eq!(report.shape(), AnalysisShape::Structured);
        assert_eq!(report.headline(), "Constructive.");
    }

    #[test]
    fn test_parse_text_response() {
        let report = parse_response(payload(r#"{"analysis": "Sideways."}"#), AnalysisShape::Text).unwrap();
        assert_eq!(report, AnalysisReport::Text(TextAnalysis { analysis: "Sideways.".into() }));
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let err = parse_response(payload(r#"{"analysis": "Sideways."}"#), AnalysisShape::Structured).unwrap_err();
        assert!(matches!(err, AnalysisError::Malformed { shape: AnalysisShape::Structured, .. }));
    }

    #[test]
    fn test_empty_candidates() {
        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(parse_response(empty, AnalysisShape::Text), Err(AnalysisError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let client = GeminiClient::new(None, "gemini-1.5-flash", AnalysisShape::Text);
        assert_eq!(client.shape(), AnalysisShape::Text);
        let result = client
            .analyze(&InstrumentRef::parse("AAPL").unwrap(), &IntervalCode::default())
            .await;
        assert!(matches!(result, Err(AnalysisError::MissingApiKey)));
    }
}
