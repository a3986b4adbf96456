// ============================================================================
// Structures : AnalysisReport
// ============================================================================
// Résultat renvoyé par le service d'analyse IA
//
// Deux formes cibles selon la configuration :
// - Text : un seul champ texte libre
// - Structured : résumé + sections technique / fondamentale / news
// ============================================================================

use serde::{Deserialize, Serialize};

/// Forme de réponse demandée au service de complétion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisShape {
    /// `{ "analysis": "..." }`
    Text,
    /// `{ "summary": ..., "technicalAnalysis": ..., ... }`
    #[default]
    Structured,
}

impl AnalysisShape {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "structured" => Some(Self::Structured),
            _ => None,
        }
    }
}

/// Réponse texte libre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    /// Bullish, Bearish, Neutral...
    pub trend: String,
    pub support: String,
    pub resistance: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalAnalysis {
    pub market_cap: String,
    pub pe_ratio: String,
    pub earnings_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentiment {
    /// Positive, Negative, Neutral
    pub sentiment: String,
    pub summary: String,
}

/// Réponse structurée en plusieurs sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAnalysis {
    pub summary: String,
    pub technical_analysis: TechnicalAnalysis,
    pub fundamental_analysis: FundamentalAnalysis,
    pub news_sentiment: NewsSentiment,
}

/// Les deux formes valides d'un rapport
///
/// CONCEPT RUST : #[serde(untagged)]
/// - Pas de champ discriminant dans le JSON
/// - Serde essaie chaque variant dans l'ordre
/// - Sérialisé, un rapport garde exactement la forme reçue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Structured(StructuredAnalysis),
    Text(TextAnalysis),
}

impl AnalysisReport {
    pub fn shape(&self) -> AnalysisShape {
        match self {
            AnalysisReport::Structured(_) => AnalysisShape::Structured,
            AnalysisReport::Text(_) => AnalysisShape::Text,
        }
    }

    /// Résumé court pour l'en-tête du panneau
    pub fn headline(&self) -> &str {
        match self {
            AnalysisReport::Structured(report) => &report.summary,
            AnalysisReport::Text(report) => &report.analysis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_shape_parses() {
        let json = r#"{
            "summary": "Momentum intact.",
            "technicalAnalysis": {"trend": "Bullish", "support": "180", "resistance": "200", "patterns": ["Cup and Handle"]},
            "fundamentalAnalysis": {"marketCap": "2.9T", "peRatio": "29", "earningsSummary": "Beat estimates."},
            "newsSentiment": {"sentiment": "Positive", "summary": "Based on recent simulated news..."}
        }"#;

        let report: AnalysisReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.shape(), AnalysisShape::Structured);
        assert_eq!(report.headline(), "Momentum intact.");
    }

    #[test]
    fn test_text_shape_parses() {
        let report: AnalysisReport =
            serde_json::from_str(r#"{"analysis": "Range-bound."}"#).unwrap();
        assert_eq!(report.shape(), AnalysisShape::Text);
        assert_eq!(report.headline(), "Range-bound.");
    }

    #[test]
    fn test_shape_parse() {
        assert_eq!(AnalysisShape::parse("TEXT"), Some(AnalysisShape::Text));
        assert_eq!(AnalysisShape::parse(" structured "), Some(AnalysisShape::Structured));
        assert_eq!(AnalysisShape::parse("yaml"), None);
        assert_eq!(AnalysisShape::default(), AnalysisShape::Structured);
    }
}
