// ============================================================================
// Module : api
// ============================================================================
// Clients des services externes : la librairie de graphiques TradingView
// et le service d'analyse Gemini
// ============================================================================

pub mod gemini;      // Analyse IA (generateContent)
pub mod tradingview; // Script tv.js et pages d'embed du widget

// Re-export des types principaux
pub use gemini::{AnalysisError, GeminiClient};
pub use tradingview::{render_embed_page, TradingViewLibrary};
