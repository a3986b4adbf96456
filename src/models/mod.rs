// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
// ============================================================================

pub mod analysis;   // Rapports d'analyse IA (texte ou structuré)
pub mod instrument; // Référence d'instrument (AAPL, COINBASE:BTCUSD)
pub mod interval;   // Codes d'intervalle du widget (1, 60, D, W...)
pub mod portfolio;  // Positions et fusion par moyenne pondérée
pub mod recency;    // Historique des tickers récents
pub mod watchlist;  // Instruments surveillés

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use chartglance::models::instrument::InstrumentRef;
// On peut faire : use chartglance::models::InstrumentRef;
pub use analysis::{AnalysisReport, AnalysisShape, StructuredAnalysis, TextAnalysis};
pub use instrument::{InstrumentRef, POPULAR_CRYPTO, POPULAR_STOCKS};
pub use interval::IntervalCode;
pub use portfolio::{NewPosition, Portfolio, PortfolioError, Position};
pub use recency::{RecencyList, RECENT_CAPACITY};
pub use watchlist::{relative_age, Watchlist, WatchlistEntry};
