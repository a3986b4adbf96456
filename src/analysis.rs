// ============================================================================
// AI Analysis Adapter : état côté UI
// ============================================================================
// Le panneau d'analyse ne connaît pas le client HTTP : il émet des
// AnalysisRequest (exécutées par le worker) et reçoit leurs résultats
//
// CONCEPT : Identifiant de requête
// - Chaque requête porte un id croissant
// - Seul le résultat de la requête courante est appliqué
// - Changer de ticker invalide la requête en cours : un résultat tardif
//   est ignoré au lieu d'écraser l'affichage
// ============================================================================

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::api::gemini::AnalysisError;
use crate::models::{AnalysisReport, InstrumentRef, IntervalCode};

/// Message unique montré à l'utilisateur en cas d'échec
pub const GENERIC_ERROR: &str = "Sorry, I was unable to analyze the chart at this time.";

/// Requête à exécuter par le worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub id: u64,
    pub ticker: InstrumentRef,
    pub interval: IntervalCode,
}

/// Dernier rapport reçu, avec la paire analysée
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedAnalysis {
    pub ticker: InstrumentRef,
    pub interval: IntervalCode,
    pub received_at: DateTime<Utc>,
    pub report: AnalysisReport,
}

impl CompletedAnalysis {
    /// Titre du panneau : paire analysée et heure de réception
    pub fn heading(&self) -> String {
        format!(
            "AI Analysis for {} · {} · {} UTC",
            self.ticker,
            self.interval.label(),
            self.received_at.format("%H:%M:%S")
        )
    }
}

#[derive(Debug, Default)]
pub struct AnalysisPanel {
    next_id: u64,
    in_flight: Option<AnalysisRequest>,
    result: Option<CompletedAnalysis>,
    error: Option<String>,
}

impl AnalysisPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Démarre une analyse pour la paire courante
    ///
    /// Retourne None si une requête est déjà en cours (un seul appel
    /// en vol du point de vue de l'UI).
    pub fn begin(&mut self, ticker: &InstrumentRef, interval: &IntervalCode) -> Option<AnalysisRequest> {
        if let Some(pending) = &self.in_flight {
            debug!(request = pending.id, "Analysis already in progress");
            return None;
        }

        self.next_id += 1;
        let request = AnalysisRequest {
            id: self.next_id,
            ticker: ticker.clone(),
            interval: interval.clone(),
        };

        self.result = None;
        self.error = None;
        self.in_flight = Some(request.clone());

        info!(request = request.id, ticker = %ticker, interval = %interval, "Analysis requested");
        Some(request)
    }

    /// Applique le résultat d'une requête
    ///
    /// Retourne false si la requête n'est plus la requête courante.
    pub fn complete(
        &mut self,
        id: u64,
        outcome: Result<AnalysisReport, AnalysisError>,
        now: DateTime<Utc>,
    ) -> bool {
        let request = match self.in_flight.take() {
            Some(request) if request.id == id => request,
            other => {
                debug!(request = id, "Discarding stale analysis result");
                self.in_flight = other;
                return false;
            }
        };

        match outcome {
            Ok(report) => {
                info!(request = id, ticker = %request.ticker, "Analysis displayed");
                self.result = Some(CompletedAnalysis {
                    ticker: request.ticker,
                    interval: request.interval,
                    received_at: now,
                    report,
                });
            }
            Err(e) => {
                error!(request = id, ticker = %request.ticker, error = %e, "Analysis failed");
                self.error = Some(GENERIC_ERROR.to_string());
            }
        }
        true
    }

    /// Efface résultat et erreur, et invalide la requête en cours
    pub fn clear(&mut self) {
        if let Some(pending) = self.in_flight.take() {
            debug!(request = pending.id, "Pending analysis superseded");
        }
        self.result = None;
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn result(&self) -> Option<&CompletedAnalysis> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextAnalysis;
    use chrono::TimeZone;

    fn aapl() -> InstrumentRef {
        InstrumentRef::parse("AAPL").unwrap()
    }

    fn report(text: &str) -> AnalysisReport {
        AnalysisReport::Text(TextAnalysis {
            analysis: text.to_string(),
        })
    }

    #[test]
    fn test_one_request_in_flight() {
        let mut panel = AnalysisPanel::new();
        let first = panel.begin(&aapl(), &IntervalCode::default()).unwrap();
        assert!(panel.is_loading());
        assert!(panel.begin(&aapl(), &IntervalCode::default()).is_none());

        assert!(panel.complete(first.id, Ok(report("Uptrend.")), Utc::now()));
        assert!(!panel.is_loading());
        let result = panel.result().unwrap();
        assert_eq!(result.report.headline(), "Uptrend.");
        assert_eq!(result.ticker, aapl());
    }

    #[test]
    fn test_heading_shows_pair_and_reception_time() {
        let mut panel = AnalysisPanel::new();
        let request = panel.begin(&aapl(), &IntervalCode::new("60")).unwrap();
        let received = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap();

        panel.complete(request.id, Ok(report("Range.")), received);
        let result = panel.result().unwrap();
        assert_eq!(result.received_at, received);
        assert_eq!(result.heading(), "AI Analysis for AAPL · 1h · 14:05:09 UTC");
    }

    #[test]
    fn test_failure_shows_generic_message() {
        let mut panel = AnalysisPanel::new();
        let request = panel.begin(&aapl(), &IntervalCode::default()).unwrap();

        panel.complete(request.id, Err(AnalysisError::MissingApiKey), Utc::now());
        assert_eq!(panel.error(), Some(GENERIC_ERROR));
        assert!(panel.result().is_none());

        // Nouvelle tentative manuelle : l'erreur est effacée
        assert!(panel.begin(&aapl(), &IntervalCode::default()).is_some());
        assert!(panel.error().is_none());
    }

    #[test]
    fn test_ticker_change_discards_late_result() {
        let mut panel = AnalysisPanel::new();
        let stale = panel.begin(&aapl(), &IntervalCode::default()).unwrap();

        panel.clear();
        assert!(!panel.is_loading());

        let tsla = InstrumentRef::parse("TSLA").unwrap();
        let current = panel.begin(&tsla, &IntervalCode::default()).unwrap();

        assert!(!panel.complete(stale.id, Ok(report("Old.")), Utc::now()));
        assert!(panel.is_loading());

        assert!(panel.complete(current.id, Ok(report("New.")), Utc::now()));
        assert_eq!(panel.result().unwrap().ticker, tsla);
    }
}
