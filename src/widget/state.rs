// ============================================================================
// État du cycle de vie du widget
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul état actif à la fois
// - Le compilateur force à gérer tous les cas
//
//   Uninitialized ──► ScriptLoading ──► ScriptReady ──► WidgetInitializing
//        │                  │                ▲                 │
//        └──► ScriptReady   ▼                │                 ├──► WidgetReady
//                    ScriptLoadFailed        └── (re)config ───┤
//                                                              └──► WidgetTimedOut
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::models::{InstrumentRef, IntervalCode};

/// États du gestionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Monté, disponibilité du script pas encore vérifiée
    Uninitialized,
    /// Script en cours de chargement (injecté par nous ou par un autre)
    ScriptLoading,
    /// Script disponible, le widget va être (re)construit
    ScriptReady,
    /// Échec ou timeout du chargement du script
    ScriptLoadFailed,
    /// Widget créé, en attente du signal de rendu
    WidgetInitializing,
    /// Widget rendu pour la paire (instrument, intervalle) courante
    WidgetReady,
    /// Aucun signal de rendu avant la fin du délai
    WidgetTimedOut,
    /// Création impossible (conteneur absent, librairie absente...)
    WidgetFailed,
}

impl LifecycleState {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            LifecycleState::ScriptLoadFailed
                | LifecycleState::WidgetTimedOut
                | LifecycleState::WidgetFailed
        )
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            LifecycleState::Uninitialized
                | LifecycleState::ScriptLoading
                | LifecycleState::ScriptReady
                | LifecycleState::WidgetInitializing
        )
    }
}

/// Erreurs présentées à l'utilisateur (toutes récupérables par retry)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("Chart container not found")]
    ContainerNotFound,

    #[error("Chart library not loaded")]
    LibraryNotLoaded,

    #[error("Failed to load chart script: {0}")]
    ScriptLoad(String),

    #[error("Timed out while loading chart script")]
    LoadTimeout,

    #[error("Chart did not become ready in time")]
    ReadinessTimeout,

    #[error("Failed to create chart widget: {0}")]
    Creation(String),
}

/// Délais et budget de retry
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Intervalle de polling quand un chargement externe est déjà en cours
    pub poll_interval: Duration,
    /// Attente maximale du script
    pub script_timeout: Duration,
    /// Attente maximale du signal de rendu
    pub ready_timeout: Duration,
    /// Intervalle d'observation du conteneur
    pub surface_probe_interval: Duration,
    /// Nombre de retries autorisés
    pub max_retries: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            script_timeout: Duration::from_secs(15),
            ready_timeout: Duration::from_secs(10),
            surface_probe_interval: Duration::from_millis(250),
            max_retries: 3,
        }
    }
}

/// Instantané publié à chaque transition
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetStatus {
    pub state: LifecycleState,
    pub ticker: InstrumentRef,
    pub interval: IntervalCode,
    /// Génération du widget courant (0 avant la première création)
    pub generation: u64,
    pub error: Option<WidgetError>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl WidgetStatus {
    pub fn initial(ticker: InstrumentRef, interval: IntervalCode, max_retries: u32) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            ticker,
            interval,
            generation: 0,
            error: None,
            retry_count: 0,
            max_retries,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::WidgetReady
    }

    /// Un retry est-il encore proposé ?
    pub fn can_retry(&self) -> bool {
        self.error.is_some() && self.retry_count < self.max_retries
    }

    pub fn retries_exhausted(&self) -> bool {
        self.error.is_some() && self.retry_count >= self.max_retries
    }

    /// Message affiché dans le panneau du graphique
    pub fn message(&self) -> String {
        match &self.error {
            Some(error) if self.retries_exhausted() => format!(
                "{}. Retries exhausted ({}/{}), please restart the application.",
                error, self.retry_count, self.max_retries
            ),
            Some(error) => format!(
                "{}. Press [r] to retry ({}/{} used).",
                error, self.retry_count, self.max_retries
            ),
            None if self.is_ready() => format!("Chart ready: {} · {}", self.ticker, self.interval.label()),
            None => "Loading chart...".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> WidgetStatus {
        WidgetStatus::initial(
            InstrumentRef::parse("AAPL").unwrap(),
            IntervalCode::default(),
            3,
        )
    }

    #[test]
    fn test_initial_status_is_loading() {
        let status = status();
        assert!(status.is_loading());
        assert!(!status.can_retry());
        assert_eq!(status.message(), "Loading chart...");
    }

    #[test]
    fn test_retry_budget() {
        let mut status = status();
        status.state = LifecycleState::ScriptLoadFailed;
        status.error = Some(WidgetError::LoadTimeout);
        assert!(status.can_retry());

        status.retry_count = 3;
        assert!(!status.can_retry());
        assert!(status.retries_exhausted());
        assert!(status.message().contains("Retries exhausted"));
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let messages = [
            WidgetError::ContainerNotFound.to_string(),
            WidgetError::LibraryNotLoaded.to_string(),
            WidgetError::ScriptLoad("404".into()).to_string(),
            WidgetError::LoadTimeout.to_string(),
            WidgetError::ReadinessTimeout.to_string(),
        ];
        let unique: std::collections::HashSet<_> = messages.iter().collect();
        assert_eq!(unique.len(), messages.len());
    }
}
