// ============================================================================
// Ticker/Interval Selection State
// ============================================================================
// Source de vérité de la paire (instrument, intervalle) affichée
//
// Toutes les sources de sélection passent par le même chemin :
// - listes populaires (actions, cryptos)
// - saisie libre
// - historique récent
// - clic depuis la watchlist ou le portfolio
//
// CONCEPT : Notification synchrone par valeur de retour
// - select_ticker() / select_interval() retournent un SelectionChange
// - L'appelant (App) le propage immédiatement au graphique, à l'analyse
//   et aux panneaux watchlist / portfolio
// ============================================================================

use tracing::{debug, info, warn};

use crate::models::{InstrumentRef, IntervalCode, RecencyList};
use crate::store::{load_json, save_json, SharedStore, StoreKey};

/// Ce qui a changé lors d'une sélection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Ticker,
    Interval,
}

/// Notification envoyée aux composants dépendants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub kind: ChangeKind,
    pub ticker: InstrumentRef,
    pub interval: IntervalCode,
    /// false si la valeur sélectionnée était déjà la valeur courante
    pub changed: bool,
}

/// État de sélection courant + historique
pub struct SelectionState {
    store: SharedStore,
    ticker: InstrumentRef,
    interval: IntervalCode,
    recents: RecencyList,
}

impl SelectionState {
    /// Restaure l'état depuis le stockage (lu une seule fois, au démarrage)
    ///
    /// - ticker : premier élément de l'historique, sinon AAPL
    /// - intervalle : code persisté, sinon "D"
    ///
    /// Les valeurs illisibles sont ignorées (loggées par load_json) :
    /// le démarrage n'est jamais bloqué.
    pub fn restore(store: SharedStore) -> Self {
        let recents = load_json::<Vec<String>>(store.as_ref(), StoreKey::RecentTickers)
            .map(|raw| {
                RecencyList::from_entries(
                    raw.iter().filter_map(|entry| InstrumentRef::parse(entry)).collect(),
                )
            })
            .unwrap_or_default();

        let ticker = recents
            .most_recent()
            .cloned()
            .unwrap_or_else(InstrumentRef::default_ticker);

        let interval = load_json::<String>(store.as_ref(), StoreKey::Interval)
            .map(IntervalCode::new)
            .unwrap_or_default();

        // Le code persisté est transmis tel quel au widget, même inconnu
        if !interval.is_supported() {
            warn!(interval = %interval, "Persisted interval is not in the supported set, passing it through");
        }

        info!(ticker = %ticker, interval = %interval, recents = recents.len(), "Selection state restored");

        Self {
            store,
            ticker,
            interval,
            recents,
        }
    }

    /// Sélectionne un ticker depuis n'importe quelle source
    ///
    /// - saisie vide (après trim) : aucun effet, retourne None
    /// - sinon : normalise, met à jour le ticker courant, pousse en tête
    ///   de l'historique et le persiste
    pub fn select_ticker(&mut self, raw: &str) -> Option<SelectionChange> {
        let Some(ticker) = InstrumentRef::parse(raw) else {
            debug!("Empty ticker selection, ignoring");
            return None;
        };

        let changed = ticker != self.ticker;
        self.ticker = ticker.clone();
        self.recents.push(ticker.clone());

        let entries: Vec<&str> = self.recents.iter().map(|i| i.as_str()).collect();
        save_json(self.store.as_ref(), StoreKey::RecentTickers, &entries);

        info!(ticker = %ticker, changed, "Ticker selected");
        Some(SelectionChange {
            kind: ChangeKind::Ticker,
            ticker,
            interval: self.interval.clone(),
            changed,
        })
    }

    /// Sélectionne un intervalle et le persiste sans validation
    pub fn select_interval(&mut self, code: &str) -> SelectionChange {
        let interval = IntervalCode::new(code);
        let changed = interval != self.interval;
        self.interval = interval.clone();

        save_json(self.store.as_ref(), StoreKey::Interval, interval.as_str());

        info!(interval = %interval, changed, "Interval selected");
        SelectionChange {
            kind: ChangeKind::Interval,
            ticker: self.ticker.clone(),
            interval,
            changed,
        }
    }

    /// Intervalle suivant dans l'ensemble proposé
    pub fn next_interval(&mut self) -> SelectionChange {
        let next = self.interval.next();
        self.select_interval(next.as_str())
    }

    /// Intervalle précédent dans l'ensemble proposé
    pub fn previous_interval(&mut self) -> SelectionChange {
        let previous = self.interval.previous();
        self.select_interval(previous.as_str())
    }

    pub fn ticker(&self) -> &InstrumentRef {
        &self.ticker
    }

    pub fn interval(&self) -> &IntervalCode {
        &self.interval
    }

    pub fn recents(&self) -> &RecencyList {
        &self.recents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PreferenceStore};
    use std::sync::Arc;

    fn fresh() -> (Arc<MemoryStore>, SelectionState) {
        let store = Arc::new(MemoryStore::new());
        let state = SelectionState::restore(store.clone());
        (store, state)
    }

    #[test]
    fn test_defaults_when_nothing_persisted() {
        let (_, state) = fresh();
        assert_eq!(state.ticker().as_str(), "AAPL");
        assert_eq!(state.interval().as_str(), "D");
        assert!(state.recents().is_empty());
    }

    #[test]
    fn test_select_ticker_normalizes_and_persists() {
        let (store, mut state) = fresh();

        let change = state.select_ticker("  tsla ").unwrap();
        assert_eq!(change.ticker.as_str(), "TSLA");
        assert_eq!(change.kind, ChangeKind::Ticker);
        assert!(change.changed);

        let change = state.select_ticker("NASDAQ:AAPL").unwrap();
        assert_eq!(change.ticker.as_str(), "NASDAQ:AAPL");

        let persisted = store.get(StoreKey::RecentTickers).unwrap().unwrap();
        assert_eq!(persisted, r#"["NASDAQ:AAPL","TSLA"]"#);
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let (store, mut state) = fresh();
        assert!(state.select_ticker("   ").is_none());
        assert_eq!(state.ticker().as_str(), "AAPL");
        assert!(store.get(StoreKey::RecentTickers).unwrap().is_none());
    }

    #[test]
    fn test_reselecting_current_ticker_reports_unchanged() {
        let (_, mut state) = fresh();
        assert!(!state.select_ticker("aapl").unwrap().changed);
        assert_eq!(state.recents().len(), 1);
    }

    #[test]
    fn test_restore_uses_most_recent_ticker_and_interval() {
        let store = Arc::new(MemoryStore::seeded([
            (StoreKey::RecentTickers, r#"["MSFT","AAPL"]"#.to_string()),
            (StoreKey::Interval, r#""60""#.to_string()),
        ]));

        let state = SelectionState::restore(store);
        assert_eq!(state.ticker().as_str(), "MSFT");
        assert_eq!(state.interval().as_str(), "60");
        assert_eq!(state.recents().len(), 2);
    }

    #[test]
    fn test_malformed_persisted_values_fall_back_to_defaults() {
        let store = Arc::new(MemoryStore::seeded([
            (StoreKey::RecentTickers, "{not json".to_string()),
            (StoreKey::Interval, "D".to_string()),
        ]));

        let state = SelectionState::restore(store);
        assert_eq!(state.ticker().as_str(), "AAPL");
        assert_eq!(state.interval().as_str(), "D");
        assert!(state.recents().is_empty());
    }

    #[test]
    fn test_unsupported_persisted_interval_passes_through() {
        let store = Arc::new(MemoryStore::seeded([(StoreKey::Interval, r#""3M""#.to_string())]));
        let state = SelectionState::restore(store);
        assert_eq!(state.interval().as_str(), "3M");
    }

    #[test]
    fn test_select_interval_accepts_any_string() {
        let (store, mut state) = fresh();
        let change = state.select_interval("42");
        assert_eq!(change.interval.as_str(), "42");
        assert_eq!(store.get(StoreKey::Interval).unwrap().as_deref(), Some(r#""42""#));

        let change = state.next_interval();
        assert_eq!(change.interval.as_str(), "D");
    }

    #[test]
    fn test_storage_failure_keeps_in_memory_effect() {
        let store = Arc::new(MemoryStore::disabled());
        let mut state = SelectionState::restore(store);

        let change = state.select_ticker("googl").unwrap();
        assert_eq!(change.ticker.as_str(), "GOOGL");
        assert_eq!(state.recents().most_recent().unwrap().as_str(), "GOOGL");

        state.select_interval("W");
        assert_eq!(state.interval().as_str(), "W");
    }
}
