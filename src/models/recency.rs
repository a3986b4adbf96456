// ============================================================================
// Structure : RecencyList
// ============================================================================
// Historique des derniers instruments consultés
//
// Invariants :
// - au plus RECENT_CAPACITY entrées
// - pas de doublons
// - le plus récent en premier
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::models::InstrumentRef;

/// Nombre maximum d'instruments conservés dans l'historique
pub const RECENT_CAPACITY: usize = 5;

/// Liste bornée, dédupliquée, la plus récente en tête
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecencyList(Vec<InstrumentRef>);

impl RecencyList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Reconstruit la liste depuis des entrées persistées
    ///
    /// Les entrées sont rejouées de la plus ancienne à la plus récente,
    /// ce qui rétablit les invariants même si le fichier a été modifié
    /// à la main (doublons, liste trop longue).
    pub fn from_entries(entries: Vec<InstrumentRef>) -> Self {
        let mut list = Self::new();
        for instrument in entries.into_iter().rev() {
            list.push(instrument);
        }
        list
    }

    /// Place l'instrument en tête
    ///
    /// CONCEPT RUST : retain + insert + truncate
    /// - retain() supprime l'ancienne occurrence (déplacement plutôt que doublon)
    /// - insert(0, ..) met en tête
    /// - truncate() applique la capacité
    pub fn push(&mut self, instrument: InstrumentRef) {
        self.0.retain(|existing| existing != &instrument);
        self.0.insert(0, instrument);
        self.0.truncate(RECENT_CAPACITY);
    }

    pub fn most_recent(&self) -> Option<&InstrumentRef> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentRef> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(raw: &str) -> InstrumentRef {
        InstrumentRef::parse(raw).unwrap()
    }

    #[test]
    fn test_push_moves_to_front() {
        let mut recents = RecencyList::new();
        recents.push(instrument("AAPL"));
        recents.push(instrument("TSLA"));
        recents.push(instrument("AAPL"));

        let symbols: Vec<&str> = recents.iter().map(|i| i.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "TSLA"]);
    }

    #[test]
    fn test_capacity_and_uniqueness_hold_for_any_sequence() {
        let picks = [
            "AAPL", "TSLA", "MSFT", "AAPL", "GOOGL", "AMZN", "NVDA", "TSLA", "META", "META",
            "COINBASE:BTCUSD", "AAPL",
        ];

        let mut recents = RecencyList::new();
        for pick in picks {
            recents.push(instrument(pick));

            assert!(recents.len() <= RECENT_CAPACITY);
            assert_eq!(recents.most_recent(), Some(&instrument(pick)));

            let mut seen = std::collections::HashSet::new();
            assert!(recents.iter().all(|i| seen.insert(i.clone())));
        }
        assert_eq!(recents.len(), RECENT_CAPACITY);
    }

    #[test]
    fn test_from_entries_restores_invariants() {
        let entries = vec![
            instrument("AAPL"),
            instrument("TSLA"),
            instrument("AAPL"),
            instrument("MSFT"),
            instrument("GOOGL"),
            instrument("AMZN"),
            instrument("NVDA"),
        ];

        let recents = RecencyList::from_entries(entries);
        let symbols: Vec<&str> = recents.iter().map(|i| i.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "TSLA", "MSFT", "GOOGL", "AMZN"]);
    }
}
