// ============================================================================
// Structure : Watchlist
// ============================================================================
// Liste des instruments surveillés par l'utilisateur
//
// CONCEPTS RUST :
// 1. Composition : Watchlist contient des WatchlistEntry
// 2. Serde rename_all : le JSON persistant utilise le camelCase (addedAt)
// 3. Unicité : une seule entrée par InstrumentRef
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::InstrumentRef;

/// Un instrument dans la watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    /// Référence de l'instrument (ex: "AAPL", "COINBASE:BTCUSD")
    pub ticker: InstrumentRef,

    /// Nom lisible dérivé (ex: "Apple Inc.")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Date d'ajout
    pub added_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub fn new(ticker: InstrumentRef, added_at: DateTime<Utc>) -> Self {
        let name = Some(ticker.display_name());
        Self {
            ticker,
            name,
            added_at,
        }
    }

    /// Nom affiché : le nom dérivé, ou le symbole à défaut
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.ticker.symbol())
    }
}

/// Watchlist ordonnée, la dernière entrée ajoutée en tête
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist(Vec<WatchlistEntry>);

impl Watchlist {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Reconstruit depuis des entrées persistées : tickers re-normalisés,
    /// entrées vides ignorées, doublons éliminés (la première occurrence gagne)
    pub fn from_entries(entries: Vec<WatchlistEntry>) -> Self {
        let mut unique: Vec<WatchlistEntry> = Vec::with_capacity(entries.len());
        for mut entry in entries {
            let Some(ticker) = InstrumentRef::parse(entry.ticker.as_str()) else {
                warn!("Dropping persisted watchlist entry without ticker");
                continue;
            };
            entry.ticker = ticker;
            if !unique.iter().any(|e| e.ticker == entry.ticker) {
                unique.push(entry);
            }
        }
        Self(unique)
    }

    /// Ajoute un instrument en tête
    ///
    /// Un instrument déjà présent est déplacé en tête (une seule entrée).
    /// Retourne true si l'instrument n'était pas encore surveillé.
    pub fn add(&mut self, ticker: InstrumentRef, now: DateTime<Utc>) -> bool {
        let was_member = self.contains(&ticker);
        self.0.retain(|entry| entry.ticker != ticker);
        self.0.insert(0, WatchlistEntry::new(ticker, now));
        !was_member
    }

    /// Retire un instrument ; sans effet s'il n'est pas présent
    ///
    /// Retourne true si une entrée a été supprimée.
    pub fn remove(&mut self, ticker: &InstrumentRef) -> bool {
        let before = self.0.len();
        self.0.retain(|entry| &entry.ticker != ticker);
        self.0.len() != before
    }

    /// Appartenance (dérivée, jamais stockée)
    pub fn contains(&self, ticker: &InstrumentRef) -> bool {
        self.0.iter().any(|entry| &entry.ticker == ticker)
    }

    pub fn get(&self, index: usize) -> Option<&WatchlistEntry> {
        self.0.get(index)
    }

    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Âge relatif d'une entrée pour l'affichage
///
/// - moins d'une heure : "Just added"
/// - moins d'un jour : "5h ago"
/// - moins d'une semaine : "3d ago"
/// - sinon la date (AAAA-MM-JJ)
pub fn relative_age(added_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - added_at).num_hours();
    if hours < 1 {
        return "Just added".to_string();
    }
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{}d ago", days);
    }
    added_at.format("%Y-%m-%d").to_string()
}
