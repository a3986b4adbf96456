// ============================================================================
// Persistent Preference Store
// ============================================================================
// Stockage clé-valeur des préférences (tickers récents, intervalle,
// watchlist, portfolio), chaque valeur étant un document JSON
//
// CONCEPTS RUST :
// 1. Trait comme interface injectable : PreferenceStore
// 2. Trait objects : Arc<dyn PreferenceStore> partagé entre composants
// 3. Interior mutability : Mutex dans MemoryStore pour set(&self)
//
// RÈGLE : aucun échec de stockage n'est fatal
// - Les helpers load_json / save_json loggent et continuent
// - L'opération garde alors un effet uniquement en mémoire
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Clés fixes du stockage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Liste des tickers récents (array de strings, max 5)
    RecentTickers,
    /// Intervalle sélectionné (string)
    Interval,
    /// Watchlist (array de {ticker, name?, addedAt})
    Watchlist,
    /// Portfolio (array de {ticker, quantity, averagePrice, addedAt, notes?})
    Portfolio,
}

impl StoreKey {
    /// Nom de la clé tel qu'il apparaît dans le stockage
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::RecentTickers => "recentTickers",
            StoreKey::Interval => "tradingViewInterval",
            StoreKey::Watchlist => "chart-glance-watchlist",
            StoreKey::Portfolio => "chart-glance-portfolio",
        }
    }
}

/// Erreurs du stockage
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stockage désactivé ou inaccessible
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Quota dépassé lors d'une écriture
    #[error("storage quota exceeded while writing {key}")]
    QuotaExceeded { key: &'static str },

    /// Erreur d'entrée/sortie sur le fichier d'une clé
    #[error("storage I/O error on {key}: {source}")]
    Io {
        key: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Abstraction get / set / remove sur un stockage clé-valeur
///
/// CONCEPT RUST : Send + Sync
/// - Le store est partagé entre l'état de l'app et le worker thread
/// - Les implémentations doivent donc être thread-safe
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;
    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: StoreKey) -> Result<(), StoreError>;
}

/// Store partagé entre les composants
pub type SharedStore = Arc<dyn PreferenceStore>;

// ============================================================================
// FileStore : un fichier JSON par clé
// ============================================================================

/// Stockage persistant dans un répertoire (un fichier `<clé>.json` par clé)
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: StoreKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.as_str(),
                source,
            }),
        }
    }

    /// Écrit dans un fichier temporaire puis renomme
    ///
    /// CONCEPT : Écriture atomique
    /// - rename() remplace le fichier en une seule opération
    /// - Un crash en cours d'écriture ne laisse jamais un JSON tronqué
    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            key: key.as_str(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_error)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(io_error)?;
        fs::rename(&tmp, &path).map_err(io_error)?;
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.as_str(),
                source,
            }),
        }
    }
}

// ============================================================================
// MemoryStore : stockage en mémoire (tests, mode dégradé)
// ============================================================================

/// Stockage en mémoire, avec simulation optionnelle de pannes
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StoreKey, String>>,
    /// Simule un stockage désactivé (navigation privée)
    disabled: bool,
    /// Taille maximale d'une valeur, en octets
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Un store dont toutes les opérations échouent
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Un store qui refuse les valeurs plus grandes que `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Pré-remplit une clé (valeur brute, pas forcément du JSON valide)
    pub fn seeded(entries: impl IntoIterator<Item = (StoreKey, String)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
            ..Self::default()
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<StoreKey, String>>, StoreError> {
        if self.disabled {
            return Err(StoreError::Unavailable("storage is disabled".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("storage lock poisoned".to_string()))
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(StoreError::QuotaExceeded { key: key.as_str() });
            }
        }
        self.entries()?.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        self.entries()?.remove(&key);
        Ok(())
    }
}

// ============================================================================
// Helpers JSON : log-and-continue
// ============================================================================

/// Lit et désérialise une clé
///
/// Retourne None si la clé est absente, si le stockage échoue, ou si le JSON
/// est invalide. Les deux derniers cas sont loggés ; l'appelant retombe
/// alors sur sa valeur par défaut.
pub fn load_json<T: DeserializeOwned>(store: &dyn PreferenceStore, key: StoreKey) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key = key.as_str(), "No persisted value");
            return None;
        }
        Err(e) => {
            warn!(key = key.as_str(), error = %e, "Failed to read persisted value");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = key.as_str(), error = %e, "Discarding malformed persisted value");
            None
        }
    }
}

/// Sérialise et écrit une clé
///
/// Retourne false (après log) si l'écriture échoue ; l'état en mémoire de
/// l'appelant reste valide.
pub fn save_json<T: Serialize + ?Sized>(store: &dyn PreferenceStore, key: StoreKey, value: &T) -> bool {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key = key.as_str(), error = %e, "Failed to serialize value for storage");
            return false;
        }
    };

    match store.set(key, &raw) {
        Ok(()) => {
            debug!(key = key.as_str(), bytes = raw.len(), "Persisted value");
            true
        }
        Err(e) => {
            warn!(key = key.as_str(), error = %e, "Failed to persist value, keeping it in memory only");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get(StoreKey::Interval).unwrap().is_none());

        store.set(StoreKey::Interval, "\"60\"").unwrap();
        assert_eq!(store.get(StoreKey::Interval).unwrap().as_deref(), Some("\"60\""));

        store.remove(StoreKey::Interval).unwrap();
        assert!(store.get(StoreKey::Interval).unwrap().is_none());
    }

    #[test]
    fn test_disabled_store_fails_every_call() {
        let store = MemoryStore::disabled();
        assert!(matches!(store.get(StoreKey::Watchlist), Err(StoreError::Unavailable(_))));
        assert!(store.set(StoreKey::Watchlist, "[]").is_err());
        assert!(store.remove(StoreKey::Watchlist).is_err());
    }

    #[test]
    fn test_quota_exceeded() {
        let store = MemoryStore::with_quota(4);
        assert!(store.set(StoreKey::Interval, "\"D\"").is_ok());
        assert!(matches!(
            store.set(StoreKey::Portfolio, "[1,2,3,4]"),
            Err(StoreError::QuotaExceeded { key: "chart-glance-portfolio" })
        ));
    }

    #[test]
    fn test_load_json_discards_malformed_value() {
        let store = MemoryStore::seeded([(StoreKey::RecentTickers, "[\"AAPL\",".to_string())]);
        let recents: Option<Vec<String>> = load_json(&store, StoreKey::RecentTickers);
        assert!(recents.is_none());
    }

    #[test]
    fn test_save_json_reports_failure_without_panicking() {
        let store = MemoryStore::disabled();
        assert!(!save_json(&store, StoreKey::Interval, "D"));

        let store = MemoryStore::new();
        assert!(save_json(&store, StoreKey::Interval, "D"));
        let interval: Option<String> = load_json(&store, StoreKey::Interval);
        assert_eq!(interval.as_deref(), Some("D"));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("prefs"));
        assert_eq!(store.dir(), dir.path().join("prefs"));

        assert!(store.get(StoreKey::Watchlist).unwrap().is_none());
        store.set(StoreKey::Watchlist, "[]").unwrap();
        assert_eq!(store.get(StoreKey::Watchlist).unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("prefs/chart-glance-watchlist.json").exists());

        store.remove(StoreKey::Watchlist).unwrap();
        store.remove(StoreKey::Watchlist).unwrap();
        assert!(store.get(StoreKey::Watchlist).unwrap().is_none());
    }
}
