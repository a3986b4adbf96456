// ============================================================================
// Structure : IntervalCode
// ============================================================================
// Granularité du graphique, encodée avec les tokens du widget TradingView
// ("1", "5", "15", "30", "60", "240", "D", "W")
//
// CONCEPT : Intervalle ouvert vs enum fermé
// - Le sélecteur ne propose que les codes supportés (SUPPORTED_INTERVALS)
// - Mais un code persisté est transmis tel quel au widget, même inconnu
// - D'où un newtype autour de String plutôt qu'un enum
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Codes supportés, dans l'ordre de cycle, avec leur label court
pub const SUPPORTED_INTERVALS: [(&str, &str); 8] = [
    ("1", "1m"),
    ("5", "5m"),
    ("15", "15m"),
    ("30", "30m"),
    ("60", "1h"),
    ("240", "4h"),
    ("D", "1D"),
    ("W", "1W"),
];

/// Intervalle par défaut : journalier
pub const DEFAULT_INTERVAL: &str = "D";

/// Code d'intervalle transmis au widget
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalCode(String);

impl IntervalCode {
    /// Accepte n'importe quelle string (aucune validation)
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Le code fait-il partie de l'ensemble proposé par le sélecteur ?
    pub fn is_supported(&self) -> bool {
        self.position().is_some()
    }

    /// Label court pour l'affichage ("1h", "1D"...), le code brut sinon
    pub fn label(&self) -> &str {
        match self.position() {
            Some(index) => SUPPORTED_INTERVALS[index].1,
            None => &self.0,
        }
    }

    /// Passe à l'intervalle suivant
    ///
    /// CONCEPT : Cycle d'états
    /// - 1 → 5 → 15 → 30 → 60 → 240 → D → W → 1
    /// - Un code inconnu repart sur le défaut
    pub fn next(&self) -> Self {
        match self.position() {
            Some(index) => Self::at((index + 1) % SUPPORTED_INTERVALS.len()),
            None => Self::default(),
        }
    }

    /// Passe à l'intervalle précédent (cycle inverse)
    pub fn previous(&self) -> Self {
        match self.position() {
            Some(index) => {
                let len = SUPPORTED_INTERVALS.len();
                Self::at((index + len - 1) % len)
            }
            None => Self::default(),
        }
    }

    /// Tous les codes proposés par le sélecteur
    pub fn supported() -> impl Iterator<Item = IntervalCode> {
        SUPPORTED_INTERVALS.iter().map(|(code, _)| Self::new(*code))
    }

    fn at(index: usize) -> Self {
        Self::new(SUPPORTED_INTERVALS[index].0)
    }

    fn position(&self) -> Option<usize> {
        SUPPORTED_INTERVALS
            .iter()
            .position(|(code, _)| *code == self.0)
    }
}

impl Default for IntervalCode {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl fmt::Display for IntervalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_daily() {
        assert_eq!(IntervalCode::default().as_str(), "D");
        assert_eq!(IntervalCode::default().label(), "1D");
    }

    #[test]
    fn test_cycle() {
        let weekly = IntervalCode::new("W");
        assert_eq!(weekly.next().as_str(), "1");
        assert_eq!(IntervalCode::new("1").previous().as_str(), "W");
        assert_eq!(IntervalCode::new("60").next().as_str(), "240");
    }

    #[test]
    fn test_unsupported_code_passes_through() {
        let odd = IntervalCode::new("3M");
        assert!(!odd.is_supported());
        assert_eq!(odd.as_str(), "3M");
        assert_eq!(odd.label(), "3M");
        assert_eq!(odd.next(), IntervalCode::default());
    }

    #[test]
    fn test_supported_list() {
        assert_eq!(IntervalCode::supported().count(), 8);
        assert!(IntervalCode::supported().all(|code| code.is_supported()));
    }
}
