// ============================================================================
// Structure : InstrumentRef
// ============================================================================
// Référence vers un instrument négociable (action, crypto, ETF...)
//
// Deux formes possibles :
// - non qualifiée : "AAPL", "msft" → normalisée en majuscules
// - qualifiée par l'exchange : "COINBASE:BTCUSD" → conservée telle quelle
//
// CONCEPT RUST : Newtype pattern
// - Un tuple struct autour de String
// - Le seul moyen d'en créer une est de passer par parse()
// - Garantit que toute InstrumentRef est déjà normalisée
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Action populaires proposées par le sélecteur
pub const POPULAR_STOCKS: [&str; 5] = ["AAPL", "GOOGL", "TSLA", "AMZN", "MSFT"];

/// Cryptos populaires (qualifiées par l'exchange)
pub const POPULAR_CRYPTO: [&str; 5] = [
    "COINBASE:BTCUSD",
    "COINBASE:ETHUSD",
    "COINBASE:SOLUSD",
    "BINANCE:DOGEUSDT",
    "BINANCE:XRPUSDT",
];

/// Instrument affiché au premier lancement
pub const DEFAULT_TICKER: &str = "AAPL";

/// Noms lisibles pour les symboles connus
const DISPLAY_NAMES: [(&str, &str); 10] = [
    ("AAPL", "Apple Inc."),
    ("GOOGL", "Alphabet Inc."),
    ("TSLA", "Tesla Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("MSFT", "Microsoft Corp."),
    ("BTCUSD", "Bitcoin"),
    ("ETHUSD", "Ethereum"),
    ("SOLUSD", "Solana"),
    ("DOGEUSDT", "Dogecoin"),
    ("XRPUSDT", "Ripple XRP"),
];

/// Identifiant d'un instrument, éventuellement au format `EXCHANGE:SYMBOL`
///
/// CONCEPT RUST : #[serde(transparent)]
/// - Sérialisé comme une simple string JSON ("AAPL")
/// - Compatible avec le format persistant des listes de tickers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentRef(String);

impl InstrumentRef {
    /// Normalise une saisie brute
    ///
    /// - Supprime les espaces autour
    /// - Retourne None si la saisie est vide
    /// - Met en majuscules sauf si la forme est qualifiée (contient ':')
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.contains(':') {
            Some(Self(trimmed.to_string()))
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    /// Variante qui met toujours en majuscules (utilisée par le portfolio)
    pub fn parse_uppercase(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    /// Instrument par défaut (AAPL)
    pub fn default_ticker() -> Self {
        Self(DEFAULT_TICKER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Partie exchange ("COINBASE" pour "COINBASE:BTCUSD")
    pub fn exchange(&self) -> Option<&str> {
        self.0.split_once(':').map(|(exchange, _)| exchange)
    }

    /// Partie symbole ("BTCUSD" pour "COINBASE:BTCUSD", "AAPL" pour "AAPL")
    ///
    /// C'est aussi le libellé affiché sur les boutons du sélecteur
    pub fn symbol(&self) -> &str {
        match self.0.rsplit_once(':') {
            Some((_, symbol)) => symbol,
            None => &self.0,
        }
    }

    /// Nom lisible dérivé du symbole (fallback : le symbole lui-même)
    pub fn display_name(&self) -> String {
        let symbol = self.symbol();
        DISPLAY_NAMES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(symbol))
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| symbol.to_string())
    }
}

impl fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unqualified_is_uppercased() {
        let instrument = InstrumentRef::parse("aapl").unwrap();
        assert_eq!(instrument.as_str(), "AAPL");
        assert_eq!(instrument.exchange(), None);
    }

    #[test]
    fn test_qualified_is_kept_verbatim() {
        let instrument = InstrumentRef::parse("nasdaq:aapl").unwrap();
        assert_eq!(instrument.as_str(), "nasdaq:aapl");

        let instrument = InstrumentRef::parse("NASDAQ:AAPL").unwrap();
        assert_eq!(instrument.as_str(), "NASDAQ:AAPL");
        assert_eq!(instrument.exchange(), Some("NASDAQ"));
        assert_eq!(instrument.symbol(), "AAPL");
    }

    #[test]
    fn test_blank_input_is_rejected() {
        assert!(InstrumentRef::parse("").is_none());
        assert!(InstrumentRef::parse("   ").is_none());
        assert_eq!(InstrumentRef::parse("  tsla \n").unwrap().as_str(), "TSLA");
    }

    #[test]
    fn test_display_name() {
        let btc = InstrumentRef::parse("COINBASE:BTCUSD").unwrap();
        assert_eq!(btc.display_name(), "Bitcoin");

        let unknown = InstrumentRef::parse("nvda").unwrap();
        assert_eq!(unknown.display_name(), "NVDA");
    }

    #[test]
    fn test_serde_transparent() {
        let instrument = InstrumentRef::parse("msft").unwrap();
        assert_eq!(serde_json::to_string(&instrument).unwrap(), "\"MSFT\"");
    }
}
