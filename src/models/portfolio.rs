// ============================================================================
// Structure : Portfolio
// ============================================================================
// Positions détenues par l'utilisateur (quantité + prix moyen)
//
// CONCEPT : Fusion par moyenne pondérée
// Ajouter une position sur un ticker déjà détenu ne crée pas de doublon :
//   new_avg = (old_qty * old_avg + add_qty * add_price) / (old_qty + add_qty)
//   new_qty = old_qty + add_qty
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::InstrumentRef;

/// Erreurs de saisie d'une position
#[derive(Debug, Error, PartialEq)]
pub enum PortfolioError {
    #[error("ticker is required")]
    MissingTicker,

    #[error("quantity must be a positive number, got {0}")]
    InvalidQuantity(f64),

    #[error("average price must be a positive number, got {0}")]
    InvalidPrice(f64),
}

/// Une position du portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Référence de l'instrument, toujours en majuscules
    pub ticker: InstrumentRef,

    /// Quantité détenue (réel strictement positif)
    pub quantity: f64,

    /// Prix moyen d'acquisition (réel strictement positif)
    pub average_price: f64,

    /// Date d'ajout de la position
    pub added_at: DateTime<Utc>,

    /// Note libre optionnelle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Position {
    /// Valeur de la position au prix moyen
    pub fn value(&self) -> f64 {
        self.quantity * self.average_price
    }
}

/// Saisie utilisateur pour une nouvelle position (avant validation)
#[derive(Debug, Clone, Default)]
pub struct NewPosition {
    pub ticker: String,
    pub quantity: f64,
    pub average_price: f64,
    pub notes: Option<String>,
}

impl NewPosition {
    /// Parse une saisie du type "AAPL 10 185.5 long terme"
    ///
    /// Les mots après le prix forment la note.
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let ticker = parts.next()?.to_string();
        let quantity = parts.next()?.parse().ok()?;
        let average_price = parts.next()?.parse().ok()?;
        let notes: Vec<&str> = parts.collect();

        Some(Self {
            ticker,
            quantity,
            average_price,
            notes: if notes.is_empty() {
                None
            } else {
                Some(notes.join(" "))
            },
        })
    }
}

/// Portfolio ordonné, la position la plus récente en tête
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portfolio(Vec<Position>);

impl Portfolio {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Reconstruit depuis le stockage : tickers re-normalisés (majuscules),
    /// entrées invalides ignorées, doublons fusionnés par moyenne pondérée
    pub fn from_positions(positions: Vec<Position>) -> Self {
        let mut portfolio = Self::new();
        for mut position in positions {
            let Some(ticker) = InstrumentRef::parse_uppercase(position.ticker.as_str()) else {
                warn!("Dropping persisted position without ticker");
                continue;
            };
            if !is_positive(position.quantity) || !is_positive(position.average_price) {
                warn!(ticker = %ticker, "Dropping persisted position with invalid quantity or price");
                continue;
            }
            position.ticker = ticker;
            match portfolio.index_of(&position.ticker) {
                Some(index) => portfolio.merge_at(index, &position),
                None => portfolio.0.push(position),
            }
        }
        portfolio
    }

    /// Ajoute (ou fusionne) une position
    ///
    /// CONCEPT RUST : Result pour la validation
    /// - Les entrées invalides sont rejetées avant toute mutation
    /// - Retourne la position résultante après fusion
    pub fn add_position(
        &mut self,
        input: NewPosition,
        now: DateTime<Utc>,
    ) -> Result<&Position, PortfolioError> {
        let ticker =
            InstrumentRef::parse_uppercase(&input.ticker).ok_or(PortfolioError::MissingTicker)?;
        if !is_positive(input.quantity) {
            return Err(PortfolioError::InvalidQuantity(input.quantity));
        }
        if !is_positive(input.average_price) {
            return Err(PortfolioError::InvalidPrice(input.average_price));
        }

        let notes = input
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let position = Position {
            ticker,
            quantity: input.quantity,
            average_price: input.average_price,
            added_at: now,
            notes,
        };

        match self.index_of(&position.ticker) {
            Some(index) => {
                self.merge_at(index, &position);
                Ok(&self.0[index])
            }
            None => {
                self.0.insert(0, position);
                Ok(&self.0[0])
            }
        }
    }

    /// Supprime une position entière ; retourne true si elle existait
    pub fn remove(&mut self, ticker: &InstrumentRef) -> bool {
        let before = self.0.len();
        self.0.retain(|position| &position.ticker != ticker);
        self.0.len() != before
    }

    /// Valeur totale au prix moyen
    pub fn total_value(&self) -> f64 {
        self.0.iter().map(Position::value).sum()
    }

    pub fn get(&self, index: usize) -> Option<&Position> {
        self.0.get(index)
    }

    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn index_of(&self, ticker: &InstrumentRef) -> Option<usize> {
        self.0.iter().position(|position| &position.ticker == ticker)
    }

    /// Fusion par moyenne pondérée (la date d'ajout d'origine est conservée)
    fn merge_at(&mut self, index: usize, incoming: &Position) {
        let existing = &mut self.0[index];
        let total_quantity = existing.quantity + incoming.quantity;
        let total_value =
            existing.quantity * existing.average_price + incoming.quantity * incoming.average_price;

        existing.quantity = total_quantity;
        existing.average_price = total_value / total_quantity;
        if incoming.notes.is_some() {
            existing.notes = incoming.notes.clone();
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_position(ticker: &str, quantity: f64, price: f64) -> NewPosition {
        NewPosition {
            ticker: ticker.to_string(),
            quantity,
            average_price: price,
            notes: None,
        }
    }

    #[test]
    fn test_weighted_average_merge() {
        let mut portfolio = Portfolio::new();
        let now = Utc::now();

        portfolio.add_position(new_position("aapl", 10.0, 100.0), now).unwrap();
        let merged = portfolio
            .add_position(new_position("AAPL", 10.0, 200.0), now)
            .unwrap();

        assert_eq!(merged.quantity, 20.0);
        assert_eq!(merged.average_price, 150.0);
        assert_eq!(portfolio.len(), 1);
    }

    #[test]
    fn test_ticker_is_uppercased_even_when_qualified() {
        let mut portfolio = Portfolio::new();
        let position = portfolio
            .add_position(new_position("coinbase:btcusd", 0.5, 60000.0), Utc::now())
            .unwrap();
        assert_eq!(position.ticker.as_str(), "COINBASE:BTCUSD");
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let mut portfolio = Portfolio::new();
        let now = Utc::now();

        assert_eq!(
            portfolio.add_position(new_position("  ", 1.0, 1.0), now).unwrap_err(),
            PortfolioError::MissingTicker
        );
        assert_eq!(
            portfolio.add_position(new_position("AAPL", 0.0, 1.0), now).unwrap_err(),
            PortfolioError::InvalidQuantity(0.0)
        );
        assert!(matches!(
            portfolio.add_position(new_position("AAPL", 1.0, f64::NAN), now),
            Err(PortfolioError::InvalidPrice(_))
        ));
        assert!(portfolio.is_empty());
    }

    #[test]
    fn test_notes_keep_previous_when_absent() {
        let mut portfolio = Portfolio::new();
        let now = Utc::now();

        let mut first = new_position("TSLA", 1.0, 200.0);
        first.notes = Some("swing".to_string());
        portfolio.add_position(first, now).unwrap();

        let merged = portfolio.add_position(new_position("TSLA", 1.0, 300.0), now).unwrap();
        assert_eq!(merged.notes.as_deref(), Some("swing"));
    }

    #[test]
    fn test_remove_and_total_value() {
        let mut portfolio = Portfolio::new();
        let now = Utc::now();
        portfolio.add_position(new_position("AAPL", 2.0, 100.0), now).unwrap();
        portfolio.add_position(new_position("MSFT", 1.0, 50.0), now).unwrap();

        assert_eq!(portfolio.get(0).unwrap().ticker.as_str(), "MSFT");
        assert_eq!(portfolio.total_value(), 250.0);

        let aapl = InstrumentRef::parse("AAPL").unwrap();
        assert!(portfolio.remove(&aapl));
        assert!(!portfolio.remove(&aapl));
        assert_eq!(portfolio.total_value(), 50.0);
    }

    #[test]
    fn test_parse_new_position() {
        let input = NewPosition::parse("nvda 3 450.25 earnings play").unwrap();
        assert_eq!(input.ticker, "nvda");
        assert_eq!(input.quantity, 3.0);
        assert_eq!(input.average_price, 450.25);
        assert_eq!(input.notes.as_deref(), Some("earnings play"));

        assert!(NewPosition::parse("nvda three 1").is_none());
        assert!(NewPosition::parse("nvda").is_none());
    }

    #[test]
    fn test_persisted_shape() {
        let json = r#"[{"ticker":"AAPL","quantity":10,"averagePrice":100,"addedAt":"2024-03-01T10:00:00Z"},
                       {"ticker":"AAPL","quantity":10,"averagePrice":200,"addedAt":"2024-03-02T10:00:00Z","notes":"dip"},
                       {"ticker":"BAD","quantity":-1,"averagePrice":5,"addedAt":"2024-03-02T10:00:00Z"}]"#;
        let positions: Vec<Position> = serde_json::from_str(json).unwrap();
        let portfolio = Portfolio::from_positions(positions);

        assert_eq!(portfolio.len(), 1);
        let aapl = portfolio.get(0).unwrap();
        assert_eq!(aapl.quantity, 20.0);
        assert_eq!(aapl.average_price, 150.0);
        assert_eq!(aapl.notes.as_deref(), Some("dip"));
    }

    #[test]
    fn test_restored_tickers_are_normalized_before_merging() {
        let json = r#"[{"ticker":"aapl","quantity":10,"averagePrice":100,"addedAt":"2024-03-01T10:00:00Z"},
                       {"ticker":"  ","quantity":1,"averagePrice":1,"addedAt":"2024-03-01T10:00:00Z"}]"#;
        let positions: Vec<Position> = serde_json::from_str(json).unwrap();
        let mut portfolio = Portfolio::from_positions(positions);

        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio.get(0).unwrap().ticker.as_str(), "AAPL");

        let merged = portfolio
            .add_position(new_position("AAPL", 10.0, 200.0), Utc::now())
            .unwrap();
        assert_eq!(merged.quantity, 20.0);
        assert_eq!(merged.average_price, 150.0);
        assert_eq!(portfolio.len(), 1);
    }
}
