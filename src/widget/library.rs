// ============================================================================
// Capacités injectées : la librairie de graphiques externe
// ============================================================================
// Le rendu du graphique est entièrement délégué à une librairie tierce
// (TradingView). Le gestionnaire de cycle de vie ne la suppose jamais
// présente : il passe par ce trait pour
// - savoir si le script est disponible / en cours de chargement
// - déclencher le chargement (une seule fois par session)
// - créer et détruire une instance de widget
// - observer le rendu effectif dans le conteneur
// ============================================================================

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::models::{InstrumentRef, IntervalCode};

/// Disponibilité du script de la librairie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    /// Script chargé, la librairie est utilisable
    Available,
    /// Un chargement a déjà été lancé mais n'est pas terminé
    Loading,
    /// Aucun chargement lancé (ou le précédent a échoué)
    Absent,
}

/// Résultat d'un chargement de script, livré une seule fois
pub type ScriptLoad = oneshot::Receiver<Result<(), String>>;

/// Thème du widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

/// Options de construction d'un widget
///
/// Sérialisées telles quelles dans l'appel `new TradingView.widget({...})`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetOptions {
    pub autosize: bool,
    pub symbol: String,
    pub interval: String,
    pub timezone: String,
    pub theme: Theme,
    pub style: String,
    pub locale: String,
    pub enable_publishing: bool,
    pub hide_side_toolbar: bool,
    pub allow_symbol_change: bool,
    pub container_id: String,
    pub details: bool,
    pub withdateranges: bool,
    pub studies: Vec<String>,
}

impl WidgetOptions {
    pub fn new(
        ticker: &InstrumentRef,
        interval: &IntervalCode,
        container_id: &str,
        theme: Theme,
    ) -> Self {
        Self {
            autosize: true,
            symbol: ticker.as_str().to_string(),
            interval: interval.as_str().to_string(),
            timezone: "Etc/UTC".to_string(),
            theme,
            style: "1".to_string(),
            locale: "en".to_string(),
            enable_publishing: false,
            hide_side_toolbar: false,
            allow_symbol_change: false,
            container_id: container_id.to_string(),
            details: true,
            withdateranges: true,
            studies: Vec::new(),
        }
    }
}

/// Callback "ready" remis à la librairie lors de la création d'un widget
///
/// CONCEPT : Génération
/// - Chaque instance porte le numéro de génération qui l'a créée
/// - Un signal tardif d'une ancienne instance est ignoré par le gestionnaire
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<u64>,
}

impl ReadyNotifier {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<u64>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signale que le widget est prêt (plusieurs appels sont sans danger)
    pub fn notify(&self) {
        let _ = self.tx.send(self.generation);
    }
}

/// Instance vivante d'un widget
pub trait WidgetHandle: Send {
    /// Détruit l'instance et libère le conteneur
    fn destroy(self: Box<Self>);
}

/// Librairie de graphiques externe
pub trait ChartLibrary: Send + Sync {
    fn script_status(&self) -> ScriptStatus;

    /// Lance le chargement du script ; le résultat arrive sur le receiver
    fn inject_script(&self) -> ScriptLoad;

    fn container_exists(&self, container: &str) -> bool;

    /// Crée une instance liée au conteneur désigné par les options
    fn create_widget(
        &self,
        options: &WidgetOptions,
        ready: ReadyNotifier,
    ) -> Result<Box<dyn WidgetHandle>, String>;

    /// Le rendu du widget est-il visible dans le conteneur ?
    fn surface_rendered(&self, container: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_options_json() {
        let ticker = InstrumentRef::parse("COINBASE:BTCUSD").unwrap();
        let options = WidgetOptions::new(&ticker, &IntervalCode::new("60"), "tradingview-1", Theme::Dark);
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["symbol"], "COINBASE:BTCUSD");
        assert_eq!(json["interval"], "60");
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["container_id"], "tradingview-1");
        assert_eq!(json["allow_symbol_change"], false);
    }

    #[test]
    fn test_notifier_carries_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ReadyNotifier::new(7, tx);
        notifier.notify();
        notifier.notify();

        assert_eq!(rx.try_recv().unwrap(), 7);
        assert_eq!(rx.try_recv().unwrap(), 7);
        assert_eq!(notifier.generation(), 7);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("Light"), Some(Theme::Light));
        assert_eq!(Theme::parse("sepia"), None);
    }
}
