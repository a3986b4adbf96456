// ============================================================================
// Configuration : variables d'environnement
// ============================================================================
// Pas de fichier de config : tout passe par l'environnement, avec des
// valeurs par défaut raisonnables
//
//   CHART_GLANCE_DATA_DIR        préférences persistées
//   CHART_GLANCE_LOG_DIR         logs (./logs)
//   CHART_GLANCE_EXPORT_DIR      exports d'analyse (répertoire courant)
//   GEMINI_API_KEY               clé du service d'analyse (optionnelle)
//   CHART_GLANCE_MODEL           modèle (gemini-1.5-flash)
//   CHART_GLANCE_ANALYSIS_SHAPE  structured | text
//   CHART_GLANCE_SCRIPT_URL      script de la librairie de graphiques
//   CHART_GLANCE_THEME           dark | light
// ============================================================================

use std::path::PathBuf;

use tracing::warn;

use crate::models::AnalysisShape;
use crate::widget::{LifecycleConfig, Theme};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_SCRIPT_URL: &str = "https://s3.tradingview.com/tv.js";

/// Identifiant du conteneur du graphique principal
pub const CHART_CONTAINER: &str = "tradingview-chart";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub export_dir: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub analysis_shape: AnalysisShape,
    pub script_url: String,
    pub theme: Theme,
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// Lit la configuration depuis l'environnement du process
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// CONCEPT RUST : Closure comme source de données
    /// - from_env() passe std::env::var
    /// - Les tests passent une HashMap, sans toucher à l'environnement global
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = var("CHART_GLANCE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let analysis_shape = match var("CHART_GLANCE_ANALYSIS_SHAPE") {
            Some(raw) => AnalysisShape::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown analysis shape, using structured");
                AnalysisShape::default()
            }),
            None => AnalysisShape::default(),
        };

        let theme = match var("CHART_GLANCE_THEME") {
            Some(raw) => Theme::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown theme, using dark");
                Theme::default()
            }),
            None => Theme::default(),
        };

        Self {
            data_dir,
            log_dir: var("CHART_GLANCE_LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./logs")),
            export_dir: var("CHART_GLANCE_EXPORT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            api_key: var("GEMINI_API_KEY"),
            model: var("CHART_GLANCE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            analysis_shape,
            script_url: var("CHART_GLANCE_SCRIPT_URL").unwrap_or_else(|| DEFAULT_SCRIPT_URL.to_string()),
            theme,
            lifecycle: LifecycleConfig::default(),
        }
    }

    /// Répertoire des préférences (un fichier JSON par clé)
    pub fn prefs_dir(&self) -> PathBuf {
        self.data_dir.join("prefs")
    }

    /// Racine des conteneurs du graphique et du cache du script
    pub fn chart_dir(&self) -> PathBuf {
        self.data_dir.join("chart")
    }
}

/// Répertoire de données de l'utilisateur
///
/// CONCEPT : dirs crate
/// - Linux : ~/.local/share/chart-glance
/// - macOS : ~/Library/Application Support/chart-glance
/// - Fallback : ./.chart-glance
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("chart-glance"))
        .unwrap_or_else(|| PathBuf::from("./.chart-glance"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.log_dir, PathBuf::from("./logs"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.script_url, DEFAULT_SCRIPT_URL);
        assert_eq!(config.analysis_shape, AnalysisShape::Structured);
        assert_eq!(config.theme, Theme::Dark);
        assert!(config.api_key.is_none());
        assert_eq!(config.lifecycle.max_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("CHART_GLANCE_DATA_DIR", "/tmp/cg"),
            ("GEMINI_API_KEY", " secret "),
            ("CHART_GLANCE_ANALYSIS_SHAPE", "text"),
            ("CHART_GLANCE_THEME", "light"),
        ]);
        assert_eq!(config.prefs_dir(), PathBuf::from("/tmp/cg/prefs"));
        assert_eq!(config.chart_dir(), PathBuf::from("/tmp/cg/chart"));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.analysis_shape, AnalysisShape::Text);
        assert_eq!(config.theme, Theme::Light);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[("CHART_GLANCE_THEME", "sepia"), ("GEMINI_API_KEY", "  ")]);
        assert_eq!(config.theme, Theme::Dark);
        assert!(config.api_key.is_none());
    }
}
