// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Composition : App agrège sélection, watchlist, portfolio, statut du
//    graphique et panneau d'analyse
//
// PATTERN : Les effets de bord asynchrones ne sont pas exécutés ici
// - Les méthodes retournent une Action (reconfigurer le graphique,
//   lancer une analyse...)
// - La boucle principale l'exécute (widget manager, worker thread)
// ============================================================================

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisPanel, AnalysisRequest};
use crate::export::{write_export, ExportFormat};
use crate::models::{
    InstrumentRef, IntervalCode, NewPosition, Portfolio, Position, Watchlist, WatchlistEntry,
    POPULAR_CRYPTO, POPULAR_STOCKS,
};
use crate::selection::{ChangeKind, SelectionChange, SelectionState};
use crate::store::{load_json, save_json, SharedStore, StoreKey};
use crate::widget::WidgetStatus;

// ============================================================================
// Enums : Panel / InputMode / Action
// ============================================================================

/// Panneaux navigables (Tab pour passer au suivant)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Actions et cryptos populaires
    Popular,
    /// Tickers récents
    Recent,
    Watchlist,
    Portfolio,
}

impl Panel {
    pub fn next(&self) -> Self {
        match self {
            Panel::Popular => Panel::Recent,
            Panel::Recent => Panel::Watchlist,
            Panel::Watchlist => Panel::Portfolio,
            Panel::Portfolio => Panel::Popular,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Panel::Popular => Panel::Portfolio,
            Panel::Recent => Panel::Popular,
            Panel::Watchlist => Panel::Recent,
            Panel::Portfolio => Panel::Watchlist,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Panel::Popular => "Popular",
            Panel::Recent => "Recent",
            Panel::Watchlist => "Watchlist",
            Panel::Portfolio => "Portfolio",
        }
    }
}

/// Mode de saisie
///
/// CONCEPT : Modal input (Vim-like)
/// - Normal : les touches sont des commandes
/// - Ticker / Position : les touches remplissent le buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Saisie libre d'un ticker
    Ticker,
    /// Saisie d'une position : "TICKER QTY PRICE [notes]"
    Position,
}

/// Effet à exécuter par la boucle principale
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Reconstruire le graphique pour une nouvelle paire
    ConfigureChart {
        ticker: InstrumentRef,
        interval: IntervalCode,
    },
    /// Retry du graphique demandé par l'utilisateur
    RetryChart,
    /// Lancer une analyse IA
    Analyze(AnalysisRequest),
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Two-step quit : première pression de 'q' → confirmation
    pub confirm_quit: bool,

    /// Two-step delete : première pression de 'd' → confirmation
    pub confirm_delete: bool,

    pub focus: Panel,
    pub selected_index: usize,

    pub input_mode: InputMode,
    pub input_buffer: String,
    pub input_prompt: String,

    /// Message de statut (export, erreur de saisie...)
    pub status_message: Option<String>,

    pub selection: SelectionState,
    pub watchlist: Watchlist,
    pub portfolio: Portfolio,
    pub chart: WidgetStatus,
    pub analysis: AnalysisPanel,

    store: SharedStore,
}

impl App {
    /// Restaure l'état persistant (sélection, watchlist, portfolio)
    pub fn restore(store: SharedStore, max_retries: u32) -> Self {
        let selection = SelectionState::restore(store.clone());

        let watchlist = load_json::<Vec<WatchlistEntry>>(store.as_ref(), StoreKey::Watchlist)
            .map(Watchlist::from_entries)
            .unwrap_or_default();
        let portfolio = load_json::<Vec<Position>>(store.as_ref(), StoreKey::Portfolio)
            .map(Portfolio::from_positions)
            .unwrap_or_default();

        info!(watchlist = watchlist.len(), positions = portfolio.len(), "Application state restored");

        let chart = WidgetStatus::initial(
            selection.ticker().clone(),
            selection.interval().clone(),
            max_retries,
        );

        Self {
            running: true,
            confirm_quit: false,
            confirm_delete: false,
            focus: Panel::Popular,
            selected_index: 0,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            input_prompt: String::new(),
            status_message: None,
            selection,
            watchlist,
            portfolio,
            chart,
            analysis: AnalysisPanel::new(),
            store,
        }
    }

    // ========================================================================
    // Cycle de vie
    // ========================================================================

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Sélection
    // ========================================================================

    pub fn ticker(&self) -> &InstrumentRef {
        self.selection.ticker()
    }

    pub fn interval(&self) -> &IntervalCode {
        self.selection.interval()
    }

    /// Sélectionne un ticker depuis n'importe quel panneau ou la saisie libre
    pub fn select_ticker(&mut self, raw: &str) -> Option<Action> {
        let change = self.selection.select_ticker(raw)?;
        self.apply_change(change)
    }

    pub fn next_interval(&mut self) -> Option<Action> {
        let change = self.selection.next_interval();
        self.apply_change(change)
    }

    pub fn previous_interval(&mut self) -> Option<Action> {
        let change = self.selection.previous_interval();
        self.apply_change(change)
    }

    /// Propage une sélection aux composants dépendants
    ///
    /// - sélection d'un ticker (même inchangé) : l'analyse affichée est effacée
    /// - toute paire différente : le graphique est reconfiguré
    fn apply_change(&mut self, change: SelectionChange) -> Option<Action> {
        if change.kind == ChangeKind::Ticker {
            self.analysis.clear();
        }
        if !change.changed {
            debug!(ticker = %change.ticker, interval = %change.interval, "Selection unchanged");
            return None;
        }
        Some(Action::ConfigureChart {
            ticker: change.ticker,
            interval: change.interval,
        })
    }

    /// Le ticker courant est-il dans la watchlist ? (dérivé)
    pub fn is_current_watched(&self) -> bool {
        self.watchlist.contains(self.selection.ticker())
    }

    // ========================================================================
    // Navigation dans les panneaux
    // ========================================================================

    /// Tickers proposés par le panneau Popular (actions puis cryptos)
    pub fn popular_entries() -> impl Iterator<Item = &'static str> {
        let stocks: &'static [&str] = &POPULAR_STOCKS;
        let crypto: &'static [&str] = &POPULAR_CRYPTO;
        stocks.iter().chain(crypto.iter()).copied()
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
        self.selected_index = 0;
        self.cancel_delete();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
        self.selected_index = 0;
        self.cancel_delete();
    }

    fn panel_len(&self) -> usize {
        match self.focus {
            Panel::Popular => POPULAR_STOCKS.len() + POPULAR_CRYPTO.len(),
            Panel::Recent => self.selection.recents().len(),
            Panel::Watchlist => self.watchlist.len(),
            Panel::Portfolio => self.portfolio.len(),
        }
    }

    /// CONCEPT RUST : Saturating arithmetic
    /// - saturating_sub() ne descend pas en dessous de 0
    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.panel_len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    /// Ticker sous le curseur dans le panneau actif
    pub fn highlighted_ticker(&self) -> Option<String> {
        match self.focus {
            Panel::Popular => Self::popular_entries().nth(self.selected_index).map(str::to_string),
            Panel::Recent => self
                .selection
                .recents()
                .iter()
                .nth(self.selected_index)
                .map(|t| t.as_str().to_string()),
            Panel::Watchlist => self.watchlist.get(self.selected_index).map(|e| e.ticker.as_str().to_string()),
            Panel::Portfolio => self.portfolio.get(self.selected_index).map(|p| p.ticker.as_str().to_string()),
        }
    }

    /// Enter : sélectionne le ticker sous le curseur
    pub fn activate_selected(&mut self) -> Option<Action> {
        let ticker = self.highlighted_ticker()?;
        info!(ticker = %ticker, panel = self.focus.title(), "Ticker picked from panel");
        let action = self.select_ticker(&ticker);
        // La liste des récents vient d'être réordonnée
        if self.focus == Panel::Recent {
            self.selected_index = 0;
        }
        action
    }

    // ========================================================================
    // Watchlist
    // ========================================================================

    /// Ajoute ou retire le ticker courant de la watchlist
    pub fn toggle_watchlist(&mut self, now: DateTime<Utc>) {
        let ticker = self.selection.ticker().clone();
        if self.watchlist.remove(&ticker) {
            info!(ticker = %ticker, "Removed from watchlist");
            self.status_message = Some(format!("{} removed from watchlist", ticker));
        } else {
            self.watchlist.add(ticker.clone(), now);
            info!(ticker = %ticker, "Added to watchlist");
            self.status_message = Some(format!("{} added to watchlist", ticker));
        }
        self.clamp_selection();
        self.persist_watchlist();
    }

    fn persist_watchlist(&self) {
        save_json(self.store.as_ref(), StoreKey::Watchlist, &self.watchlist);
    }

    // ========================================================================
    // Portfolio
    // ========================================================================

    /// Ajoute une position depuis la saisie "TICKER QTY PRICE [notes]"
    pub fn add_position(&mut self, input: &str, now: DateTime<Utc>) -> bool {
        let Some(position) = NewPosition::parse(input) else {
            warn!(input = %input, "Unparseable position input");
            self.status_message = Some("Usage: TICKER QUANTITY PRICE [notes]".to_string());
            return false;
        };

        match self.portfolio.add_position(position, now) {
            Ok(position) => {
                info!(ticker = %position.ticker, quantity = position.quantity, average_price = position.average_price, "Position saved");
                self.status_message = Some(format!(
                    "{}: {} @ {:.2}",
                    position.ticker, position.quantity, position.average_price
                ));
            }
            Err(e) => {
                warn!(error = %e, "Rejected position input");
                self.status_message = Some(format!("Invalid position: {}", e));
                return false;
            }
        }

        self.persist_portfolio();
        true
    }

    fn persist_portfolio(&self) {
        save_json(self.store.as_ref(), StoreKey::Portfolio, &self.portfolio);
    }

    // ========================================================================
    // Delete Confirmation Management
    // ========================================================================

    /// Seuls les panneaux Watchlist et Portfolio sont éditables
    pub fn can_delete(&self) -> bool {
        match self.focus {
            Panel::Watchlist => !self.watchlist.is_empty(),
            Panel::Portfolio => !self.portfolio.is_empty(),
            _ => false,
        }
    }

    pub fn request_delete(&mut self) {
        self.confirm_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    /// Supprime l'entrée sélectionnée du panneau actif
    pub fn delete_selected(&mut self) {
        let removed = match self.focus {
            Panel::Watchlist => {
                let ticker = self.watchlist.get(self.selected_index).map(|e| e.ticker.clone());
                if let Some(ticker) = &ticker {
                    self.watchlist.remove(ticker);
                    self.persist_watchlist();
                }
                ticker
            }
            Panel::Portfolio => {
                let ticker = self.portfolio.get(self.selected_index).map(|p| p.ticker.clone());
                if let Some(ticker) = &ticker {
                    self.portfolio.remove(ticker);
                    self.persist_portfolio();
                }
                ticker
            }
            _ => None,
        };

        if let Some(ticker) = removed {
            info!(ticker = %ticker, panel = self.focus.title(), "Entry deleted");
            self.status_message = Some(format!("{} deleted", ticker));
        }

        self.clamp_selection();
        self.confirm_delete = false;
    }

    /// Ajuste l'index si on a supprimé le dernier élément
    fn clamp_selection(&mut self) {
        let len = self.panel_len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
    }

    // ========================================================================
    // Graphique
    // ========================================================================

    pub fn set_chart_status(&mut self, status: WidgetStatus) {
        self.chart = status;
    }

    /// 'r' : retry si le budget le permet
    pub fn request_retry(&mut self) -> Option<Action> {
        if self.chart.can_retry() {
            info!(attempt = self.chart.retry_count + 1, "User requested chart retry");
            return Some(Action::RetryChart);
        }
        if self.chart.retries_exhausted() {
            self.status_message = Some("Retries exhausted, please restart the application".to_string());
        }
        None
    }

    // ========================================================================
    // Analyse
    // ========================================================================

    pub fn request_analysis(&mut self) -> Option<Action> {
        let ticker = self.selection.ticker().clone();
        let interval = self.selection.interval().clone();
        self.analysis.begin(&ticker, &interval).map(Action::Analyze)
    }

    /// Exporte la dernière analyse dans `dir`
    pub fn export_analysis(&mut self, dir: &Path, format: ExportFormat, now: DateTime<Utc>) {
        let Some(analysis) = self.analysis.result() else {
            self.status_message = Some("Nothing to export yet, press [a] to analyze".to_string());
            return;
        };

        self.status_message = Some(match write_export(dir, analysis, format, now) {
            Ok(path) => format!("Analysis exported to {}", path.display()),
            Err(e) => {
                warn!(error = ?e, "Export failed");
                "Failed to export analysis. Please try again.".to_string()
            }
        });
    }

    // ========================================================================
    // Input Mode Management
    // ========================================================================

    pub fn start_input(&mut self, mode: InputMode, prompt: &str) {
        self.input_mode = mode;
        self.input_buffer.clear();
        self.input_prompt = prompt.to_string();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.input_prompt.clear();
    }

    /// Récupère la saisie et revient en mode Normal
    pub fn submit_input(&mut self) -> (InputMode, String) {
        let mode = self.input_mode;
        let value = std::mem::take(&mut self.input_buffer);
        self.cancel_input();
        (mode, value)
    }

    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.input_mode != InputMode::Normal
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::GENERIC_ERROR;
    use crate::api::gemini::AnalysisError;
    use crate::models::{AnalysisReport, TextAnalysis};
    use crate::store::{MemoryStore, PreferenceStore};
    use crate::widget::{LifecycleState, WidgetError};
    use std::sync::Arc;

    fn app() -> (Arc<MemoryStore>, App) {
        let store = Arc::new(MemoryStore::new());
        let app = App::restore(store.clone(), 3);
        (store, app)
    }

    #[test]
    fn test_app_creation() {
        let (_, app) = app();
        assert!(app.is_running());
        assert_eq!(app.ticker().as_str(), "AAPL");
        assert_eq!(app.interval().as_str(), "D");
        assert!(app.watchlist.is_empty());
        assert_eq!(app.focus, Panel::Popular);
    }

    #[test]
    fn test_app_quit() {
        let (_, mut app) = app();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_pick_from_popular_reconfigures_chart() {
        let (_, mut app) = app();
        // AAPL, GOOGL, TSLA, AMZN, MSFT, COINBASE:BTCUSD...
        for _ in 0..5 {
            app.navigate_down();
        }
        let action = app.activate_selected().unwrap();
        assert_eq!(
            action,
            Action::ConfigureChart {
                ticker: InstrumentRef::parse("COINBASE:BTCUSD").unwrap(),
                interval: IntervalCode::new("D"),
            }
        );

        // Même ticker : rien à reconstruire
        assert!(app.activate_selected().is_none());
    }

    #[test]
    fn test_navigation_is_bounded_per_panel() {
        let (_, mut app) = app();
        app.focus_next();
        assert_eq!(app.focus, Panel::Recent);
        app.navigate_down();
        assert_eq!(app.selected_index, 0);

        app.focus_previous();
        for _ in 0..20 {
            app.navigate_down();
        }
        assert_eq!(app.selected_index, 9);
        app.navigate_up();
        assert_eq!(app.selected_index, 8);
    }

    #[test]
    fn test_interval_change_keeps_analysis() {
        let (_, mut app) = app();
        let Some(Action::Analyze(request)) = app.request_analysis() else {
            panic!("expected an analysis request");
        };
        let report = AnalysisReport::Text(TextAnalysis { analysis: "Flat.".into() });
        app.analysis.complete(request.id, Ok(report), Utc::now());

        let action = app.next_interval().unwrap();
        assert!(matches!(action, Action::ConfigureChart { ref interval, .. } if interval.as_str() == "W"));
        assert!(app.analysis.result().is_some());

        app.select_ticker("tsla");
        assert!(app.analysis.result().is_none());
    }

    #[test]
    fn test_reselecting_current_ticker_clears_analysis() {
        let (_, mut app) = app();
        let Some(Action::Analyze(request)) = app.request_analysis() else {
            panic!("expected an analysis request");
        };
        app.analysis.complete(request.id, Err(AnalysisError::MissingApiKey), Utc::now());
        assert_eq!(app.analysis.error(), Some(GENERIC_ERROR));

        // Même ticker : pas de reconstruction du graphique, mais l'erreur disparaît
        assert!(app.select_ticker("aapl").is_none());
        assert!(app.analysis.error().is_none());
        assert!(app.analysis.result().is_none());
    }

    #[test]
    fn test_toggle_watchlist_persists() {
        let (store, mut app) = app();
        app.toggle_watchlist(Utc::now());
        assert!(app.is_current_watched());

        let raw = store.get(StoreKey::Watchlist).unwrap().unwrap();
        assert!(raw.contains(r#""ticker":"AAPL""#));
        assert!(raw.contains(r#""name":"Apple Inc.""#));
        assert!(raw.contains("addedAt"));

        app.toggle_watchlist(Utc::now());
        assert!(!app.is_current_watched());
        assert_eq!(store.get(StoreKey::Watchlist).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_add_position_merges_and_persists() {
        let (store, mut app) = app();
        assert!(app.add_position("aapl 10 100", Utc::now()));
        assert!(app.add_position("AAPL 10 200 long term", Utc::now()));

        let position = &app.portfolio.positions()[0];
        assert_eq!(position.quantity, 20.0);
        assert_eq!(position.average_price, 150.0);
        assert_eq!(position.notes.as_deref(), Some("long term"));
        assert!(store.get(StoreKey::Portfolio).unwrap().unwrap().contains("averagePrice"));
    }

    #[test]
    fn test_invalid_position_is_rejected() {
        let (store, mut app) = app();
        assert!(!app.add_position("AAPL ten 100", Utc::now()));
        assert!(!app.add_position("AAPL -1 100", Utc::now()));
        assert!(app.status_message.as_deref().unwrap().starts_with("Invalid position"));
        assert!(app.portfolio.is_empty());
        assert!(store.get(StoreKey::Portfolio).unwrap().is_none());
    }

    #[test]
    fn test_two_step_delete_from_watchlist() {
        let (_, mut app) = app();
        app.toggle_watchlist(Utc::now());
        app.select_ticker("MSFT");
        app.toggle_watchlist(Utc::now());

        app.focus = Panel::Watchlist;
        app.navigate_down();
        assert!(app.can_delete());
        app.request_delete();
        assert!(app.is_awaiting_delete_confirmation());
        app.delete_selected();

        assert_eq!(app.watchlist.len(), 1);
        assert_eq!(app.watchlist.entries()[0].ticker.as_str(), "MSFT");
        assert_eq!(app.selected_index, 0);
        assert!(!app.is_awaiting_delete_confirmation());
    }

    #[test]
    fn test_retry_only_when_budget_allows() {
        let (_, mut app) = app();
        assert!(app.request_retry().is_none());

        let mut status = app.chart.clone();
        status.state = LifecycleState::WidgetTimedOut;
        status.error = Some(WidgetError::ReadinessTimeout);
        app.set_chart_status(status.clone());
        assert_eq!(app.request_retry(), Some(Action::RetryChart));

        status.retry_count = 3;
        app.set_chart_status(status);
        assert!(app.request_retry().is_none());
        assert!(app.status_message.as_deref().unwrap().contains("exhausted"));
    }

    #[test]
    fn test_failed_analysis_cannot_be_exported() {
        let (_, mut app) = app();
        let Some(Action::Analyze(request)) = app.request_analysis() else {
            panic!("expected an analysis request");
        };
        app.analysis.complete(request.id, Err(AnalysisError::EmptyResponse), Utc::now());
        assert_eq!(app.analysis.error(), Some(GENERIC_ERROR));

        let dir = tempfile::tempdir().unwrap();
        app.export_analysis(dir.path(), ExportFormat::Json, Utc::now());
        assert!(app.status_message.as_deref().unwrap().starts_with("Nothing to export"));
    }

    #[test]
    fn test_restore_from_persisted_state() {
        let store = Arc::new(MemoryStore::seeded([
            (StoreKey::RecentTickers, r#"["ETHUSDT"]"#.to_string()),
            (
                StoreKey::Watchlist,
                r#"[{"ticker":"TSLA","addedAt":"2024-01-01T00:00:00Z"}]"#.to_string(),
            ),
            (StoreKey::Portfolio, "not json".to_string()),
        ]));
        let app = App::restore(store, 3);

        assert_eq!(app.ticker().as_str(), "ETHUSDT");
        assert_eq!(app.watchlist.entries()[0].label(), "TSLA");
        assert!(app.portfolio.is_empty());
        assert_eq!(app.chart.ticker.as_str(), "ETHUSDT");
    }

    #[test]
    fn test_input_mode() {
        let (_, mut app) = app();
        app.start_input(InputMode::Ticker, "Ticker: ");
        assert!(app.is_in_input_mode());
        app.append_char('n');
        app.append_char('v');
        app.append_char('x');
        app.backspace();
        app.append_char('d');

        let (mode, value) = app.submit_input();
        assert_eq!(mode, InputMode::Ticker);
        assert_eq!(value, "nvd");
        assert!(!app.is_in_input_mode());
        assert!(app.input_buffer.is_empty());
    }
}
