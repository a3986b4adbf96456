// ============================================================================
// Chart Glance - Tableau de bord de graphiques de marché
// ============================================================================
// Programme TUI : sélection d'un instrument et d'un intervalle, widget
// TradingView monté dans un conteneur, analyse IA à la demande
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle infinie qui gère événements et rendering
// 3. Async dans sync : runtime tokio partagé par le widget et le worker
// 4. Channels : commandes vers le worker, résultats vers l'UI
// ============================================================================

use std::io;
use std::path::Path;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, error, info, warn};

use chartglance::analysis::AnalysisRequest;
use chartglance::api::{AnalysisError, GeminiClient, TradingViewLibrary};
use chartglance::app::{Action, App, InputMode};
use chartglance::config::{AppConfig, CHART_CONTAINER};
use chartglance::export::ExportFormat;
use chartglance::models::AnalysisReport;
use chartglance::store::FileStore;
use chartglance::ui::{events, render, Event, EventHandler};
use chartglance::widget::ChartWidgetManager;

// ============================================================================
// AppCommand / AppResult : échanges avec le worker thread
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
enum AppCommand {
    /// Demande une analyse IA pour (ticker, intervalle)
    Analyze(AnalysisRequest),
}

/// Résultats renvoyés par le worker thread
#[derive(Debug)]
enum AppResult {
    AnalysisFinished {
        id: u64,
        outcome: Result<AnalysisReport, AnalysisError>,
    },
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : tout part
// dans un fichier avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// # Utilisation
/// ```bash
/// tail -f ./logs/chartglance.log
/// RUST_LOG=chartglance=trace cargo run
/// ```
fn init_logging(log_dir: &Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "chartglance.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour chartglance, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chartglance=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialized");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let config = AppConfig::from_env();

    init_logging(&config.log_dir).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(data_dir = ?config.data_dir, model = %config.model, "Chart Glance starting up");
    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY not set, AI analysis will fail");
    }

    // État persistant : sélection, récents, watchlist, portfolio
    let store = FileStore::new(config.prefs_dir());
    info!(dir = %store.dir().display(), "Preference store ready");
    let mut app = App::restore(Arc::new(store), config.lifecycle.max_retries);

    // CONCEPT RUST : Runtime multi-thread possédé par main()
    // - L'acteur du widget y tourne en tâche de fond
    // - Le worker d'analyse y exécute ses requêtes via un Handle
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let library = TradingViewLibrary::new(config.script_url.clone(), config.chart_dir())?;
    let container = library.prepare_container(CHART_CONTAINER)?;
    info!(container = %container.display(), "Chart container ready");

    let manager = ChartWidgetManager::mount(
        runtime.handle(),
        Arc::new(library),
        config.lifecycle.clone(),
        CHART_CONTAINER,
        config.theme,
        app.ticker().clone(),
        app.interval().clone(),
    );

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    let client = GeminiClient::new(config.api_key.clone(), config.model.clone(), config.analysis_shape);
    info!(shape = ?client.shape(), "Spawning background worker thread");
    spawn_background_worker(runtime.handle().clone(), client, command_rx, result_tx);

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::default();
    let mut context = LoopContext {
        manager,
        command_tx,
        result_rx,
        export_dir: config.export_dir.clone(),
    };

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &mut context);

    debug!("Restoring terminal");
    let restored = restore_terminal(&mut terminal);
    let restored = shutdown(&runtime, context, restored);

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    restored?;
    result
}

/// Démontage : annule les timers et détruit l'instance du widget
///
/// Exécuté même si la restauration du terminal a échoué ; l'erreur de
/// restauration est renvoyée ensuite.
fn shutdown(runtime: &Runtime, context: LoopContext, restored: Result<()>) -> Result<()> {
    if let Err(e) = &restored {
        error!(error = ?e, "Failed to restore terminal");
    }

    let LoopContext { manager, command_tx, .. } = context;
    drop(command_tx);
    runtime.block_on(manager.unmount());

    restored
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// CONCEPT RUST : Thread + Handle tokio
// - Le thread attend les commandes de façon bloquante
// - Handle::block_on exécute la requête HTTP sur le runtime partagé
// - L'UI continue à tourner pendant l'appel
// ============================================================================

fn spawn_background_worker(
    runtime: Handle,
    client: GeminiClient,
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
) {
    std::thread::spawn(move || {
        while let Ok(command) = command_rx.recv() {
            info!(?command, "Worker received command");

            match command {
                AppCommand::Analyze(request) => {
                    let outcome = runtime.block_on(client.analyze(&request.ticker, &request.interval));

                    if let Err(e) = &outcome {
                        error!(request = request.id, ticker = %request.ticker, error = %e, "Analysis request failed");
                    }

                    if result_tx
                        .send(AppResult::AnalysisFinished { id: request.id, outcome })
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
        info!("Worker thread exiting (channel closed)");
    });
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   1. Statut du widget (publié par l'acteur)
//   2. Résultats du worker
//   3. Rendu, puis traitement de l'événement
// ============================================================================

struct LoopContext {
    manager: ChartWidgetManager,
    command_tx: mpsc::Sender<AppCommand>,
    result_rx: mpsc::Receiver<AppResult>,
    export_dir: std::path::PathBuf,
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    context: &mut LoopContext,
) -> Result<()> {
    while app.is_running() {
        if context.manager.poll_status() {
            let status = context.manager.status().clone();
            debug!(state = ?status.state, generation = status.generation, "Chart status updated");
            app.set_chart_status(status);
        }

        loop {
            match context.result_rx.try_recv() {
                Ok(AppResult::AnalysisFinished { id, outcome }) => {
                    app.analysis.complete(id, outcome, Utc::now());
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    error!("Worker thread disconnected!");
                    break;
                }
            }
        }

        terminal.draw(|frame| render(frame, app))?;

        match events.next() {
            Ok(event) => {
                if let Some(action) = handle_event(app, &event, &context.export_dir) {
                    dispatch(action, context);
                }
            }
            Err(e) => warn!(error = ?e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

/// Exécute une action produite par l'App
fn dispatch(action: Action, context: &LoopContext) {
    match action {
        Action::ConfigureChart { ticker, interval } => {
            context.manager.configure(ticker, interval);
        }
        Action::RetryChart => context.manager.retry(),
        Action::Analyze(request) => {
            if context.command_tx.send(AppCommand::Analyze(request)).is_err() {
                error!("Worker thread unavailable, analysis dropped");
            }
        }
    }
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et retourne l'éventuelle action à exécuter
///
/// CONCEPT RUST : Pattern matching avec guards
/// - Le mode input est traité en premier : les lettres y sont du texte
fn handle_event(app: &mut App, event: &Event, export_dir: &Path) -> Option<Action> {
    use events::*;

    if matches!(event, Event::Tick) {
        return None;
    }

    if app.is_in_input_mode() {
        if is_escape_event(event) {
            info!("User cancelled input");
            app.cancel_input();
        } else if is_enter_event(event) {
            let (mode, value) = app.submit_input();
            match mode {
                InputMode::Ticker => {
                    info!(input = %value, "User submitted ticker");
                    return app.select_ticker(&value);
                }
                InputMode::Position => {
                    app.add_position(&value, Utc::now());
                }
                InputMode::Normal => {}
            }
        } else if is_backspace_event(event) {
            app.backspace();
        } else if is_input_char_event(event) {
            if let Some(c) = get_char_from_event(event) {
                app.append_char(c);
            }
        }
        return None;
    }

    // Confirmation de suppression en deux temps
    if app.is_awaiting_delete_confirmation() {
        if is_delete_event(event) {
            app.delete_selected();
        } else {
            app.cancel_delete();
        }
        return None;
    }

    if is_quit_event(event) {
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            info!("User requested quit (awaiting confirmation)");
            app.request_quit();
        }
        return None;
    }

    // Toute autre touche annule la confirmation de quit
    app.cancel_quit();

    if is_tab_event(event) {
        app.focus_next();
    } else if is_backtab_event(event) {
        app.focus_previous();
    } else if is_up_event(event) {
        app.navigate_up();
    } else if is_down_event(event) {
        app.navigate_down();
    } else if is_enter_event(event) {
        return app.activate_selected();
    } else if is_next_interval_event(event) {
        return app.next_interval();
    } else if is_previous_interval_event(event) {
        return app.previous_interval();
    } else if is_ticker_input_event(event) {
        app.start_input(InputMode::Ticker, "Ticker (e.g. AAPL or BINANCE:BTCUSDT): ");
    } else if is_position_event(event) {
        app.start_input(InputMode::Position, "Position (TICKER QTY PRICE [notes]): ");
    } else if is_watch_event(event) {
        app.toggle_watchlist(Utc::now());
    } else if is_delete_event(event) {
        if app.can_delete() {
            info!("User requested delete (awaiting confirmation)");
            app.request_delete();
        }
    } else if is_retry_event(event) {
        return app.request_retry();
    } else if is_analyze_event(event) {
        return app.request_analysis();
    } else if is_export_json_event(event) {
        app.export_analysis(export_dir, ExportFormat::Json, Utc::now());
    } else if is_export_text_event(event) {
        app.export_analysis(export_dir, ExportFormat::Text, Utc::now());
    }

    None
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
