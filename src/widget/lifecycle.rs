// ============================================================================
// External Chart Widget Lifecycle Manager
// ============================================================================
// Possède l'unique instance de widget liée à la paire (instrument, intervalle)
// courante et gère le chargement unique du script de la librairie
//
// CONCEPT : Actor + Command pattern
// - La tâche reçoit des WidgetCommand via un channel
// - Elle publie un WidgetStatus à chaque transition
// - Tout l'état est possédé par la tâche : pas de lock, transitions
//   strictement séquentielles
//
// CONCEPT : Course entre deux signaux de rendu
// - le callback "ready" de la librairie (ReadyNotifier)
// - l'observation du conteneur (surface_rendered, polling)
// Le premier qui arrive fait passer en WidgetReady, le second est ignoré.
// ============================================================================

use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::models::{InstrumentRef, IntervalCode};
use crate::widget::library::{
    ChartLibrary, ReadyNotifier, ScriptLoad, ScriptStatus, Theme, WidgetHandle, WidgetOptions,
};
use crate::widget::state::{LifecycleConfig, LifecycleState, WidgetError, WidgetStatus};

/// Commandes envoyées au gestionnaire
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCommand {
    /// Nouvelle paire (instrument, intervalle) à afficher
    Configure {
        ticker: InstrumentRef,
        interval: IntervalCode,
    },
    /// Retry demandé par l'utilisateur après une erreur
    Retry,
    /// Démontage : annule timers et observateurs, détruit le widget
    Unmount,
}

/// Source du signal de rendu (pour les logs)
#[derive(Debug, Clone, Copy)]
enum ReadySource {
    Callback,
    Observed,
}

/// Gestionnaire de cycle de vie (exécuté comme une tâche tokio)
pub struct WidgetLifecycle {
    library: Arc<dyn ChartLibrary>,
    config: LifecycleConfig,
    container: String,
    theme: Theme,

    ticker: InstrumentRef,
    interval: IntervalCode,

    state: LifecycleState,
    error: Option<WidgetError>,
    retry_count: u32,
    generation: u64,

    /// Instance vivante (au plus une)
    handle: Option<Box<dyn WidgetHandle>>,
    /// Chargement injecté par nous, en attente
    pending_load: Option<ScriptLoad>,
    /// Échéance du chargement ou du rendu en cours
    deadline: Option<Instant>,

    ready_tx: mpsc::UnboundedSender<u64>,
    ready_rx: mpsc::UnboundedReceiver<u64>,
    status_tx: mpsc::UnboundedSender<WidgetStatus>,
}

impl WidgetLifecycle {
    pub fn new(
        library: Arc<dyn ChartLibrary>,
        config: LifecycleConfig,
        container: impl Into<String>,
        theme: Theme,
        ticker: InstrumentRef,
        interval: IntervalCode,
        status_tx: mpsc::UnboundedSender<WidgetStatus>,
    ) -> Self {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        Self {
            library,
            config,
            container: container.into(),
            theme,
            ticker,
            interval,
            state: LifecycleState::Uninitialized,
            error: None,
            retry_count: 0,
            generation: 0,
            handle: None,
            pending_load: None,
            deadline: None,
            ready_tx,
            ready_rx,
            status_tx,
        }
    }

    /// Boucle principale de l'acteur
    ///
    /// Se termine sur `Unmount` ou quand tous les émetteurs de commandes
    /// sont fermés. Aucun statut n'est publié après la sortie de boucle.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<WidgetCommand>) {
        info!(container = %self.container, ticker = %self.ticker, interval = %self.interval, "Chart widget mounted");

        loop {
            self.advance();

            let deadline = self.deadline;
            let poll_after = self.poll_interval();

            // CONCEPT : select! sur plusieurs sources d'événements
            // - Les branches sans objet attendent une future qui ne se
            //   termine jamais (pending), elles sont donc inertes
            tokio::select! {
                command = commands.recv() => match command {
                    Some(WidgetCommand::Configure { ticker, interval }) => self.configure(ticker, interval),
                    Some(WidgetCommand::Retry) => self.retry(),
                    Some(WidgetCommand::Unmount) | None => break,
                },
                outcome = wait_script(&mut self.pending_load) => self.on_script_outcome(outcome),
                Some(generation) = self.ready_rx.recv() => self.on_ready(generation, ReadySource::Callback),
                _ = sleep_for(poll_after) => self.on_poll(),
                _ = sleep_until(deadline) => self.on_deadline(),
            }
        }

        self.teardown();
    }

    // ------------------------------------------------------------------------
    // Transitions synchrones
    // ------------------------------------------------------------------------

    /// Enchaîne les transitions qui ne dépendent d'aucun événement externe
    fn advance(&mut self) {
        loop {
            match self.state {
                LifecycleState::Uninitialized => self.check_script(),
                LifecycleState::ScriptReady => self.instantiate(),
                _ => return,
            }
        }
    }

    /// Uninitialized → ScriptReady | ScriptLoading
    fn check_script(&mut self) {
        match self.library.script_status() {
            ScriptStatus::Available => {
                debug!("Chart library already available");
                self.transition(LifecycleState::ScriptReady);
            }
            ScriptStatus::Loading => {
                debug!("Chart script load already in progress, polling");
                self.pending_load = None;
                self.deadline = Some(Instant::now() + self.config.script_timeout);
                self.transition(LifecycleState::ScriptLoading);
            }
            ScriptStatus::Absent => {
                info!("Injecting chart script");
                self.pending_load = Some(self.library.inject_script());
                self.deadline = Some(Instant::now() + self.config.script_timeout);
                self.transition(LifecycleState::ScriptLoading);
            }
        }
    }

    /// ScriptReady → WidgetInitializing (ou WidgetFailed)
    ///
    /// L'instance précédente est toujours détruite avant d'en créer une.
    fn instantiate(&mut self) {
        if !self.library.container_exists(&self.container) {
            self.fail(LifecycleState::WidgetFailed, WidgetError::ContainerNotFound);
            return;
        }
        if self.library.script_status() != ScriptStatus::Available {
            self.fail(LifecycleState::WidgetFailed, WidgetError::LibraryNotLoaded);
            return;
        }

        self.destroy_widget();
        self.generation += 1;

        let options = WidgetOptions::new(&self.ticker, &self.interval, &self.container, self.theme);
        let notifier = ReadyNotifier::new(self.generation, self.ready_tx.clone());

        match self.library.create_widget(&options, notifier) {
            Ok(handle) => {
                info!(generation = self.generation, ticker = %self.ticker, interval = %self.interval, "Chart widget created");
                self.handle = Some(handle);
                self.deadline = Some(Instant::now() + self.config.ready_timeout);
                self.transition(LifecycleState::WidgetInitializing);
            }
            Err(e) => self.fail(LifecycleState::WidgetFailed, WidgetError::Creation(e)),
        }
    }

    // ------------------------------------------------------------------------
    // Événements
    // ------------------------------------------------------------------------

    fn configure(&mut self, ticker: InstrumentRef, interval: IntervalCode) {
        if ticker == self.ticker && interval == self.interval {
            debug!(ticker = %ticker, interval = %interval, "Chart already configured for this pair");
            return;
        }

        info!(ticker = %ticker, interval = %interval, state = ?self.state, "Reconfiguring chart widget");
        self.ticker = ticker;
        self.interval = interval;

        match self.state {
            // Le widget sera construit avec la nouvelle paire une fois le
            // script disponible
            LifecycleState::Uninitialized | LifecycleState::ScriptLoading | LifecycleState::ScriptReady => {
                self.publish();
            }
            // Le script n'est pas rechargé, seul le widget est reconstruit
            LifecycleState::WidgetInitializing | LifecycleState::WidgetReady => {
                self.deadline = None;
                self.transition(LifecycleState::ScriptReady);
            }
            LifecycleState::ScriptLoadFailed | LifecycleState::WidgetTimedOut | LifecycleState::WidgetFailed => {
                self.error = None;
                self.deadline = None;
                self.transition(LifecycleState::Uninitialized);
            }
        }
    }

    fn retry(&mut self) {
        if self.error.is_none() {
            debug!(state = ?self.state, "Retry requested without error, ignoring");
            return;
        }
        if self.retry_count >= self.config.max_retries {
            warn!(retries = self.retry_count, "Chart retry budget exhausted");
            return;
        }

        self.retry_count += 1;
        info!(attempt = self.retry_count, max = self.config.max_retries, "Retrying chart initialization");

        self.error = None;
        self.pending_load = None;
        self.deadline = None;
        self.destroy_widget();
        self.transition(LifecycleState::Uninitialized);
    }

    fn on_script_outcome(&mut self, outcome: Result<(), String>) {
        self.pending_load = None;
        if self.state != LifecycleState::ScriptLoading {
            return;
        }

        match outcome {
            Ok(()) => {
                info!("Chart script loaded");
                self.deadline = None;
                self.transition(LifecycleState::ScriptReady);
            }
            Err(e) => self.fail(LifecycleState::ScriptLoadFailed, WidgetError::ScriptLoad(e)),
        }
    }

    fn on_ready(&mut self, generation: u64, source: ReadySource) {
        if generation != self.generation || self.state != LifecycleState::WidgetInitializing {
            debug!(generation, current = self.generation, state = ?self.state, ?source, "Ignoring stale readiness signal");
            return;
        }

        info!(generation, ?source, ticker = %self.ticker, "Chart widget ready");
        self.deadline = None;
        self.retry_count = 0;
        self.transition(LifecycleState::WidgetReady);
    }

    fn on_poll(&mut self) {
        match self.state {
            LifecycleState::ScriptLoading => {
                if self.library.script_status() == ScriptStatus::Available {
                    info!("Chart script became available");
                    self.deadline = None;
                    self.transition(LifecycleState::ScriptReady);
                }
            }
            LifecycleState::WidgetInitializing => {
                if self.library.surface_rendered(&self.container) {
                    self.on_ready(self.generation, ReadySource::Observed);
                }
            }
            _ => {}
        }
    }

    fn on_deadline(&mut self) {
        self.deadline = None;
        match self.state {
            LifecycleState::ScriptLoading => {
                self.pending_load = None;
                self.fail(LifecycleState::ScriptLoadFailed, WidgetError::LoadTimeout);
            }
            LifecycleState::WidgetInitializing => {
                self.fail(LifecycleState::WidgetTimedOut, WidgetError::ReadinessTimeout);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Polling actif uniquement quand on attend un effet observable
    fn poll_interval(&self) -> Option<Duration> {
        match self.state {
            LifecycleState::ScriptLoading if self.pending_load.is_none() => {
                Some(self.config.poll_interval)
            }
            LifecycleState::WidgetInitializing => Some(self.config.surface_probe_interval),
            _ => None,
        }
    }

    fn fail(&mut self, state: LifecycleState, error: WidgetError) {
        warn!(error = %error, retries = self.retry_count, ticker = %self.ticker, "Chart widget error");
        self.error = Some(error);
        self.transition(state);
    }

    fn transition(&mut self, state: LifecycleState) {
        debug!(from = ?self.state, to = ?state, "Chart lifecycle transition");
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        let _ = self.status_tx.send(self.status());
    }

    fn status(&self) -> WidgetStatus {
        WidgetStatus {
            state: self.state,
            ticker: self.ticker.clone(),
            interval: self.interval.clone(),
            generation: self.generation,
            error: self.error.clone(),
            retry_count: self.retry_count,
            max_retries: self.config.max_retries,
        }
    }

    fn destroy_widget(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(generation = self.generation, "Destroying chart widget");
            handle.destroy();
        }
    }

    fn teardown(&mut self) {
        self.pending_load = None;
        self.deadline = None;
        self.destroy_widget();
        info!(container = %self.container, "Chart widget unmounted");
    }
}

/// Attend le résultat du chargement injecté, s'il y en a un
async fn wait_script(pending: &mut Option<ScriptLoad>) -> Result<(), String> {
    match pending {
        Some(rx) => match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err("script loader went away".to_string()),
        },
        None => future::pending().await,
    }
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => time::sleep(duration).await,
        None => future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
// CONCEPT : #[tokio::test(start_paused = true)]
// - Le temps tokio est virtuel et avance automatiquement quand toutes les
//   tâches attendent un timer
// - Les délais de 10-15s s'exécutent instantanément
// ============================================================================
