// ============================================================================
// Chart Widget Manager : façade côté UI
// ============================================================================
// L'UI est synchrone (boucle crossterm) : elle ne peut pas .await
//
// CONCEPT : Pont sync/async
// - mount() lance l'acteur WidgetLifecycle sur le runtime tokio
// - configure() / retry() envoient des commandes (non bloquant)
// - poll_status() draine les statuts publiés, à chaque tick de l'UI
// ============================================================================

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::{InstrumentRef, IntervalCode};
use crate::widget::library::{ChartLibrary, Theme};
use crate::widget::lifecycle::{WidgetCommand, WidgetLifecycle};
use crate::widget::state::{LifecycleConfig, WidgetStatus};

pub struct ChartWidgetManager {
    commands: mpsc::UnboundedSender<WidgetCommand>,
    statuses: mpsc::UnboundedReceiver<WidgetStatus>,
    status: WidgetStatus,
    task: JoinHandle<()>,
}

impl ChartWidgetManager {
    /// Monte le widget dans `container` et lance son cycle de vie
    pub fn mount(
        runtime: &Handle,
        library: Arc<dyn ChartLibrary>,
        config: LifecycleConfig,
        container: &str,
        theme: Theme,
        ticker: InstrumentRef,
        interval: IntervalCode,
    ) -> Self {
        let (status_tx, statuses) = mpsc::unbounded_channel();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let status = WidgetStatus::initial(ticker.clone(), interval.clone(), config.max_retries);
        let lifecycle = WidgetLifecycle::new(
            library, config, container, theme, ticker, interval, status_tx,
        );
        let task = runtime.spawn(lifecycle.run(command_rx));

        Self {
            commands,
            statuses,
            status,
            task,
        }
    }

    /// Demande l'affichage d'une nouvelle paire (instrument, intervalle)
    pub fn configure(&self, ticker: InstrumentRef, interval: IntervalCode) {
        self.send(WidgetCommand::Configure { ticker, interval });
    }

    pub fn retry(&self) {
        self.send(WidgetCommand::Retry);
    }

    /// Récupère les statuts publiés depuis le dernier appel
    ///
    /// Retourne true si le statut affiché a changé.
    pub fn poll_status(&mut self) -> bool {
        let mut updated = false;
        while let Ok(status) = self.statuses.try_recv() {
            self.status = status;
            updated = true;
        }
        updated
    }

    pub fn status(&self) -> &WidgetStatus {
        &self.status
    }

    /// Démonte le widget et attend la fin de l'acteur
    pub async fn unmount(self) {
        self.send(WidgetCommand::Unmount);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Chart widget task ended abnormally");
        }
    }

    fn send(&self, command: WidgetCommand) {
        if self.commands.send(command).is_err() {
            debug!("Chart widget task already stopped, command dropped");
        }
    }
}
