// ============================================================================
// Chart Library : TradingView (tv.js)
// ============================================================================
// Implémentation concrète de ChartLibrary pour l'hôte terminal
//
// - Le script tv.js est téléchargé une seule fois par session (reqwest)
//   puis mis en cache à côté des conteneurs
// - Un "conteneur" est un répertoire possédé par le panneau du graphique
// - Créer un widget = générer la page d'embed `chart.html` dans le conteneur,
//   avec l'appel `new TradingView.widget({...})`
// - Le rendu est observable : la page existe et cible bien le conteneur
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument, warn};

use crate::widget::{ChartLibrary, ReadyNotifier, ScriptLoad, ScriptStatus, WidgetHandle, WidgetOptions};

/// Nom du fichier de cache du script
const SCRIPT_FILE: &str = "tv.js";
/// Page générée dans chaque conteneur
const EMBED_FILE: &str = "chart.html";

/// État global du script pour la session
#[derive(Debug)]
struct ScriptSlot {
    status: ScriptStatus,
}

/// Librairie TradingView, partagée entre tous les widgets de la session
///
/// CONCEPT RUST : Arc<Mutex<T>> dans une tâche spawnée
/// - Le téléchargement tourne dans une tâche tokio séparée
/// - Il met à jour le slot partagé quand il se termine
#[derive(Debug, Clone)]
pub struct TradingViewLibrary {
    client: reqwest::Client,
    script_url: String,
    root: PathBuf,
    slot: Arc<Mutex<ScriptSlot>>,
}

impl TradingViewLibrary {
    /// `root` contient le cache du script et les répertoires conteneurs
    pub fn new(script_url: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chartglance/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            script_url: script_url.into(),
            root: root.into(),
            slot: Arc::new(Mutex::new(ScriptSlot {
                status: ScriptStatus::Absent,
            })),
        })
    }

    /// Crée (si besoin) le répertoire du conteneur et retourne son chemin
    pub fn prepare_container(&self, container: &str) -> Result<PathBuf> {
        let dir = self.container_dir(container);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create chart container {}", dir.display()))?;
        Ok(dir)
    }

    /// Chemin de la page générée pour un conteneur
    pub fn embed_path(&self, container: &str) -> PathBuf {
        self.container_dir(container).join(EMBED_FILE)
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    fn set_status(&self, status: ScriptStatus) {
        set_slot(&self.slot, status);
    }

    #[cfg(test)]
    fn mark_available(&self) {
        self.set_status(ScriptStatus::Available);
    }
}

fn set_slot(slot: &Mutex<ScriptSlot>, status: ScriptStatus) {
    match slot.lock() {
        Ok(mut slot) => slot.status = status,
        Err(poisoned) => poisoned.into_inner().status = status,
    }
}

impl ChartLibrary for TradingViewLibrary {
    fn script_status(&self) -> ScriptStatus {
        match self.slot.lock() {
            Ok(slot) => slot.status,
            Err(poisoned) => poisoned.into_inner().status,
        }
    }

    /// Lance le téléchargement de tv.js dans une tâche tokio
    ///
    /// Doit être appelé depuis le runtime (c'est le cas de l'acteur).
    fn inject_script(&self) -> ScriptLoad {
        let (tx, rx) = oneshot::channel();
        self.set_status(ScriptStatus::Loading);

        let client = self.client.clone();
        let url = self.script_url.clone();
        let target = self.root.join(SCRIPT_FILE);
        let slot = self.slot.clone();

        tokio::spawn(async move {
            let outcome = fetch_script(&client, &url, &target).await;
            match &outcome {
                Ok(bytes) => {
                    info!(bytes, "Chart script cached");
                    set_slot(&slot, ScriptStatus::Available);
                }
                Err(e) => {
                    error!(error = %e, "Chart script download failed");
                    set_slot(&slot, ScriptStatus::Absent);
                }
            }
            let _ = tx.send(outcome.map(|_| ()).map_err(|e| format!("{e:#}")));
        });

        rx
    }

    fn container_exists(&self, container: &str) -> bool {
        self.container_dir(container).is_dir()
    }

    fn create_widget(
        &self,
        options: &WidgetOptions,
        ready: ReadyNotifier,
    ) -> Result<Box<dyn WidgetHandle>, String> {
        let page = render_embed_page(options).map_err(|e| e.to_string())?;
        let path = self.embed_path(&options.container_id);

        fs::write(&path, page).map_err(|e| format!("{}: {}", path.display(), e))?;
        debug!(path = %path.display(), symbol = %options.symbol, "Embed page written");

        // La page est complète dès qu'elle est écrite
        ready.notify();

        Ok(Box::new(EmbedHandle { path }))
    }

    fn surface_rendered(&self, container: &str) -> bool {
        fs::read_to_string(self.embed_path(container))
            .map(|page| page.contains(&format!("\"container_id\":\"{container}\"")))
            .unwrap_or(false)
    }
}

/// Télécharge le script et l'écrit dans le cache ; retourne sa taille
#[instrument(skip(client, target))]
async fn fetch_script(client: &reqwest::Client, url: &str, target: &Path) -> Result<usize> {
    info!("Downloading chart script");

    let response = client
        .get(url)
        .send()
        .await
        .context("Chart script request failed")?;

    let status = response.status();
    debug!(status = %status, "Received HTTP response");
    if !status.is_success() {
        anyhow::bail!("Chart script server returned HTTP {}", status);
    }

    let body = response
        .bytes()
        .await
        .context("Failed to read chart script body")?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).context("Failed to create chart cache directory")?;
    }
    fs::write(target, &body)
        .with_context(|| format!("Failed to cache chart script at {}", target.display()))?;

    Ok(body.len())
}

/// Page HTML autonome qui charge tv.js et construit le widget
pub fn render_embed_page(options: &WidgetOptions) -> serde_json::Result<String> {
    let config = serde_json::to_string(options)?;
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{symbol} · {interval}</title>
<style>html, body, #{id} {{ margin: 0; height: 100%; }}</style>
</head>
<body>
<div id="{id}"></div>
<script src="../{script}"></script>
<script>
new TradingView.widget({config});
</script>
</body>
</html>
"#,
        symbol = options.symbol,
        interval = options.interval,
        id = options.container_id,
        script = SCRIPT_FILE,
        config = config,
    ))
}

/// Instance vivante : la page générée
struct EmbedHandle {
    path: PathBuf,
}

impl WidgetHandle for EmbedHandle {
    fn destroy(self: Box<Self>) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove embed page");
            }
        }
    }
}
