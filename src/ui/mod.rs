// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod dashboard; // Layout, header et footer
pub mod events;    // Gestion des événements clavier
pub mod panels;    // Sélecteurs, graphique et analyse

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{Event, EventHandler};
