// ============================================================================
// Gestion des événements
// ============================================================================
// Lit le clavier et produit des ticks réguliers pour que la boucle
// principale récupère les statuts du widget et les résultats d'analyse
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Pattern matching avec guards (matches!)
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (statuts du widget, résultats du worker)
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Lit le prochain événement (bloquant au plus `tick_rate`)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - Si pas d'événement, retourne Ok(Event::Tick)
    /// - Seuls les Press sont remontés (certains OS envoient aussi Release)
    pub fn next(&self) -> Result<Event> {
        if !event::poll(self.tick_rate)? {
            return Ok(Event::Tick);
        }

        match event::read()? {
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
            _ => Ok(Event::Tick),
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

// ============================================================================
// Helpers : identifier la touche
// ============================================================================

fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        Event::Tick => None,
    }
}

/// 'q' ou Ctrl+C
pub fn is_quit_event(event: &Event) -> bool {
    match event {
        Event::Key(key) => {
            matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
                || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        }
        Event::Tick => false,
    }
}

pub fn is_escape_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Esc))
}

pub fn is_enter_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Enter))
}

/// Flèche haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Up | KeyCode::Char('k')))
}

/// Flèche bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Down | KeyCode::Char('j')))
}

/// Tab : panneau suivant
pub fn is_tab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Tab))
}

/// Shift+Tab : panneau précédent
pub fn is_backtab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::BackTab))
}

/// 'l' ou flèche droite : intervalle suivant
pub fn is_next_interval_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('l') | KeyCode::Right))
}

/// 'h' ou flèche gauche : intervalle précédent
pub fn is_previous_interval_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('h') | KeyCode::Left))
}

/// '/' : saisie d'un ticker
pub fn is_ticker_input_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('/')))
}

/// 'w' : ajoute/retire le ticker courant de la watchlist
pub fn is_watch_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('w')))
}

pub fn is_delete_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('d')))
}

/// 'p' : saisie d'une position
pub fn is_position_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('p')))
}

/// 'r' : relance le widget après une erreur
pub fn is_retry_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('r')))
}

/// 'a' : analyse IA
pub fn is_analyze_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('a')))
}

/// 'e' : export texte
pub fn is_export_text_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('e')))
}

/// 'E' : export JSON
pub fn is_export_json_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('E')))
}

pub fn is_backspace_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Backspace))
}

/// Caractère imprimable (saisie libre : ticker, "AAPL 10 150.5 note")
pub fn is_input_char_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char(c)) if !c.is_control())
}

/// Extrait le caractère d'un événement clavier si c'est un caractère
pub fn get_char_from_event(event: &Event) -> Option<char> {
    match key_code(event) {
        Some(KeyCode::Char(c)) => Some(c),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(is_quit_event(&Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))));
        assert!(!is_quit_event(&key(KeyCode::Char('c'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_navigation_keys() {
        assert!(is_up_event(&key(KeyCode::Char('k'))));
        assert!(is_down_event(&key(KeyCode::Down)));
        assert!(is_tab_event(&key(KeyCode::Tab)));
        assert!(is_backtab_event(&key(KeyCode::BackTab)));
        assert!(is_next_interval_event(&key(KeyCode::Char('l'))));
        assert!(is_previous_interval_event(&key(KeyCode::Left)));
    }

    #[test]
    fn test_export_keys_are_case_sensitive() {
        assert!(is_export_text_event(&key(KeyCode::Char('e'))));
        assert!(!is_export_json_event(&key(KeyCode::Char('e'))));
        assert!(is_export_json_event(&key(KeyCode::Char('E'))));
    }

    #[test]
    fn test_input_chars() {
        assert!(is_input_char_event(&key(KeyCode::Char(':'))));
        assert!(is_input_char_event(&key(KeyCode::Char(' '))));
        assert!(!is_input_char_event(&key(KeyCode::Enter)));
        assert_eq!(get_char_from_event(&key(KeyCode::Char('x'))), Some('x'));
        assert_eq!(get_char_from_event(&Event::Tick), None);
    }
}
