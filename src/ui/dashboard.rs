// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine l'interface TUI en utilisant les widgets de ratatui
//
//   ┌──────────────────── header ─────────────────────┐
//   │ Popular   │  Chart (statut du widget)           │
//   │ Recent    ├─────────────────────────────────────┤
//   │ Watchlist │  AI Analysis                        │
//   │ Portfolio │                                     │
//   └──────────────────── footer ─────────────────────┘
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Layout : découpage de l'espace en zones (imbriqué ici)
// 3. Style : couleurs et attributs de texte
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Panel};
use crate::ui::panels;

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);

    if app.is_in_input_mode() {
        render_input_footer(frame, app, chunks[2]);
    } else {
        render_footer(frame, app, chunks[2]);
    }
}

/// Crée le layout principal (header, content, footer)
///
/// CONCEPT RUST : Rc<[T]> vs Vec<T>
/// - Layout::split() retourne Rc<[Rect]>
/// - On le convertit en Vec avec .to_vec() pour simplifier
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(4), // Footer : raccourcis + statut
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header : ticker et intervalle courants
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chart Glance ")
        .title_alignment(Alignment::Center);

    let ticker = app.ticker();
    let star = if app.is_current_watched() { "★" } else { "☆" };

    let mut spans = vec![
        Span::styled(
            ticker.as_str().to_string(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(ticker.display_name(), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(star, Style::default().fg(Color::Yellow)),
        Span::raw("   Interval: "),
    ];

    // L'intervalle courant est mis en évidence parmi l'ensemble proposé
    for interval in crate::models::IntervalCode::supported() {
        let style = if &interval == app.interval() {
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", interval.label()), style));
    }
    if !app.interval().is_supported() {
        spans.push(Span::styled(
            format!(" {} ", app.interval()),
            Style::default().fg(Color::Black).bg(Color::Magenta),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Main Content
// ============================================================================

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(area);

    let selectors = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(12), // 10 populaires + bordures
            Constraint::Length(7),  // 5 récents + bordures
            Constraint::Min(4),
            Constraint::Min(4),
        ])
        .split(columns[0]);

    panels::render_popular(frame, app, selectors[0]);
    panels::render_recent(frame, app, selectors[1]);
    panels::render_watchlist(frame, app, selectors[2]);
    panels::render_portfolio(frame, app, selectors[3]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(columns[1]);

    panels::render_chart(frame, app, right[0]);
    panels::render_analysis(frame, app, right[1]);
}

// ============================================================================
// Footer : Instructions
// ============================================================================

fn key(label: &str, color: Color) -> Span<'_> {
    Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let warning = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let blinking = Style::default()
        .fg(Color::Red)
        .add_modifier(Modifier::BOLD)
        .add_modifier(Modifier::SLOW_BLINK);

    let shortcuts = if app.is_awaiting_delete_confirmation() {
        let target = app.highlighted_ticker().unwrap_or_else(|| "?".to_string());
        Line::from(vec![
            Span::styled("⚠  Press ", warning),
            Span::styled("[d]", blinking),
            Span::styled(format!(" again to delete {} or any other key to cancel ⚠", target), warning),
        ])
    } else if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled("⚠  Press ", warning),
            Span::styled("[q]", blinking),
            Span::styled(" again to quit, or any other key to cancel ⚠", warning),
        ])
    } else {
        let mut spans = vec![
            key("[q]", Color::Yellow),
            Span::raw(" Quit  "),
            key("[Tab]", Color::Yellow),
            Span::raw(" Panel  "),
            key("[j k]", Color::Yellow),
            Span::raw(" Move  "),
            key("[Enter]", Color::Yellow),
            Span::raw(" Select  "),
            key("[/]", Color::Green),
            Span::raw(" Ticker  "),
            key("[h l]", Color::Yellow),
            Span::raw(" Interval  "),
            key("[w]", Color::Green),
            Span::raw(" Watch  "),
            key("[p]", Color::Green),
            Span::raw(" Position  "),
            key("[a]", Color::Magenta),
            Span::raw(" Analyze  "),
            key("[e/E]", Color::Magenta),
            Span::raw(" Export"),
        ];
        if app.chart.can_retry() {
            spans.push(Span::raw("  "));
            spans.push(key("[r]", Color::Red));
            spans.push(Span::raw(" Retry chart"));
        }
        if matches!(app.focus, Panel::Watchlist | Panel::Portfolio) {
            spans.push(Span::raw("  "));
            spans.push(key("[d]", Color::Red));
            spans.push(Span::raw(" Delete"));
        }
        Line::from(spans)
    };

    let status = Line::from(Span::styled(
        app.status_message.clone().unwrap_or_default(),
        Style::default().fg(Color::Gray),
    ));

    let paragraph = Paragraph::new(vec![shortcuts, status])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Input Mode : Saisie de ticker / position
// ============================================================================

fn render_input_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green)); // Vert pour indiquer mode input

    let input_line = Line::from(vec![
        Span::styled(
            &app.input_prompt,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(&app.input_buffer, Style::default().fg(Color::White)),
        Span::styled(
            "█", // Curseur
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ),
    ]);

    let help_line = Line::from(vec![
        key("[Enter]", Color::Green),
        Span::raw(" Confirm  "),
        key("[ESC]", Color::Red),
        Span::raw(" Cancel"),
    ]);

    let paragraph = Paragraph::new(vec![input_line, help_line])
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}
