// ============================================================================
// Panneaux du dashboard
// ============================================================================
// - Sélecteurs (gauche) : Popular, Recent, Watchlist, Portfolio
// - Chart : statut du cycle de vie du widget et page générée
// - AI Analysis : chargement, erreur générique ou rapport
// ============================================================================

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Panel};
use crate::models::{relative_age, AnalysisReport, InstrumentRef};
use crate::widget::LifecycleState;

/// Bloc d'un panneau, bordure jaune quand il a le focus
fn panel_block(app: &App, panel: Panel, title: String) -> Block<'static> {
    let color = if app.focus == panel { Color::Yellow } else { Color::Cyan };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

/// Style d'une ligne : surlignée si sous le curseur du panneau actif,
/// verte si c'est le ticker courant
fn row_style(app: &App, panel: Panel, index: usize, ticker: &str) -> Style {
    let mut style = if ticker == app.ticker().as_str() {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };
    if app.focus == panel && index == app.selected_index {
        style = style.add_modifier(Modifier::BOLD).add_modifier(Modifier::REVERSED);
    }
    style
}

fn empty_hint(block: Block<'static>, text: &'static str) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(text, Style::default().fg(Color::Gray))))
        .block(block)
        .alignment(Alignment::Center)
}

// ============================================================================
// Sélecteurs
// ============================================================================

pub fn render_popular(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = App::popular_entries()
        .enumerate()
        .map(|(index, raw)| {
            // Les boutons affichent le symbole, l'exchange à côté
            let (symbol, venue) = match InstrumentRef::parse(raw) {
                Some(instrument) => (
                    instrument.symbol().to_string(),
                    instrument.exchange().unwrap_or("stock").to_ascii_lowercase(),
                ),
                None => (raw.to_string(), String::new()),
            };
            ListItem::new(format!(" {:<10} {}", symbol, venue)).style(row_style(app, Panel::Popular, index, raw))
        })
        .collect();

    let block = panel_block(app, Panel::Popular, " Popular ".to_string());
    frame.render_widget(List::new(items).block(block), area);
}

pub fn render_recent(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, Panel::Recent, " Recent ".to_string());
    let recents = app.selection.recents();
    if recents.is_empty() {
        frame.render_widget(empty_hint(block, "No recent tickers"), area);
        return;
    }

    let items: Vec<ListItem> = recents
        .iter()
        .enumerate()
        .map(|(index, ticker)| {
            ListItem::new(format!(" {}", ticker)).style(row_style(app, Panel::Recent, index, ticker.as_str()))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

pub fn render_watchlist(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, Panel::Watchlist, format!(" Watchlist ({}) ", app.watchlist.len()));
    if app.watchlist.is_empty() {
        frame.render_widget(empty_hint(block, "Press [w] to watch the current ticker"), area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = app
        .watchlist
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let line = format!(
                " {:<10} {:<16} {}",
                entry.ticker.symbol(),
                entry.label(),
                relative_age(entry.added_at, now)
            );
            ListItem::new(line).style(row_style(app, Panel::Watchlist, index, entry.ticker.as_str()))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

pub fn render_portfolio(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(
        app,
        Panel::Portfolio,
        format!(" Portfolio · ${:.2} ", app.portfolio.total_value()),
    );
    if app.portfolio.is_empty() {
        frame.render_widget(empty_hint(block, "Press [p] to add a position"), area);
        return;
    }

    let items: Vec<ListItem> = app
        .portfolio
        .positions()
        .iter()
        .enumerate()
        .map(|(index, position)| {
            let mut line = format!(
                " {:<10} {:>8} @ {:>10.2} = {:>12.2}",
                position.ticker.symbol(),
                position.quantity,
                position.average_price,
                position.value()
            );
            if let Some(notes) = &position.notes {
                line.push_str("  ");
                line.push_str(notes);
            }
            ListItem::new(line).style(row_style(app, Panel::Portfolio, index, position.ticker.as_str()))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

// ============================================================================
// Chart
// ============================================================================

pub fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let status = &app.chart;

    let (label, color) = match status.state {
        LifecycleState::Uninitialized => ("Starting", Color::Gray),
        LifecycleState::ScriptLoading => ("Loading chart library", Color::Yellow),
        LifecycleState::ScriptReady => ("Chart library ready", Color::Yellow),
        LifecycleState::WidgetInitializing => ("Rendering chart", Color::Yellow),
        LifecycleState::WidgetReady => ("Ready", Color::Green),
        LifecycleState::ScriptLoadFailed | LifecycleState::WidgetTimedOut | LifecycleState::WidgetFailed => {
            ("Error", Color::Red)
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} · {}", status.ticker, status.interval.label()),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from(Span::styled(status.message(), Style::default().fg(color))),
    ];

    if status.is_ready() {
        lines.push(Line::from(Span::styled(
            "Open the generated chart page in a browser to view it.",
            Style::default().fg(Color::Gray),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Charting data provided by TradingView.",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chart ");

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

// ============================================================================
// AI Analysis
// ============================================================================

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

fn field(name: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", name), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value.to_string()),
    ])
}

/// Couleur associée à une tendance ou un sentiment
fn tone(value: &str) -> Color {
    match value.to_ascii_lowercase().as_str() {
        "bullish" | "positive" => Color::Green,
        "bearish" | "negative" => Color::Red,
        _ => Color::Yellow,
    }
}

pub fn render_analysis(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.analysis.result() {
        Some(result) => format!(" {} ", result.heading()),
        None => " AI Analysis ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(title);

    let mut lines: Vec<Line> = Vec::new();

    if app.analysis.is_loading() {
        lines.push(Line::from(Span::styled(
            "Analyzing chart...",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK),
        )));
    } else if let Some(error) = app.analysis.error() {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
    } else if let Some(result) = app.analysis.result() {
        match &result.report {
            AnalysisReport::Text(text) => {
                lines.push(Line::from(text.analysis.clone()));
            }
            AnalysisReport::Structured(report) => {
                lines.push(heading("Summary"));
                lines.push(Line::from(report.summary.clone()));
                lines.push(Line::from(""));

                let technical = &report.technical_analysis;
                lines.push(heading("Technical Analysis"));
                lines.push(Line::from(vec![
                    Span::styled("Trend: ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(technical.trend.clone(), Style::default().fg(tone(&technical.trend))),
                ]));
                lines.push(field("Support", &technical.support));
                lines.push(field("Resistance", &technical.resistance));
                if !technical.patterns.is_empty() {
                    lines.push(field("Patterns", &technical.patterns.join(", ")));
                }
                lines.push(Line::from(""));

                let fundamental = &report.fundamental_analysis;
                lines.push(heading("Fundamental Analysis"));
                lines.push(field("Market Cap", &fundamental.market_cap));
                lines.push(field("P/E Ratio", &fundamental.pe_ratio));
                lines.push(Line::from(fundamental.earnings_summary.clone()));
                lines.push(Line::from(""));

                let news = &report.news_sentiment;
                lines.push(Line::from(vec![
                    Span::styled(
                        "News Sentiment  ",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(news.sentiment.clone(), Style::default().fg(tone(&news.sentiment))),
                ]));
                lines.push(Line::from(news.summary.clone()));
            }
        }
    } else {
        lines.push(Line::from(Span::styled(
            format!("Press [a] to analyze {} with AI.", app.ticker()),
            Style::default().fg(Color::Gray),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "AI analysis is for informational purposes only and should not be considered financial advice.",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
