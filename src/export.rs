// ============================================================================
// Export de l'analyse
// ============================================================================
// Deux formats dérivés du dernier rapport :
// - Text : rapport lisible, sections séparées
// - Json : document {ticker, interval, timestamp, analysis, disclaimer}
//
// Nom de fichier : chart-analysis-<ticker>-<interval>-<YYYY-MM-DD>.<ext>
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::analysis::CompletedAnalysis;
use crate::models::{AnalysisReport, InstrumentRef, IntervalCode};

pub const DISCLAIMER: &str =
    "This analysis is for informational purposes only and should not be considered financial advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}

/// Nom du fichier exporté
///
/// Les ':' des tickers qualifiés sont remplacés par '-'.
pub fn file_name(ticker: &InstrumentRef, interval: &IntervalCode, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "chart-analysis-{}-{}-{}.{}",
        ticker.as_str().replace(':', "-"),
        interval.as_str().replace(':', "-"),
        now.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Rapport texte
pub fn render_text(analysis: &CompletedAnalysis, now: DateTime<Utc>) -> String {
    let rule = "=====================================";
    let mut out = String::new();

    // CONCEPT RUST : fmt::Write sur String
    // - writeln! vers une String ne peut pas échouer
    let _ = writeln!(out, "Chart Glance - AI Analysis Report");
    let _ = writeln!(out, "{rule}\n");
    let _ = writeln!(out, "Ticker: {}", analysis.ticker);
    let _ = writeln!(out, "Timeframe: {}", analysis.interval);
    let _ = writeln!(out, "Generated: {}\n", now.format("%Y-%m-%d %H:%M:%S UTC"));

    match &analysis.report {
        AnalysisReport::Text(text) => {
            section(&mut out, "ANALYSIS");
            let _ = writeln!(out, "{}\n", text.analysis);
        }
        AnalysisReport::Structured(report) => {
            section(&mut out, "SUMMARY");
            let _ = writeln!(out, "{}\n", report.summary);

            let technical = &report.technical_analysis;
            section(&mut out, "TECHNICAL ANALYSIS");
            let _ = writeln!(out, "Trend: {}", technical.trend);
            let _ = writeln!(out, "Support Level: {}", technical.support);
            let _ = writeln!(out, "Resistance Level: {}", technical.resistance);
            if technical.patterns.is_empty() {
                let _ = writeln!(out, "No notable chart patterns identified\n");
            } else {
                let _ = writeln!(out, "Chart Patterns: {}\n", technical.patterns.join(", "));
            }

            let fundamental = &report.fundamental_analysis;
            section(&mut out, "FUNDAMENTAL ANALYSIS");
            let _ = writeln!(out, "Market Cap: {}", fundamental.market_cap);
            let _ = writeln!(out, "P/E Ratio: {}", fundamental.pe_ratio);
            let _ = writeln!(out, "Earnings Summary: {}\n", fundamental.earnings_summary);

            section(&mut out, "NEWS SENTIMENT");
            let _ = writeln!(out, "Overall Sentiment: {}", report.news_sentiment.sentiment);
            let _ = writeln!(out, "Summary: {}\n", report.news_sentiment.summary);
        }
    }

    let _ = writeln!(out, "{rule}");
    let _ = write!(out, "Disclaimer: {DISCLAIMER}");
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}\n{}", title, "-".repeat(title.len()));
}

#[derive(Serialize)]
struct JsonExport<'a> {
    ticker: &'a InstrumentRef,
    interval: &'a IntervalCode,
    timestamp: String,
    analysis: &'a AnalysisReport,
    disclaimer: &'static str,
}

/// Document JSON indenté
pub fn render_json(analysis: &CompletedAnalysis, now: DateTime<Utc>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonExport {
        ticker: &analysis.ticker,
        interval: &analysis.interval,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        analysis: &analysis.report,
        disclaimer: DISCLAIMER,
    })
}

/// Écrit l'export dans `dir` et retourne le chemin du fichier
pub fn write_export(dir: &Path, analysis: &CompletedAnalysis, format: ExportFormat, now: DateTime<Utc>) -> Result<PathBuf> {
    let content = match format {
        ExportFormat::Text => render_text(analysis, now),
        ExportFormat::Json => render_json(analysis, now).context("Failed to serialize analysis")?,
    };

    fs::create_dir_all(dir).with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(file_name(&analysis.ticker, &analysis.interval, format, now));
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), ?format, "Analysis exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{FundamentalAnalysis, NewsSentiment, TechnicalAnalysis};
    use crate::models::{StructuredAnalysis, TextAnalysis};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap()
    }

    fn structured() -> CompletedAnalysis {
        CompletedAnalysis {
            ticker: InstrumentRef::parse("COINBASE:BTCUSD").unwrap(),
            interval: IntervalCode::new("240"),
            received_at: now(),
            report: AnalysisReport::Structured(StructuredAnalysis {
                summary: "Consolidating below resistance.".into(),
                technical_analysis: TechnicalAnalysis {
                    trend: "Neutral".into(),
                    support: "60,000".into(),
                    resistance: "72,000".into(),
                    patterns: vec!["Ascending Triangle".into(), "Double Bottom".into()],
                },
                fundamental_analysis: FundamentalAnalysis {
                    market_cap: "1.3T".into(),
                    pe_ratio: "N/A".into(),
                    earnings_summary: "Not applicable.".into(),
                },
                news_sentiment: NewsSentiment {
                    sentiment: "Positive".into(),
                    summary: "Based on recent simulated news...".into(),
                },
            }),
        }
    }

    #[test]
    fn test_file_name_replaces_colons() {
        let analysis = structured();
        assert_eq!(
            file_name(&analysis.ticker, &analysis.interval, ExportFormat::Json, now()),
            "chart-analysis-COINBASE-BTCUSD-240-2024-03-09.json"
        );
    }

    #[test]
    fn test_text_report_sections() {
        let text = render_text(&structured(), now());
        assert!(text.starts_with("Chart Glance - AI Analysis Report"));
        assert!(text.contains("Ticker: COINBASE:BTCUSD"));
        assert!(text.contains("Timeframe: 240"));
        assert!(text.contains("Generated: 2024-03-09 14:30:00 UTC"));
        assert!(text.contains("TECHNICAL ANALYSIS\n------------------\nTrend: Neutral"));
        assert!(text.contains("Chart Patterns: Ascending Triangle, Double Bottom"));
        assert!(text.contains("P/E Ratio: N/A"));
        assert!(text.ends_with(DISCLAIMER));
    }

    #[test]
    fn test_text_report_for_free_text_shape() {
        let mut analysis = structured();
        analysis.report = AnalysisReport::Text(TextAnalysis {
            analysis: "Range-bound.".into(),
        });
        let text = render_text(&analysis, now());
        assert!(text.contains("ANALYSIS\n--------\nRange-bound."));
        assert!(!text.contains("SUMMARY"));
    }

    #[test]
    fn test_json_document() {
        let json = render_json(&structured(), now()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["ticker"], "COINBASE:BTCUSD");
        assert_eq!(value["interval"], "240");
        assert_eq!(value["timestamp"], "2024-03-09T14:30:00.000Z");
        assert_eq!(value["analysis"]["technicalAnalysis"]["trend"], "Neutral");
        assert_eq!(value["disclaimer"], DISCLAIMER);
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), &structured(), ExportFormat::Text, now()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "chart-analysis-COINBASE-BTCUSD-240-2024-03-09.txt"
        );
        assert!(fs::read_to_string(path).unwrap().contains("SUMMARY"));
    }
}
