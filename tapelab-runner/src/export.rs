//! Artifact export: summary text, three tabular CSVs, and the full JSON report.

use crate::report::BacktestReport;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write the full artifact set into `dir` (created if missing):
/// `summary.txt`, `equity.csv`, `signals.csv`, `trades.csv`, `report.json`.
/// Returns the directory path.
pub fn save_artifacts(report: &BacktestReport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    std::fs::write(dir.join("summary.txt"), report.summary())
        .context("Failed to write summary.txt")?;
    write_equity_csv(&dir.join("equity.csv"), report)?;
    write_signals_csv(&dir.join("signals.csv"), report)?;
    write_trades_csv(&dir.join("trades.csv"), report)?;

    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(dir.join("report.json"), json).context("Failed to write report.json")?;

    Ok(dir.to_path_buf())
}

/// One row per equity snapshot.
pub fn write_equity_csv(path: &Path, report: &BacktestReport) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    writeln!(file, "timestamp,equity,cash,invested")?;
    for point in &report.equity_curve {
        writeln!(
            file,
            "{},{:.4},{:.4},{:.4}",
            point.timestamp.to_rfc3339(),
            point.equity,
            point.cash,
            point.invested
        )?;
    }
    Ok(())
}

/// One row per signal.
pub fn write_signals_csv(path: &Path, report: &BacktestReport) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create signals CSV {}", path.display()))?;
    writeln!(file, "timestamp,signal,confidence,price")?;
    for signal in &report.signals {
        writeln!(
            file,
            "{},{:?},{:.4},{:.4}",
            signal.timestamp.to_rfc3339(),
            signal.kind,
            signal.confidence,
            signal.price
        )?;
    }
    Ok(())
}

/// One row per closed lot.
pub fn write_trades_csv(path: &Path, report: &BacktestReport) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;
    writeln!(
        file,
        "instrument,side,quantity,entry_time,entry_price,exit_time,exit_price,pnl,return_pct,reason"
    )?;
    for trade in &report.trades {
        writeln!(
            file,
            "{},{:?},{},{},{:.4},{},{:.4},{:.4},{:.4},{}",
            trade.instrument,
            trade.side,
            trade.quantity,
            trade.entry_time.to_rfc3339(),
            trade.entry_price,
            trade.exit_time.to_rfc3339(),
            trade.exit_price,
            trade.pnl,
            trade.return_pct,
            trade.reason
        )?;
    }
    Ok(())
}
