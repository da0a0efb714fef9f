//! Replay command implementation.
//!
//! A reader task parses one JSON batch per line and sends it over a bounded
//! channel. The consumer owns the frame and pushes batches in file order.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use streamframe_core::buffer::{Batch, FrameSnapshot, PacketInfo, StreamingFrame};
use streamframe_core::metrics::BufferMetrics;
use streamframe_core::{Config, Field};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Batches buffered between the reader and the consumer.
const CHANNEL_CAPACITY: usize = 64;

/// How the final frame is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Aligned text table
    Table,
}

/// Outcome of a replay.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    /// Lines that parsed as batches
    pub parsed: usize,
    /// Lines that were not valid batch JSON
    pub unparsable: usize,
    /// Batches the frame accepted
    pub accepted: usize,
    /// Batches the frame rejected as malformed
    pub rejected: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a ReplaySummary,
    packet: &'a PacketInfo,
    frame: &'a FrameSnapshot,
}

/// Replay `file` and print the resulting frame.
pub async fn run(config: Config, file: &Path, format: OutputFormat, show_metrics: bool) -> Result<()> {
    let metrics = Arc::new(BufferMetrics::new());
    let (frame, summary) = replay(&config, file, Arc::clone(&metrics)).await?;

    info!(
        parsed = summary.parsed,
        accepted = summary.accepted,
        rejected = summary.rejected,
        unparsable = summary.unparsable,
        length = frame.length(),
        fields = frame.fields().len(),
        "Replay finished"
    );

    let snapshot = frame.snapshot();
    match format {
        OutputFormat::Json => {
            let report = JsonReport {
                summary: &summary,
                packet: frame.packet_info(),
                frame: &snapshot,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => print!("{}", render_table(&snapshot.fields, snapshot.length)),
    }

    if show_metrics {
        println!();
        print!("{}", metrics.export_prometheus_text());
    }

    Ok(())
}

/// Build a frame from config and push every batch of `file` into it.
pub async fn replay(
    config: &Config,
    file: &Path,
    metrics: Arc<BufferMetrics>,
) -> Result<(StreamingFrame, ReplaySummary)> {
    let options = config.buffer.options()?;
    let mut frame = StreamingFrame::empty(options)?.with_metrics(metrics);

    let handle = File::open(file)
        .await
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_batches(handle, tx));

    let mut summary = ReplaySummary::default();
    while let Some((line, batch)) = rx.recv().await {
        match frame.push(batch) {
            Ok(()) => {
                summary.accepted += 1;
                debug!(line, length = frame.length(), "Pushed batch");
            }
            Err(e) if e.is_malformed_batch() => {
                summary.rejected += 1;
                warn!(line, error = %e, "Skipping malformed batch");
            }
            Err(e) => return Err(e).with_context(|| format!("Batch on line {line} failed")),
        }
    }

    let (parsed, unparsable) = reader.await.context("Reader task panicked")??;
    summary.parsed = parsed;
    summary.unparsable = unparsable;

    Ok((frame, summary))
}

/// Parse lines into batches and send them with their line number.
/// Returns `(parsed, unparsable)` line counts.
async fn read_batches(file: File, tx: mpsc::Sender<(usize, Batch)>) -> Result<(usize, usize)> {
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0;
    let mut parsed = 0;
    let mut unparsable = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Batch>(&line) {
            Ok(batch) => {
                parsed += 1;
                if tx.send((line_number, batch)).await.is_err() {
                    // Consumer stopped
                    break;
                }
            }
            Err(e) => {
                unparsable += 1;
                warn!(line = line_number, error = %e, "Skipping unparsable line");
            }
        }
    }

    Ok((parsed, unparsable))
}

/// Render fields as an aligned text table, one row per frame row.
pub fn render_table(fields: &[Field], length: usize) -> String {
    let headers: Vec<String> = fields.iter().map(Field::display_name).collect();
    let cells: Vec<Vec<String>> = (0..length)
        .map(|row| {
            fields
                .iter()
                .map(|f| f.values[row].as_ref().map_or_else(String::new, ToString::to_string))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &cells {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let line: Vec<String> = row
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}
