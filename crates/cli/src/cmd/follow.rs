//! Follow a log file and print its coalesced change events

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use crossbeam_channel::{never, select};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::future::Future;
use std::io::{IsTerminal, Write};
use std::path::Path;
use tracing::{info, warn};
use watcher::{watch_log_file, DedupConfig, DedupEvents, FsEvent, Op};

/// Output format for printed events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text { color: bool },
    Json,
}

pub async fn run(file: &Path, config: &DedupConfig, json: bool) -> Result<()> {
    let (dir_watcher, dedup) = watch_log_file(file, config)
        .with_context(|| format!("Failed to watch {}", file.display()))?;

    info!(
        "Following {} (debounce: {}ms)",
        file.display(),
        config.debounce_ms
    );

    let format = if json {
        Format::Json
    } else {
        Format::Text {
            color: std::io::stdout().is_terminal(),
        }
    };

    let printed = follow_until(
        dedup,
        move || dir_watcher.close(),
        std::io::stdout(),
        format,
        tokio::signal::ctrl_c(),
    )
    .await?;
    info!("Printed {} events", printed);
    Ok(())
}

/// Print events until `shutdown` resolves or printing fails
///
/// `close` closes the raw source and runs on every exit path. After a
/// shutdown, events still queued are printed before returning.
async fn follow_until<W, S>(
    dedup: DedupEvents,
    close: impl FnOnce(),
    out: W,
    format: Format,
    shutdown: S,
) -> Result<usize>
where
    W: Write + Send + 'static,
    S: Future<Output = std::io::Result<()>>,
{
    let mut printer =
        tokio::task::spawn_blocking(move || print_until_closed(dedup, out, format));

    tokio::select! {
        signal = shutdown => {
            close();
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Stopping, draining remaining events");
            printer.await.context("Printer task failed")?
        }
        printed = &mut printer => {
            close();
            printed.context("Printer task failed")?
        }
    }
}

/// Print events until the dedup loop closes its queues
fn print_until_closed<W: Write>(dedup: DedupEvents, mut out: W, format: Format) -> Result<usize> {
    // Both queues disconnect together, but events may still be buffered
    // when the error queue first reports the disconnect
    let no_errors = never();
    let mut errors_open = true;
    let mut printed = 0;

    loop {
        let errors = if errors_open { dedup.errors() } else { &no_errors };
        select! {
            recv(dedup.events()) -> msg => match msg {
                Ok(event) => {
                    let line = format_event(&event, Local::now(), format)?;
                    writeln!(out, "{}", line).context("Failed to write event")?;
                    printed += 1;
                }
                Err(_) => break,
            },
            recv(errors) -> msg => match msg {
                Ok(err) => warn!("{}", err),
                Err(_) => errors_open = false,
            },
        }
    }

    let (_, errors) = dedup.drain();
    for err in errors {
        warn!("{}", err);
    }
    out.flush().context("Failed to flush output")?;
    Ok(printed)
}

#[derive(Serialize)]
struct EventLine<'a> {
    time: String,
    #[serde(flatten)]
    event: &'a FsEvent,
}

/// Render one event as a line of output
pub fn format_event(event: &FsEvent, time: DateTime<Local>, format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let line = EventLine {
                time: time.to_rfc3339_opts(SecondsFormat::Millis, false),
                event,
            };
            serde_json::to_string(&line).context("Failed to serialize event")
        }
        Format::Text { color } => {
            let stamp = time.format("%H:%M:%S%.3f").to_string();
            let op = format!("{:<6}", event.op);
            if color {
                let op = match event.op {
                    Op::Write => op.green().to_string(),
                    Op::Create => op.cyan().to_string(),
                    Op::Remove | Op::Rename => op.yellow().to_string(),
                    Op::AttributeChange => op.dimmed().to_string(),
                };
                Ok(format!("{} {} {}", stamp.dimmed(), op, event.path.display()))
            } else {
                Ok(format!("{} {} {}", stamp, op, event.path.display()))
            }
        }
    }
}
