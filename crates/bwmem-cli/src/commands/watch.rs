//! Watch mode: poll the game on a fixed cadence until the user quits.

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use bwmem::{
    AttachStatus, DiffDump, DiffStatus, EntityKind, FieldDiff, MemoryEditor,
    SystemProcessProvider, TickReport, run_loop, summarize,
};
use owo_colors::OwoColorize;
use tracing::{info, warn};

use super::Editor;
use crate::config::Settings;
use crate::input::{self, KeyAction};
use crate::shutdown::ShutdownSignal;

/// How often a summary line is printed while attached
const REPORT_PERIOD: Duration = Duration::from_secs(1);

pub struct WatchOptions<'a> {
    pub kinds: &'a [EntityKind],
    pub interval_ms: Option<u64>,
    pub diff: bool,
    pub diff_output: Option<&'a Path>,
}

pub fn run(settings: &Settings, options: WatchOptions<'_>) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let (tx, rx) = mpsc::channel();
    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown), tx);

    let mut config = settings.editor.clone();
    if !options.kinds.is_empty() {
        config.kinds = options.kinds.to_vec();
    }
    if let Some(ms) = options.interval_ms.filter(|ms| *ms > 0) {
        config.poll_interval = Duration::from_millis(ms);
    }
    config.diff_on_tick |= options.diff;

    let report_every =
        (REPORT_PERIOD.as_millis() / config.poll_interval.as_millis().max(1)).max(1) as u64;
    let mut editor = MemoryEditor::new(SystemProcessProvider, settings.schema.clone(), config)?;

    println!("Waiting for {}... (c: capture baseline, Esc or q: quit)", editor.config().target);

    let mut last_status = AttachStatus::Detached;
    run_loop(&mut editor, shutdown.as_atomic(), |editor, report| {
        if report.status != last_status {
            print_status(&report.status);
            last_status = report.status.clone();
        }

        while let Ok(action) = rx.try_recv() {
            if action == KeyAction::Capture {
                capture(editor);
            }
        }

        if report.status.is_attached() && report.tick % report_every == 0 {
            println!("{}", summary_line(report));
        }

        ControlFlow::Continue(())
    });

    print_final_diffs(&editor, options.diff_output)?;
    Ok(())
}

fn print_status(status: &AttachStatus) {
    if status.is_attached() {
        println!("{}", status.to_string().green());
    } else {
        println!("{}", status.to_string().yellow());
    }
}

fn capture(editor: &mut Editor) {
    let kinds = editor.capture_all();
    if kinds.is_empty() {
        println!("{}", "Nothing to capture yet".yellow());
        return;
    }
    let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
    println!("{} {}", "Baseline captured:".cyan(), names.join(", "));
}

fn summary_line(report: &TickReport) -> String {
    let mut parts: Vec<String> = report
        .refreshed
        .iter()
        .map(|r| format!("{} {}", r.kind, r.records))
        .collect();
    for failure in &report.failures {
        parts.push(format!("{} failed", failure.kind));
    }

    let mut line = parts.join("  ");
    if report.slot_errors() > 0 {
        line.push_str(&format!("  ({} unreadable slots)", report.slot_errors()));
    }
    for (kind, summary) in &report.diffs {
        line.push_str(&format!(
            "  | {}: ~{} +{} -{}",
            kind, summary.changed, summary.added, summary.removed
        ));
    }
    line
}

fn print_final_diffs(editor: &Editor, output: Option<&Path>) -> Result<()> {
    let mut dumps = Vec::new();

    for kind in editor.schemas().kinds() {
        let (Some(live), Some(baseline)) = (editor.store().live(kind), editor.store().baseline(kind))
        else {
            continue;
        };
        let diffs = editor.diff(kind)?;
        let summary = summarize(&diffs);
        println!(
            "{} diff: {} changed, {} added, {} removed",
            kind, summary.changed, summary.added, summary.removed
        );
        for diff in diffs.iter().filter(|d| !d.is_unchanged()) {
            print_diff(diff);
        }
        dumps.push(DiffDump::new(&live, &baseline, &diffs));
    }

    if let Some(path) = output {
        if dumps.is_empty() {
            warn!("No baseline captured, nothing written to {}", path.display());
        } else {
            let json = serde_json::to_string_pretty(&dumps)?;
            std::fs::write(path, json)?;
            println!("Diffs written to {}", path.display());
        }
    }

    Ok(())
}

fn print_diff(diff: &FieldDiff) {
    let head = format!("  {}#{} {}", diff.kind, diff.slot, diff.status);
    match diff.status {
        DiffStatus::Added => println!("{}", head.green()),
        DiffStatus::Removed => println!("{}", head.red()),
        DiffStatus::Changed => {
            println!("{}", head.yellow());
            for change in &diff.changes {
                let old = change.baseline.as_ref().map(ToString::to_string).unwrap_or_default();
                let new = change.live.as_ref().map(ToString::to_string).unwrap_or_default();
                println!("    {}: {} -> {}", change.name, old, new);
            }
        }
    }
}
