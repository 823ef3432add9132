//! Batch runs: feed events through the worker pool with progress and
//! streaming report output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use darkroom_core::records::JsonlRecordStore;
use darkroom_core::storage::LocalObjectStore;
use darkroom_core::{
    Config, DrainSummary, EventProcessor, EventReport, OutputWriter, Pipeline, ReportTally,
    UploadEvent,
};
use tokio::sync::mpsc;

use super::types::OutputFormat;
use super::RunArgs;

/// Run every event through a fresh pipeline and report on each of them.
pub async fn run_events(
    config: &Config,
    store: LocalObjectStore,
    events: Vec<UploadEvent>,
    args: &RunArgs,
) -> anyhow::Result<()> {
    let records = JsonlRecordStore::new(config.records_path());
    tracing::debug!(records = %records.path().display(), "Writing image records");
    let processor = Arc::new(EventProcessor::new(
        config,
        Arc::new(store),
        Arc::new(records),
    ));

    let total = events.len() as u64;
    let progress = create_progress_bar(total);
    let start_time = Instant::now();

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = OutputWriter::new(sink, args.format.into(), true);

    // Reports cross from the workers to this task over an unbounded channel
    // so a slow sink never stalls a worker.
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<EventReport>();
    let pipeline = Pipeline::start(processor, &config.pipeline, move |report| {
        let _ = report_tx.send(report);
    });

    let handle = pipeline.handle();
    let drain = tokio::spawn(async move {
        for event in events {
            if let Err(e) = handle.enqueue(event).await {
                let reason = e.to_string();
                let event = e.into_event();
                tracing::warn!(key = %event.key, reason, "Event not accepted");
            }
        }
        pipeline.shutdown().await
    });

    let mut tally = ReportTally::default();
    let mut collected = Vec::new();
    while let Some(report) = report_rx.recv().await {
        tally.record(&report);
        match args.format {
            OutputFormat::Jsonl => writer.write(&report)?,
            OutputFormat::Json => collected.push(report),
        }

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = tally.total() as f64 / elapsed;
            progress.set_message(format!("{:.1} img/sec", rate));
        }
    }
    let summary = drain.await?;

    if args.format == OutputFormat::Json {
        writer.write_all(&collected)?;
    }
    writer.flush()?;
    if let Some(path) = &args.output {
        let count = writer.items_written();
        tracing::info!(count, "Reports written to {:?}", path);
    }

    progress.finish_and_clear();
    print_summary(&tally, &summary, start_time.elapsed());

    if summary.quarantined > 0 {
        tracing::warn!(
            quarantined = summary.quarantined,
            "Some uploads were quarantined; see `darkroom quarantine`"
        );
    }
    Ok(())
}

/// Create a progress bar for a batch run.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after a batch run.
fn print_summary(tally: &ReportTally, summary: &DrainSummary, elapsed: Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        summary.total() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Published:    {:>8}", summary.published);
    if summary.quarantined > 0 {
        eprintln!("    Quarantined:  {:>8}", summary.quarantined);
        for (kind, count) in &tally.by_kind {
            eprintln!("      {:<22}{:>4}", kind, count);
        }
    }
    eprintln!("    Derivatives:  {:>8}", tally.derivatives_written);
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total());
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}
