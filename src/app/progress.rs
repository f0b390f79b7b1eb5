use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::logger;
use crate::metrics::{MetricsAggregator, ProgressSnapshot, rate_x100};

const PROGRESS_TICK: Duration = Duration::from_millis(100);
const BAR_WIDTH: usize = 30;

/// Whether a live progress line should be drawn for this run.
#[must_use]
pub(crate) fn progress_enabled(no_progress: bool, verbose: bool) -> bool {
    !no_progress && !verbose && std::io::stderr().is_terminal()
}

/// Samples committed counters of a running test.
#[derive(Debug, Clone)]
pub(crate) struct ProgressReporter {
    aggregator: Arc<MetricsAggregator>,
    in_flight: Arc<AtomicU64>,
    total: u64,
    run_start: Instant,
}

/// Handle to a running progress task; [`ProgressHandle::finish`] draws the
/// final line and ends it.
pub(crate) struct ProgressHandle {
    stop_tx: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl ProgressHandle {
    pub(crate) async fn finish(self) {
        if self.stop_tx.send(()).is_err() {
            tracing::debug!("Progress task stopped before finish");
        }
        if let Err(err) = self.task.await {
            tracing::debug!("Progress task ended abnormally: {}", err);
        }
    }
}

impl ProgressReporter {
    pub(crate) const fn new(
        aggregator: Arc<MetricsAggregator>,
        in_flight: Arc<AtomicU64>,
        total: u64,
        run_start: Instant,
    ) -> Self {
        Self {
            aggregator,
            in_flight,
            total,
            run_start,
        }
    }

    pub(crate) fn sample(&self) -> ProgressSnapshot {
        let succeeded = self.aggregator.succeeded();
        let failed = self.aggregator.failed();
        let completed = succeeded.saturating_add(failed);
        let elapsed = self.run_start.elapsed();
        ProgressSnapshot {
            completed,
            total: self.total,
            succeeded,
            failed,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            elapsed,
            rps_x100: rate_x100(completed, elapsed),
        }
    }

    pub(crate) fn spawn(self, no_color: bool) -> ProgressHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let style = ProgressStyle::new(BAR_WIDTH);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PROGRESS_TICK);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        let snapshot = self.sample();
                        if render_progress_line(&style, &snapshot, no_color).is_ok() {
                            drop(finish_progress_line());
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        let snapshot = self.sample();
                        if render_progress_line(&style, &snapshot, no_color).is_err() {
                            logger::set_progress_line_active(false);
                            break;
                        }
                    }
                }
            }
        });

        ProgressHandle { stop_tx, task }
    }
}

fn render_progress_line(
    style: &ProgressStyle,
    snapshot: &ProgressSnapshot,
    no_color: bool,
) -> Result<(), std::io::Error> {
    let line = build_progress_line(style, snapshot, no_color);

    let mut out = std::io::stderr().lock();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    for segment in line {
        if no_color {
            queue!(out, Print(&segment.text))?;
        } else if let Some(color) = segment.color {
            queue!(
                out,
                SetForegroundColor(color),
                Print(&segment.text),
                ResetColor
            )?;
        } else {
            queue!(out, Print(&segment.text))?;
        }
    }
    out.flush()?;
    logger::set_progress_line_active(true);
    Ok(())
}

fn finish_progress_line() -> Result<(), std::io::Error> {
    let mut out = std::io::stderr().lock();
    logger::set_progress_line_active(false);
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn build_progress_line(
    style: &ProgressStyle,
    snapshot: &ProgressSnapshot,
    no_color: bool,
) -> Vec<ProgressSegment> {
    let size = style.size.max(1);
    let goal = u128::from(snapshot.total.max(1));
    let current = u128::from(snapshot.completed).min(goal);
    let size_u128 = u128::from(u64::try_from(size).unwrap_or(u64::MAX));

    let scaled = current
        .saturating_mul(size_u128)
        .checked_div(goal)
        .unwrap_or(0);
    let complete_size = usize::try_from(scaled).unwrap_or(size).min(size);
    let incomplete_size = size.saturating_sub(complete_size);

    let percent_x100 = snapshot.percent_x100();
    let percent_text = format!(
        " {}.{:02}%",
        percent_x100.checked_div(100).unwrap_or(0),
        percent_x100.checked_rem(100).unwrap_or(0)
    );
    let count_text = format!(" | {}/{}", snapshot.completed, snapshot.total);
    let rps_text = format!(
        " | {}.{:02} RPS",
        snapshot.rps_x100.checked_div(100).unwrap_or(0),
        snapshot.rps_x100.checked_rem(100).unwrap_or(0)
    );

    let progress_bar = format!(
        "{}{}{}{}",
        style.begin,
        style.fill.repeat(complete_size),
        style.empty.repeat(incomplete_size),
        style.end
    );

    if no_color {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::plain(percent_text),
            ProgressSegment::plain(count_text),
            ProgressSegment::plain(rps_text),
        ]
    } else {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::colored(percent_text, Color::Cyan),
            ProgressSegment::plain(count_text),
            ProgressSegment::colored(rps_text, Color::Yellow),
        ]
    }
}

struct ProgressStyle {
    size: usize,
    begin: String,
    end: String,
    fill: String,
    empty: String,
}

impl ProgressStyle {
    fn new(size: usize) -> Self {
        Self {
            size,
            begin: "[".to_owned(),
            end: "]".to_owned(),
            fill: "#".to_owned(),
            empty: "-".to_owned(),
        }
    }
}

struct ProgressSegment {
    text: String,
    color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}
