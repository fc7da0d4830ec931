use crate::config::BlockConfig;
use crate::context::ExperimentContext;
use crate::interaction::{TrialLabels, run_trial};
use crate::schedule::schedule_block;
use crate::sink::{ResultLog, ResultSink};
use numline_core::error::Result;
use numline_core::{ExperimentError, Key, Presenter, Scene, TrialRecord, to_fraction, to_value};
use numline_timing::Timer;
use rand::Rng;
use std::time::Duration;

/// Blank wait shown before every trial.
pub const PREPARE_PAUSE: Duration = Duration::from_secs(3);

/// Effective frame rates below this share of `FRAME_RATE` are reported.
const FRAME_RATE_TOLERANCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub blocks: usize,
    pub trials: usize,
}

/// Runs the whole session: welcome screen, then every block in declaration
/// order.
///
/// Records are written to `sink` exactly once, whether the session completes,
/// the participant aborts, or the presenter fails.
pub fn run_session<P, S, T, R>(
    ctx: &mut ExperimentContext<T, R>,
    presenter: &mut P,
    sink: S,
) -> Result<SessionSummary>
where
    P: Presenter + ?Sized,
    S: ResultSink,
    T: Timer,
    R: Rng,
{
    let mut log = ResultLog::new(sink);
    tracing::info!(
        participant = %ctx.participant,
        blocks = ctx.config.no_blocks,
        trials = ctx.config.total_trials(),
        "session started"
    );

    wait_for_start(ctx, presenter)?;
    for block in ctx.config.blocks() {
        run_block(ctx, presenter, &block, &mut log)?;
    }

    log.flush().map_err(ExperimentError::Sink)?;
    Ok(SessionSummary {
        blocks: ctx.config.no_blocks,
        trials: log.len(),
    })
}

/// Shows the instructions until Space is pressed.
fn wait_for_start<P, T, R>(ctx: &mut ExperimentContext<T, R>, presenter: &mut P) -> Result<()>
where
    P: Presenter + ?Sized,
    T: Timer,
    R: Rng,
{
    let abort_key = ctx.config.abort_key;
    loop {
        presenter.present(&Scene::Welcome {
            layout: &ctx.layout,
            text: &ctx.config.welcome_msg,
        })?;
        let input = presenter.poll_input()?;
        if input.key_pressed(abort_key) {
            return Err(ExperimentError::UserAbort { key: abort_key });
        }
        if input.key_pressed(Key::Space) {
            return Ok(());
        }
    }
}

fn run_block<P, S, T, R>(
    ctx: &mut ExperimentContext<T, R>,
    presenter: &mut P,
    block: &BlockConfig,
    log: &mut ResultLog<S>,
) -> Result<()>
where
    P: Presenter + ?Sized,
    S: ResultSink,
    T: Timer,
    R: Rng,
{
    let schedule = schedule_block(block, &mut ctx.rng)?;
    let line = block.line;
    let start_label = line.start.to_string();
    let end_label = line.end.to_string();
    tracing::info!(
        block = block.index + 1,
        trials = schedule.len(),
        start = line.start,
        end = line.end,
        "block started"
    );

    for (j, target) in schedule.iter().enumerate() {
        presenter.present(&Scene::Prepare {
            layout: &ctx.layout,
            text: &ctx.config.prepare_msg,
        })?;
        ctx.timer.sleep(PREPARE_PAUSE);
        presenter.discard_pointer_presses()?;

        let target_label = block.show_target.then(|| target.value.to_string());
        let labels = TrialLabels {
            start: &start_label,
            end: &end_label,
            target: target_label.as_deref(),
            reminder: &ctx.config.reminder_msg,
        };
        let outcome = run_trial(
            presenter,
            &mut ctx.timer,
            &ctx.layout,
            ctx.config.abort_key,
            labels,
        )?;

        let marked_fraction = to_fraction(outcome.mark_offset, ctx.layout.line_length);
        let marked_value = to_value(marked_fraction, line.start, line.end);
        let record = TrialRecord {
            participant: ctx.participant.clone(),
            block: block.index + 1,
            trial: j + 1,
            target_value: target.value,
            target_fraction: target.fraction,
            marked_value,
            marked_fraction,
            first_mark_secs: outcome.timing.first_mark_secs,
            confirm_secs: outcome.timing.confirm_secs,
        };
        tracing::info!(
            block = record.block,
            trial = record.trial,
            target = record.target_value,
            marked = record.marked_value,
            first_mark_secs = record.first_mark_secs,
            confirm_secs = record.confirm_secs,
            "trial complete"
        );
        log.push(record);

        check_frame_rate(&mut ctx.timer, ctx.config.frame_rate, outcome.frames);
    }
    Ok(())
}

/// Reports trials whose loop ran noticeably slower than the configured rate.
fn check_frame_rate<T: Timer>(timer: &mut T, frame_rate: u32, frames: usize) {
    let stats = timer.frame_stats();
    timer.reset_frames();
    if stats.samples == 0 {
        return;
    }
    tracing::debug!(
        frames,
        fps = stats.effective_fps,
        jitter_ms = stats.jitter_ns / 1e6,
        "trial frame timing"
    );
    if stats.effective_fps < frame_rate as f64 * FRAME_RATE_TOLERANCE {
        tracing::warn!(
            fps = stats.effective_fps,
            expected = frame_rate,
            "frame rate below configured FRAME_RATE"
        );
    }
}
