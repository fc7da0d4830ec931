//! Per-trial interaction: placing, dragging and confirming the mark.
//!
//! [`Interaction`] is the state machine proper and consumes one
//! [`InputSnapshot`] per frame. [`run_trial`] drives it with a [`Presenter`]
//! and a [`Timer`] until the participant confirms or aborts.

use numline_core::error::Result;
use numline_core::{
    ExperimentError, InputSnapshot, Key, Layout, MarkPhase, Presenter, Scene, TrialTiming,
    TrialView,
};
use numline_timing::Timer;
use std::time::Duration;

/// How long the "make a mark first" overlay stays up.
pub const REMINDER_PAUSE: Duration = Duration::from_secs(3);

/// Mark position and touch state, owned by one trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerState {
    /// Mark x in layout cm. Starts at the line's left end.
    pub x: f64,
    pub touched: bool,
    pub phase: MarkPhase,
}

impl MarkerState {
    pub fn new(layout: &Layout) -> Self {
        Self {
            x: layout.line_start_x(),
            touched: false,
            phase: MarkPhase::AwaitingFirstTouch,
        }
    }
}

/// Outcome of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Pending,
    /// Confirm pressed before any mark was placed.
    Remind,
    Confirmed(TrialTiming),
}

pub struct Interaction<'a> {
    layout: &'a Layout,
    abort_key: Key,
    marker: MarkerState,
    first_mark_secs: Option<f64>,
    confirm_hovered: bool,
}

impl<'a> Interaction<'a> {
    pub fn new(layout: &'a Layout, abort_key: Key) -> Self {
        Self {
            layout,
            abort_key,
            marker: MarkerState::new(layout),
            first_mark_secs: None,
            confirm_hovered: false,
        }
    }

    pub fn marker(&self) -> &MarkerState {
        &self.marker
    }

    pub fn phase(&self) -> MarkPhase {
        self.marker.phase
    }

    /// Mark distance from the line start, in cm.
    pub fn mark_offset(&self) -> f64 {
        self.layout.offset_from_start(self.marker.x)
    }

    pub fn confirm_highlighted(&self) -> bool {
        self.confirm_hovered
    }

    /// Advances the state machine by one frame.
    ///
    /// `elapsed_secs` is the time since the trial loop started. Returns
    /// `UserAbort` when the abort key is in the snapshot, regardless of any
    /// other input in the same frame.
    pub fn step(&mut self, input: &InputSnapshot, elapsed_secs: f64) -> Result<Step> {
        if input.key_pressed(self.abort_key) {
            return Err(ExperimentError::UserAbort {
                key: self.abort_key,
            });
        }
        if self.marker.phase == MarkPhase::Confirmed {
            return Ok(Step::Pending);
        }

        if input.pointer_down && self.layout.line_region.contains(input.pointer) {
            self.marker.x = self.layout.clamp_to_line(input.pointer.x);
            if !self.marker.touched {
                self.marker.touched = true;
                self.marker.phase = MarkPhase::Tracking;
                self.first_mark_secs = Some(elapsed_secs);
                tracing::trace!(elapsed_secs, x = self.marker.x, "first mark placed");
            }
        }

        self.confirm_hovered = self.layout.confirm.contains(input.pointer);
        if self.confirm_hovered && input.pointer_pressed {
            if !self.marker.touched {
                return Ok(Step::Remind);
            }
            self.marker.phase = MarkPhase::Confirmed;
            return Ok(Step::Confirmed(TrialTiming {
                first_mark_secs: self.first_mark_secs.unwrap_or(elapsed_secs),
                confirm_secs: elapsed_secs,
            }));
        }
        Ok(Step::Pending)
    }

    /// Frame description for the current state.
    pub fn view(
        &self,
        start_label: &'a str,
        end_label: &'a str,
        target_label: Option<&'a str>,
    ) -> TrialView<'a> {
        TrialView {
            layout: self.layout,
            start_label,
            end_label,
            target_label,
            mark_x: self.marker.touched.then_some(self.marker.x),
            confirm_highlighted: self.confirm_hovered,
        }
    }
}

/// Labels drawn around the line during a trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialLabels<'a> {
    pub start: &'a str,
    pub end: &'a str,
    pub target: Option<&'a str>,
    pub reminder: &'a str,
}

/// Final state of a confirmed trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub timing: TrialTiming,
    /// Mark distance from the line start, in cm.
    pub mark_offset: f64,
    pub frames: usize,
}

/// Runs one trial until the mark is confirmed.
///
/// Every frame takes one input snapshot, steps the state machine and presents
/// the full stimulus set. There is no frame limit: only confirmation or the
/// abort key end the loop.
pub fn run_trial<P, T>(
    presenter: &mut P,
    timer: &mut T,
    layout: &Layout,
    abort_key: Key,
    labels: TrialLabels<'_>,
) -> Result<TrialOutcome>
where
    P: Presenter + ?Sized,
    T: Timer,
{
    let mut interaction = Interaction::new(layout, abort_key);
    let origin = timer.now();
    let mut frames = 0usize;

    loop {
        let frame_start = timer.now();
        let input = presenter.poll_input()?;
        let elapsed = timer.elapsed(origin).as_secs_f64();

        match interaction.step(&input, elapsed)? {
            Step::Confirmed(timing) => {
                return Ok(TrialOutcome {
                    timing,
                    mark_offset: interaction.mark_offset(),
                    frames,
                });
            }
            Step::Remind => {
                let view = interaction.view(labels.start, labels.end, labels.target);
                presenter.present(&Scene::Reminder {
                    view,
                    text: labels.reminder,
                })?;
                timer.sleep(REMINDER_PAUSE);
                presenter.discard_pointer_presses()?;
            }
            Step::Pending => {}
        }

        let view = interaction.view(labels.start, labels.end, labels.target);
        presenter.present(&Scene::Trial(view))?;
        frames += 1;
        timer.record_frame(timer.elapsed(frame_start));
    }
}
