use anyhow::anyhow;
use numline_core::{ExperimentError, InputSnapshot, Key, Layout, Point, Presenter, Scene};
use numline_experiment::{
    CsvSink, ExperimentConfig, ExperimentContext, MemorySink, Participant, Sex, run_session,
};
use numline_timing::SimulatedTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::time::Duration;

const CONFIG: &str = r##"
SCREEN_RES: [1920, 1080]
MONITOR_WIDTH: 53
BACKGROUND_COLOR: grey
STIM_COLOR: white
HIGHLIGHT_COLOR: orange
HATCH_COLOR: black
FRAME_RATE: 60
NL_ABS_LENGTH: 20
HATCH_LENGTH: 1
NO_BLOCKS: 2
BLOCK_LENGTH: [5, 3]
ONLY_WHOLE_NUMBERS: [true, false]
WANTED_NUMBERS: [[3, 7], []]
NUMBER_TO_POS: [true, false]
NL_START_END: [[0, 10], [-5, 5]]
READY_MSG: GOTOWE
READY_LETTER: 0.1
"##;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Welcome,
    Prepare,
    Trial {
        target: Option<String>,
        mark: Option<f64>,
    },
    Reminder,
}

/// One entry of an input script.
enum Scripted {
    /// Input seen by the next `poll_input`.
    Frame(InputSnapshot),
    /// Input that arrived while the session was blocked in a pause. It is
    /// merged into the following frame unless its press is discarded first.
    Queued(InputSnapshot),
}

/// Replays canned input and records what was shown. Each presented frame
/// advances the shared clock by one frame; running out of input is a
/// presenter failure.
struct ScriptedPresenter {
    timer: SimulatedTimer,
    script: VecDeque<Scripted>,
    seen: Vec<Seen>,
}

impl ScriptedPresenter {
    fn new(timer: SimulatedTimer, inputs: Vec<InputSnapshot>) -> Self {
        Self::from_script(timer, inputs.into_iter().map(Scripted::Frame).collect())
    }

    fn from_script(timer: SimulatedTimer, script: Vec<Scripted>) -> Self {
        Self {
            timer,
            script: script.into(),
            seen: Vec::new(),
        }
    }

    fn count(&self, kind: fn(&Seen) -> bool) -> usize {
        self.seen.iter().filter(|s| kind(s)).count()
    }
}

impl Presenter for ScriptedPresenter {
    fn poll_input(&mut self) -> anyhow::Result<InputSnapshot> {
        let mut pending: Option<InputSnapshot> = None;
        loop {
            match self.script.pop_front() {
                Some(Scripted::Queued(q)) => {
                    let p = pending.get_or_insert_with(InputSnapshot::default);
                    p.pointer_pressed |= q.pointer_pressed;
                    p.keys.extend(q.keys);
                }
                Some(Scripted::Frame(mut frame)) => {
                    if let Some(p) = pending {
                        frame.pointer_pressed |= p.pointer_pressed;
                        frame.keys.extend(p.keys);
                    }
                    return Ok(frame);
                }
                None => return Err(anyhow!("input script exhausted")),
            }
        }
    }

    fn present(&mut self, scene: &Scene<'_>) -> anyhow::Result<()> {
        self.seen.push(match scene {
            Scene::Welcome { .. } => Seen::Welcome,
            Scene::Prepare { .. } => Seen::Prepare,
            Scene::Trial(view) => Seen::Trial {
                target: view.target_label.map(str::to_string),
                mark: view.mark_x,
            },
            Scene::Reminder { .. } => Seen::Reminder,
        });
        self.timer.advance(FRAME);
        Ok(())
    }

    fn discard_pointer_presses(&mut self) -> anyhow::Result<()> {
        for entry in self.script.iter_mut() {
            match entry {
                Scripted::Queued(q) => q.pointer_pressed = false,
                Scripted::Frame(_) => break,
            }
        }
        Ok(())
    }
}

fn key(k: Key) -> InputSnapshot {
    InputSnapshot {
        keys: vec![k],
        ..Default::default()
    }
}

fn idle() -> InputSnapshot {
    InputSnapshot::default()
}

fn hover(at: Point) -> InputSnapshot {
    InputSnapshot {
        pointer: at,
        ..Default::default()
    }
}

fn press(at: Point) -> InputSnapshot {
    InputSnapshot {
        pointer: at,
        pointer_down: true,
        pointer_pressed: true,
        keys: Vec::new(),
    }
}

/// Mark at `x` then confirm.
fn trial(layout: &Layout, x: f64) -> Vec<InputSnapshot> {
    vec![press(Point::new(x, 0.0)), press(layout.confirm.center)]
}

fn context(config: ExperimentConfig) -> ExperimentContext<SimulatedTimer, StdRng> {
    let participant = Participant::new("P1", Sex::F, "24").unwrap();
    ExperimentContext::new(
        config,
        &participant,
        SimulatedTimer::new(),
        StdRng::seed_from_u64(42),
    )
    .unwrap()
}

fn config() -> ExperimentConfig {
    ExperimentConfig::from_yaml_str(CONFIG).unwrap()
}

#[test]
fn complete_session_records_every_trial_in_order() {
    let mut ctx = context(config());
    let xs = [-10.0, -5.0, 0.0, 5.0, 10.0, -2.0, 2.0, 8.0];
    let mut script = vec![key(Key::Space)];
    for x in xs {
        script.extend(trial(&ctx.layout, x));
    }
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);
    let sink = MemorySink::new();

    let summary = run_session(&mut ctx, &mut presenter, sink.clone()).unwrap();
    assert_eq!(summary.trials, 8);
    assert_eq!(summary.blocks, 2);

    let writes = sink.writes();
    assert_eq!(writes.len(), 1);
    let records = &writes[0];
    let positions: Vec<(usize, usize)> = records.iter().map(|r| (r.block, r.trial)).collect();
    assert_eq!(
        positions,
        vec![(1, 1), (1, 2), (1, 3), (1, 4), (1, 5), (2, 1), (2, 2), (2, 3)]
    );

    for (record, x) in records.iter().zip(xs) {
        let expected_fraction = (x + 10.0) / 20.0;
        assert!((record.marked_fraction - expected_fraction).abs() < 1e-9);
        assert_eq!(record.participant, "P1_24F");
    }
    // Block 1 runs 0..10, block 2 runs -5..5.
    assert!((records[1].marked_value - 2.5).abs() < 1e-9);
    assert!((records[7].marked_value - 4.0).abs() < 1e-9);

    let block_one: Vec<f64> = records[..5].iter().map(|r| r.target_value).collect();
    assert!(block_one.contains(&3.0) && block_one.contains(&7.0));
    for r in &records[..5] {
        assert!((r.target_fraction - r.target_value / 10.0).abs() < 1e-12);
    }
    assert_eq!(presenter.count(|s| *s == Seen::Prepare), 8);
}

#[test]
fn abort_keeps_every_completed_trial() {
    let mut ctx = context(config());
    let mut script = vec![key(Key::Space)];
    for x in [1.0, 2.0, 3.0] {
        script.extend(trial(&ctx.layout, x));
    }
    script.push(press(Point::new(4.0, 0.0)));
    script.push(key(Key::F7));
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);
    let sink = MemorySink::new();

    let err = run_session(&mut ctx, &mut presenter, sink.clone()).unwrap_err();
    assert!(matches!(err, ExperimentError::UserAbort { key: Key::F7 }));
    assert_eq!(err.to_string(), "Experiment finished by user! f7 pressed.");

    let writes = sink.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].len(), 3);
}

#[test]
fn abort_keeps_completed_trials_in_the_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(config());
    let mut script = vec![key(Key::Space)];
    for x in [1.0, 2.0, 3.0] {
        script.extend(trial(&ctx.layout, x));
    }
    script.push(key(Key::F7));
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);
    let sink = CsvSink::create(dir.path(), &ctx.participant, &mut StdRng::seed_from_u64(5)).unwrap();
    let path = sink.path().to_path_buf();

    let err = run_session(&mut ctx, &mut presenter, sink).unwrap_err();
    assert!(err.is_user_abort());

    let text = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 1 + 3);
    assert!(rows[3].starts_with("P1_24F,1,3,"));
}

#[test]
fn clicks_during_the_prepare_pause_do_not_reach_the_next_trial() {
    let mut ctx = context(config());
    let confirm = ctx.layout.confirm.center;
    let mut script = vec![Scripted::Frame(key(Key::Space))];
    script.extend(trial(&ctx.layout, 0.0).into_iter().map(Scripted::Frame));
    // Second click of a double click on the confirm control.
    script.push(Scripted::Queued(press(confirm)));
    script.push(Scripted::Frame(hover(confirm)));
    script.push(Scripted::Frame(key(Key::F7)));
    let mut presenter = ScriptedPresenter::from_script(ctx.timer.clone(), script);
    let sink = MemorySink::new();

    let err = run_session(&mut ctx, &mut presenter, sink.clone()).unwrap_err();
    assert!(err.is_user_abort());
    assert_eq!(presenter.count(|s| *s == Seen::Reminder), 0);
    assert_eq!(sink.writes()[0].len(), 1);
}

#[test]
fn abort_pressed_during_a_pause_still_ends_the_session() {
    let mut ctx = context(config());
    let mut script = vec![Scripted::Frame(key(Key::Space))];
    script.extend(trial(&ctx.layout, 0.0).into_iter().map(Scripted::Frame));
    script.push(Scripted::Queued(key(Key::F7)));
    script.push(Scripted::Frame(idle()));
    let mut presenter = ScriptedPresenter::from_script(ctx.timer.clone(), script);
    let sink = MemorySink::new();

    let err = run_session(&mut ctx, &mut presenter, sink.clone()).unwrap_err();
    assert!(matches!(err, ExperimentError::UserAbort { key: Key::F7 }));
    assert_eq!(sink.writes()[0].len(), 1);
}

#[test]
fn clicks_during_the_reminder_pause_are_discarded() {
    let mut ctx = context(config());
    let confirm = ctx.layout.confirm.center;
    let script = vec![
        Scripted::Frame(key(Key::Space)),
        Scripted::Frame(press(confirm)),
        Scripted::Queued(press(confirm)),
        Scripted::Frame(hover(confirm)),
        Scripted::Frame(key(Key::F7)),
    ];
    let mut presenter = ScriptedPresenter::from_script(ctx.timer.clone(), script);

    let _ = run_session(&mut ctx, &mut presenter, MemorySink::new());
    assert_eq!(presenter.count(|s| *s == Seen::Reminder), 1);
}

#[test]
fn abort_on_welcome_screen_writes_an_empty_table() {
    let mut ctx = context(config());
    let mut presenter =
        ScriptedPresenter::new(ctx.timer.clone(), vec![idle(), idle(), key(Key::F7)]);
    let sink = MemorySink::new();

    let err = run_session(&mut ctx, &mut presenter, sink.clone()).unwrap_err();
    assert!(err.is_user_abort());
    assert_eq!(sink.writes(), vec![Vec::new()]);
    assert_eq!(presenter.count(|s| *s == Seen::Welcome), 3);
}

#[test]
fn presenter_failure_still_flushes_results() {
    let mut ctx = context(config());
    let mut script = vec![key(Key::Space)];
    script.extend(trial(&ctx.layout, 0.0));
    script.extend(trial(&ctx.layout, 1.0));
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);
    let sink = MemorySink::new();

    let err = run_session(&mut ctx, &mut presenter, sink.clone()).unwrap_err();
    assert!(matches!(err, ExperimentError::Presentation(_)));
    assert_eq!(sink.writes()[0].len(), 2);
}

#[test]
fn timings_are_measured_from_trial_start() {
    let mut ctx = context(config());
    let confirm = ctx.layout.confirm.center;
    let script = vec![
        key(Key::Space),
        idle(),
        press(Point::new(1.0, 0.0)),
        idle(),
        press(Point::new(3.0, 0.2)),
        press(confirm),
        key(Key::F7),
    ];
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);
    let sink = MemorySink::new();

    let _ = run_session(&mut ctx, &mut presenter, sink.clone());
    let record = &sink.writes()[0][0];
    // Frames 0..4 of the trial; the prepare pause comes before the trial clock.
    assert!((record.first_mark_secs - 0.016).abs() < 1e-9);
    assert!((record.confirm_secs - 0.064).abs() < 1e-9);
    assert!((record.marked_fraction - 13.0 / 20.0).abs() < 1e-9);
}

#[test]
fn confirm_without_mark_shows_reminder_then_continues() {
    let mut ctx = context(config());
    let confirm = ctx.layout.confirm.center;
    let script = vec![
        key(Key::Space),
        press(confirm),
        press(Point::new(-6.0, 0.0)),
        press(confirm),
        key(Key::F7),
    ];
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);
    let sink = MemorySink::new();

    let _ = run_session(&mut ctx, &mut presenter, sink.clone());
    assert_eq!(presenter.count(|s| *s == Seen::Reminder), 1);

    let record = &sink.writes()[0][0];
    assert!(record.first_mark_secs >= 3.0);
    assert!(record.confirm_secs > record.first_mark_secs);
    assert!((record.marked_fraction - 0.2).abs() < 1e-9);
}

#[test]
fn hidden_target_blocks_do_not_show_the_number() {
    let mut ctx = context(config());
    let mut script = vec![key(Key::Space)];
    for _ in 0..6 {
        script.extend(trial(&ctx.layout, 0.0));
    }
    script.push(key(Key::F7));
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);

    let _ = run_session(&mut ctx, &mut presenter, MemorySink::new());
    let trial_frames: Vec<&Seen> = presenter
        .seen
        .iter()
        .filter(|s| matches!(s, Seen::Trial { .. }))
        .collect();
    // Block 1 shows targets for its 5 trials, block 2 hides them.
    let shown = trial_frames
        .iter()
        .filter(|s| matches!(s, Seen::Trial { target: Some(_), .. }))
        .count();
    assert_eq!(shown, 5);
    assert!(matches!(
        trial_frames.last(),
        Some(Seen::Trial { target: None, mark: Some(_) })
    ));
}

#[test]
fn mismatched_configuration_is_rejected_before_the_session() {
    let mut broken = config();
    broken.wanted_numbers.pop();
    let participant = Participant::new("P1", Sex::M, "20").unwrap();
    let result = ExperimentContext::new(
        broken,
        &participant,
        SimulatedTimer::new(),
        StdRng::seed_from_u64(1),
    );
    assert!(matches!(
        result.err(),
        Some(numline_core::ConfigError::BlockCountMismatch {
            key: "WANTED_NUMBERS",
            ..
        })
    ));
}

#[test]
fn csv_output_has_header_plus_one_row_per_trial() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(config());
    let mut script = vec![key(Key::Space)];
    for x in [0.0; 8] {
        script.extend(trial(&ctx.layout, x));
    }
    let mut presenter = ScriptedPresenter::new(ctx.timer.clone(), script);
    let sink = CsvSink::new(dir.path(), &ctx.participant, &mut StdRng::seed_from_u64(3));
    let path = sink.path().to_path_buf();

    run_session(&mut ctx, &mut presenter, sink).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 1 + 8);
    assert!(rows[0].starts_with("PART_ID,Block_no,Trial_no"));
    assert!(rows[1].starts_with("P1_24F,1,1,"));
    assert!(rows[8].starts_with("P1_24F,2,3,"));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("P1_24F_") && name.ends_with("_beh.csv"));
}
