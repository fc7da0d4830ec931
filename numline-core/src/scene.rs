use crate::input::InputSnapshot;
use crate::layout::Layout;

/// What a trial frame shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialView<'a> {
    pub layout: &'a Layout,
    pub start_label: &'a str,
    pub end_label: &'a str,
    /// `None` when the block hides the numeric target.
    pub target_label: Option<&'a str>,
    /// Mark x in layout cm; `None` until the participant touches the line.
    pub mark_x: Option<f64>,
    pub confirm_highlighted: bool,
}

/// A complete frame description handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scene<'a> {
    Welcome { layout: &'a Layout, text: &'a str },
    Prepare { layout: &'a Layout, text: &'a str },
    Trial(TrialView<'a>),
    /// Trial frame with the "make a mark first" overlay on top.
    Reminder { view: TrialView<'a>, text: &'a str },
}

impl<'a> Scene<'a> {
    pub fn layout(&self) -> &'a Layout {
        match self {
            Scene::Welcome { layout, .. } | Scene::Prepare { layout, .. } => layout,
            Scene::Trial(view) | Scene::Reminder { view, .. } => view.layout,
        }
    }
}

/// Window, renderer and input devices as seen by the session.
///
/// `poll_input` is called once at the start of every frame; `present` draws a
/// scene and returns once the frame has been handed to the display, which
/// paces the session loops.
pub trait Presenter {
    fn poll_input(&mut self) -> anyhow::Result<InputSnapshot>;
    fn present(&mut self, scene: &Scene<'_>) -> anyhow::Result<()>;

    /// Drops pointer presses collected while the session was blocked in a
    /// pause. Pressed keys are kept so the abort key still takes effect.
    fn discard_pointer_presses(&mut self) -> anyhow::Result<()>;
}
