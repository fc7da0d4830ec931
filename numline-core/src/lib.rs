pub mod color;
pub mod error;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod scene;
pub mod trial;

pub use color::{Color, Palette};
pub use error::{ConfigError, ExperimentError};
pub use geometry::{LineSegment, Point, Rect, Viewport, to_fraction, to_value};
pub use input::{InputSnapshot, Key};
pub use layout::Layout;
pub use scene::{Presenter, Scene, TrialView};
pub use trial::{MarkPhase, Target, TrialRecord, TrialTiming};
