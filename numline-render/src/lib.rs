pub mod render;
pub mod text;

pub use render::{RenderStats, SkiaRenderer};
pub use text::{TextCache, render_text_pixmap, wrap_lines};
