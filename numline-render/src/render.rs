use crate::text::{TextCache, wrap_lines};
use ab_glyph::FontVec;
use anyhow::{Result, anyhow, bail};
use numline_core::{Layout, Palette, Point, Rect as LayoutRect, Scene, TrialView, Viewport};
use numline_timing::{FrameStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform};

const LINE_WIDTH_PX: f32 = 2.0;
const HATCH_WIDTH_PX: f32 = 3.0;
const BORDER_WIDTH_PX: f32 = 4.0;
const LINE_SPACING: f32 = 1.1;

/// Time spent in each stage of one `render_frame` call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
}

fn skia_color(c: numline_core::Color) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, 255)
}

fn solid(color: numline_core::Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(skia_color(color));
    paint
}

/// Draws scenes into an opaque offscreen canvas and copies it into an RGBA
/// frame buffer.
///
/// Layout centimetres are mapped to pixels with the canvas width spanning the
/// layout's screen width. Without a font every text element is skipped.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    palette: Palette,
    canvas: Pixmap,
    text: Option<TextCache<FontVec>>,
    timer: HighPrecisionTimer,
    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, palette: Palette, font: Option<FontVec>) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
        Ok(Self {
            width,
            height,
            palette,
            canvas,
            text: font.map(TextCache::new),
            timer: HighPrecisionTimer::new(),
            component_timers: ["clear", "draw", "copy"]
                .iter()
                .map(|&k| (k, HighPrecisionTimer::new()))
                .collect(),
        })
    }

    /// Reads a TrueType/OpenType font from disk.
    pub fn load_font(path: impl AsRef<Path>) -> Result<FontVec> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow!("failed to read font {}: {e}", path.display()))?;
        FontVec::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {e}", path.display()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_font(&self) -> bool {
        self.text.is_some()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Accumulated timings of one stage: `"clear"`, `"draw"` or `"copy"`.
    pub fn component_stats(&self, stage: &str) -> Option<FrameStats> {
        self.component_timers.get(stage).map(HighPrecisionTimer::frame_stats)
    }

    /// Timings of whole frames.
    pub fn frame_stats(&self) -> FrameStats {
        self.timer.frame_stats()
    }

    /// Draws `scene` and copies the result into `frame`, which must hold
    /// `width * height` RGBA pixels.
    pub fn render_frame(&mut self, scene: &Scene<'_>, frame: &mut [u8]) -> Result<RenderStats> {
        if frame.len() != self.canvas.data().len() {
            bail!(
                "frame buffer is {} bytes, expected {} for {}x{}",
                frame.len(),
                self.canvas.data().len(),
                self.width,
                self.height
            );
        }
        let total_start = self.timer.now();

        let t = self.timer.now();
        self.canvas.fill(skia_color(self.palette.background));
        let clear = self.timer.elapsed(t);

        let t = self.timer.now();
        let layout = scene.layout();
        let vp = Viewport::new(self.width, self.height, layout.screen.width());
        match scene {
            Scene::Welcome { text, .. } => {
                let size = vp.len_px(layout.welcome_letter);
                let width = vp.len_px(layout.welcome_width);
                let color = self.palette.stimulus;
                self.draw_text(text, vp.to_px(Point::ORIGIN), size, color, Some(width));
            }
            Scene::Prepare { text, .. } => {
                let size = vp.len_px(layout.prepare_letter);
                let width = vp.len_px(layout.screen.width());
                let color = self.palette.stimulus;
                self.draw_text(text, vp.to_px(Point::ORIGIN), size, color, Some(width));
            }
            Scene::Trial(view) => self.draw_trial(view, &vp),
            Scene::Reminder { view, text } => {
                self.draw_trial(view, &vp);
                self.draw_reminder(layout, text, &vp);
            }
        }
        let draw = self.timer.elapsed(t);

        let t = self.timer.now();
        frame.copy_from_slice(self.canvas.data());
        let copy = self.timer.elapsed(t);

        let total = self.timer.elapsed(total_start);
        for (stage, d) in [("clear", clear), ("draw", draw), ("copy", copy)] {
            if let Some(timer) = self.component_timers.get_mut(stage) {
                timer.record_frame(d);
            }
        }
        self.timer.record_frame(total);

        Ok(RenderStats {
            clear,
            draw,
            copy,
            total,
        })
    }

    fn draw_trial(&mut self, view: &TrialView<'_>, vp: &Viewport) {
        let layout = view.layout;
        let palette = self.palette;

        let (x0, y0) = vp.to_px(Point::new(layout.line_start_x(), 0.0));
        let len = vp.len_px(layout.line_length);
        self.fill_px(x0, y0 - LINE_WIDTH_PX / 2.0, len, LINE_WIDTH_PX, palette.stimulus);

        if let Some(x) = view.mark_x {
            let (mx, my) = vp.to_px(Point::new(x, 0.0));
            let h = vp.len_px(layout.hatch_length);
            let x = mx - HATCH_WIDTH_PX / 2.0;
            self.fill_px(x, my - h / 2.0, HATCH_WIDTH_PX, h, palette.hatch);
        }

        let label_px = vp.len_px(layout.label_letter);
        let start = vp.to_px(Point::new(layout.line_start_x(), layout.label_y));
        let end = vp.to_px(Point::new(layout.line_end_x(), layout.label_y));
        self.draw_text(view.start_label, start, label_px, palette.stimulus, None);
        self.draw_text(view.end_label, end, label_px, palette.stimulus, None);

        if let Some(target) = view.target_label {
            let size = vp.len_px(layout.target_letter);
            self.draw_text(target, vp.to_px(layout.target_pos), size, palette.stimulus, None);
        }

        self.fill_layout_rect(vp, &layout.confirm, palette.stimulus);
        let label_color = if view.confirm_highlighted {
            self.stroke_layout_rect(vp, &layout.confirm, palette.highlight);
            palette.highlight
        } else {
            palette.background
        };
        self.draw_text(
            &layout.confirm_label,
            vp.to_px(layout.confirm.center),
            vp.len_px(layout.confirm_letter),
            label_color,
            None,
        );
    }

    fn draw_reminder(&mut self, layout: &Layout, text: &str, vp: &Viewport) {
        let size = vp.len_px(layout.reminder_letter);
        let width = vp.len_px(layout.reminder_width);
        let padding = size * 0.5;
        let lines = self
            .text
            .as_ref()
            .map_or(1, |cache| wrap_lines(text, size, cache.font(), width - padding).len());
        let height = lines as f32 * size * LINE_SPACING + padding;

        let (cx, cy) = vp.to_px(Point::ORIGIN);
        let (x, y) = (cx - width / 2.0, cy - height / 2.0);
        self.fill_px(x, y, width, height, self.palette.hatch);
        if let Some(rect) = Rect::from_xywh(x, y, width, height) {
            self.stroke_px(rect, self.palette.highlight);
        }
        self.draw_text(text, (cx, cy), size, self.palette.highlight, Some(width - padding));
    }

    fn fill_px(&mut self, x: f32, y: f32, w: f32, h: f32, color: numline_core::Color) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            self.canvas
                .fill_rect(rect, &solid(color), Transform::identity(), None);
        }
    }

    fn stroke_px(&mut self, rect: Rect, color: numline_core::Color) {
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width: BORDER_WIDTH_PX,
            ..Default::default()
        };
        self.canvas
            .stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
    }

    fn layout_rect_px(vp: &Viewport, r: &LayoutRect) -> Option<Rect> {
        let (x, y) = vp.to_px(Point::new(r.left(), r.top()));
        Rect::from_xywh(x, y, vp.len_px(r.width()), vp.len_px(r.height()))
    }

    fn fill_layout_rect(&mut self, vp: &Viewport, r: &LayoutRect, color: numline_core::Color) {
        if let Some(rect) = Self::layout_rect_px(vp, r) {
            self.canvas
                .fill_rect(rect, &solid(color), Transform::identity(), None);
        }
    }

    fn stroke_layout_rect(&mut self, vp: &Viewport, r: &LayoutRect, color: numline_core::Color) {
        if let Some(rect) = Self::layout_rect_px(vp, r) {
            self.stroke_px(rect, color);
        }
    }

    /// Draws `text` centred on `center`, wrapping at `max_width` when given.
    fn draw_text(
        &mut self,
        text: &str,
        center: (f32, f32),
        size_px: f32,
        color: numline_core::Color,
        max_width: Option<f32>,
    ) {
        let Some(cache) = self.text.as_mut() else {
            return;
        };
        let lines = match max_width {
            Some(w) => wrap_lines(text, size_px, cache.font(), w),
            None => text.lines().map(str::to_string).collect(),
        };
        let line_h = size_px * LINE_SPACING;
        let top = center.1 - line_h * lines.len() as f32 / 2.0;

        for (i, line) in lines.iter().enumerate() {
            let Some(pm) = cache.get_or_render(line, size_px, skia_color(color)) else {
                continue;
            };
            let pm: &Pixmap = &pm;
            let x = center.0 - pm.width() as f32 / 2.0;
            let y = top + line_h * (i as f32 + 0.5) - pm.height() as f32 / 2.0;
            self.canvas.draw_pixmap(
                x.round() as i32,
                y.round() as i32,
                pm.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
    }
}
