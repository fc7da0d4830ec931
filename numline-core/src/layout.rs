//! Stimulus geometry in layout centimetres.
//!
//! Placements specified in normalized screen units (`-1..1` on both axes) are
//! converted with the physical screen size, so the line keeps its absolute
//! length on any monitor while text and buttons scale with the screen.

use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Visible screen area.
    pub screen: Rect,
    pub line_length: f64,
    pub hatch_length: f64,
    /// Invisible press target around the line.
    pub line_region: Rect,
    /// The "ready" button.
    pub confirm: Rect,
    pub confirm_label: String,
    pub confirm_letter: f64,
    /// Vertical position and size of the start/end labels.
    pub label_y: f64,
    pub label_letter: f64,
    pub target_pos: Point,
    pub target_letter: f64,
    pub prepare_letter: f64,
    pub welcome_letter: f64,
    pub welcome_width: f64,
    pub reminder_letter: f64,
    pub reminder_width: f64,
}

impl Layout {
    /// `confirm_letter_norm` is the button's letter height in normalized units.
    pub fn new(
        screen_width: f64,
        screen_height: f64,
        line_length: f64,
        hatch_length: f64,
        confirm_label: impl Into<String>,
        confirm_letter_norm: f64,
    ) -> Self {
        let half_w = screen_width / 2.0;
        let half_h = screen_height / 2.0;
        let norm = |x: f64, y: f64| Point::new(x * half_w, y * half_h);

        let confirm_label = confirm_label.into();
        let label_chars = confirm_label.chars().count() as f64;
        let confirm = Rect::from_center(
            norm(2.0 / 3.0, -2.0 / 3.0),
            confirm_letter_norm / 1.5 * label_chars * half_w,
            0.2 * half_h,
        );

        Self {
            screen: Rect::from_center(Point::ORIGIN, screen_width, screen_height),
            line_length,
            hatch_length,
            line_region: Rect::from_center(Point::ORIGIN, line_length, hatch_length),
            confirm,
            confirm_label,
            confirm_letter: confirm_letter_norm * half_h,
            label_y: hatch_length * 1.5,
            label_letter: hatch_length,
            target_pos: norm(0.0, 0.5),
            target_letter: 0.2 * half_h,
            prepare_letter: 0.1 * half_h,
            welcome_letter: 0.06 * half_h,
            welcome_width: 0.8 * screen_width,
            reminder_letter: 0.2 * half_h,
            reminder_width: 0.85 * screen_width,
        }
    }

    /// Screen height from resolution and physical width, assuming square pixels.
    pub fn screen_height_for(res: (u32, u32), width_cm: f64) -> f64 {
        width_cm * res.1 as f64 / res.0 as f64
    }

    pub fn line_start_x(&self) -> f64 {
        -self.line_length / 2.0
    }

    pub fn line_end_x(&self) -> f64 {
        self.line_length / 2.0
    }

    /// Distance of `x` from the line's visual start.
    pub fn offset_from_start(&self, x: f64) -> f64 {
        x - self.line_start_x()
    }

    pub fn clamp_to_line(&self, x: f64) -> f64 {
        x.clamp(self.line_start_x(), self.line_end_x())
    }
}
