//! Conversions between pointer coordinates, line fractions and numeric values.
//!
//! Layout coordinates are centimetres with the origin at the screen centre and
//! y pointing up. The number line lies on the x axis, centred on the origin.

/// How far along `[0, line_length]` a coordinate falls.
///
/// `0` is the visual start of the line. No clamping is applied; callers keep
/// `line_pos` within the line's extent.
pub fn to_fraction(line_pos: f64, line_length: f64) -> f64 {
    line_pos / line_length
}

/// Linear interpolation of `fraction` between `start` and `end`.
pub fn to_value(fraction: f64, start: f64, end: f64) -> f64 {
    (end - start) * fraction + start
}

/// Numeric bounds of a block's number line. `end > start` is checked when the
/// configuration is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: f64,
    pub end: f64,
}

impl LineSegment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Ground-truth fraction of a value on this line.
    pub fn fraction_of(&self, value: f64) -> f64 {
        (value - self.start) / self.span()
    }

    pub fn value_at(&self, fraction: f64) -> f64 {
        to_value(fraction, self.start, self.end)
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.end > self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle described by its centre and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: Point,
    pub half_width: f64,
    pub half_height: f64,
}

impl Rect {
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        Self {
            center,
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f64 {
        self.half_height * 2.0
    }

    pub fn left(&self) -> f64 {
        self.center.x - self.half_width
    }

    pub fn right(&self) -> f64 {
        self.center.x + self.half_width
    }

    pub fn top(&self) -> f64 {
        self.center.y + self.half_height
    }

    pub fn bottom(&self) -> f64 {
        self.center.y - self.half_height
    }

    /// Edge-inclusive hit test.
    pub fn contains(&self, p: Point) -> bool {
        (p.x - self.center.x).abs() <= self.half_width
            && (p.y - self.center.y).abs() <= self.half_height
    }
}

/// Maps between window pixels (origin top-left, y down) and layout centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width_px: u32,
    pub height_px: u32,
    pub px_per_cm: f64,
}

impl Viewport {
    /// `monitor_width_cm` is the physical width of the visible area.
    pub fn new(width_px: u32, height_px: u32, monitor_width_cm: f64) -> Self {
        Self {
            width_px,
            height_px,
            px_per_cm: width_px as f64 / monitor_width_cm,
        }
    }

    pub fn to_px(&self, p: Point) -> (f32, f32) {
        let x = self.width_px as f64 / 2.0 + p.x * self.px_per_cm;
        let y = self.height_px as f64 / 2.0 - p.y * self.px_per_cm;
        (x as f32, y as f32)
    }

    pub fn to_cm(&self, x_px: f64, y_px: f64) -> Point {
        Point {
            x: (x_px - self.width_px as f64 / 2.0) / self.px_per_cm,
            y: (self.height_px as f64 / 2.0 - y_px) / self.px_per_cm,
        }
    }

    pub fn len_px(&self, cm: f64) -> f32 {
        (cm * self.px_per_cm) as f32
    }
}
