use ab_glyph::{Font, Glyph, PxScale, ScaleFont, point};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};

/// Rasterises one line of text into a transparent, premultiplied pixmap.
///
/// The pixmap spans the pen advance horizontally and ascent to descent
/// vertically, so lines of equal size share a baseline when centred. Returns
/// `None` for text without any advance.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let w = pen_x.ceil() as u32;
    let h = (sf.ascent() - sf.descent()).ceil() as u32;
    let mut pm = Pixmap::new(w, h)?;

    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();

    for g in glyphs {
        let Some(out) = font.outline_glyph(g) else {
            continue;
        };
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x).floor() as i32;
            let iy = (y as f32 + b.min.y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a_lin = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let inv = 1.0 - a_lin;
            let bg = dst[i];

            // Porter-Duff over in premultiplied space: out = src + bg * (1 - src.a)
            let over = |s: u8, d: u8| {
                ((s as f32 * a_lin) as u8).saturating_add((d as f32 * inv) as u8)
            };
            let px = PremultipliedColorU8::from_rgba(
                over(cu.red(), bg.red()),
                over(cu.green(), bg.green()),
                over(cu.blue(), bg.blue()),
                sa.saturating_add((bg.alpha() as f32 * inv) as u8),
            );
            if let Some(px) = px {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

/// Advance width of `text` at `font_size`, in pixels.
pub fn text_width<F: Font>(text: &str, font_size: f32, font: &F) -> f32 {
    let sf = font.as_scaled(PxScale::from(font_size));
    let mut prev = None;
    let mut width = 0.0;
    for ch in text.chars() {
        let id = sf.glyph_id(ch);
        if let Some(p) = prev {
            width += sf.kern(p, id);
        }
        width += sf.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Greedy word wrap. Explicit newlines always break, so blank lines survive.
pub fn wrap_lines<F: Font>(text: &str, font_size: f32, font: &F, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && text_width(&candidate, font_size, font) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TextKey {
    text: String,
    size_px: u32,
    color: [u8; 4],
}

/// Rasterised lines keyed by text, pixel size and colour.
pub struct TextCache<F: Font> {
    font: F,
    map: HashMap<TextKey, Option<Arc<Pixmap>>>,
}

impl<F: Font> TextCache<F> {
    pub fn new(font: F) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    pub fn font(&self) -> &F {
        &self.font
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get_or_render(&mut self, text: &str, size_px: f32, color: Color) -> Option<Arc<Pixmap>> {
        let c = color.to_color_u8();
        let key = TextKey {
            text: text.to_string(),
            size_px: size_px.round().max(1.0) as u32,
            color: [c.red(), c.green(), c.blue(), c.alpha()],
        };
        if let Some(p) = self.map.get(&key) {
            return p.clone();
        }
        let pm = render_text_pixmap(text, key.size_px as f32, &self.font, color).map(Arc::new);
        self.map.insert(key, pm.clone());
        pm
    }
}
