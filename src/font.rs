use crate::error::CertError;
use crate::raster::GlyphPathBuilder;
use crate::types::Color;
use rustybuzz::{Direction as HbDirection, Face as HbFace, UnicodeBuffer};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tiny_skia::{FillRule, Paint, Pixmap, Transform};
use ttf_parser::GlyphId;

/// Measures and draws styled text in template pixel space.
///
/// `x`/`y` passed to [`TextRenderer::draw`] address the top-left corner of the
/// text box; implementations place the baseline themselves.
pub trait TextRenderer: Send + Sync {
    fn measure(&self, text: &str, emphasized: bool, size: f32) -> i32;

    #[allow(clippy::too_many_arguments)]
    fn draw(
        &self,
        pixmap: &mut Pixmap,
        x: i32,
        y: i32,
        text: &str,
        emphasized: bool,
        size: f32,
        color: Color,
    );
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, i32>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &TextWidthKey) -> Option<i32> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: i32) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

#[derive(Clone, Copy)]
struct GlyphPlacement {
    glyph_id: u16,
    offset_x: f32,
    offset_y: f32,
}

/// One parsed TrueType/OpenType face. Font bytes are shared, never mutated.
#[derive(Debug)]
pub struct FontFace {
    name: String,
    data: Arc<Vec<u8>>,
    units_per_em: f32,
    ascender: f32,
    width_cache: Mutex<TextWidthCache>,
}

impl FontFace {
    pub fn from_bytes(data: Vec<u8>, source_name: &str) -> Result<Self, CertError> {
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(CertError::Asset(format!(
                "invalid font data for {source_name}"
            )));
        };
        let name = font_name(&face, Path::new(source_name));
        let units_per_em = face.units_per_em().max(1) as f32;
        let ascender = face.ascender() as f32;
        Ok(Self {
            name,
            data: Arc::new(data),
            units_per_em,
            ascender,
            width_cache: Mutex::new(TextWidthCache::new(4_096)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Advance width of `text` in whole pixels at `size` px per em.
    pub fn measure_px(&self, text: &str, size: f32) -> i32 {
        if text.is_empty() {
            return 0;
        }
        let key = TextWidthKey {
            size_milli: (size as f64 * 1000.0).round() as i64,
            text: text.to_string(),
        };
        if let Ok(cache) = self.width_cache.lock() {
            if let Some(value) = cache.get(&key) {
                return value;
            }
        }
        let advance: f32 = self
            .layout(text)
            .map(|(_, advance)| advance)
            .unwrap_or(0.0);
        let value = (advance * size / self.units_per_em).round() as i32;
        if let Ok(mut cache) = self.width_cache.lock() {
            cache.insert(key, value);
        }
        value
    }

    fn draw_at(&self, pixmap: &mut Pixmap, x: i32, y: i32, text: &str, size: f32, color: Color) {
        let debug_text = std::env::var("CERTPRESS_RASTER_DEBUG_TEXT")
            .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(false);
        if size <= 0.0 || text.is_empty() {
            return;
        }
        let Ok(face) = ttf_parser::Face::parse(self.data.as_slice(), 0) else {
            return;
        };
        let Some((placements, _)) = self.layout(text) else {
            return;
        };
        let scale = size / self.units_per_em;
        let baseline_x = x as f32;
        let baseline_y = y as f32 + self.ascender * scale;
        let mut paint = Paint::default();
        paint.set_color(color.to_sk_color());
        paint.anti_alias = true;

        let mut drawn = 0usize;
        for placement in placements {
            let mut builder = GlyphPathBuilder::new(
                baseline_x + placement.offset_x * scale,
                baseline_y - placement.offset_y * scale,
                scale,
            );
            if face
                .outline_glyph(GlyphId(placement.glyph_id), &mut builder)
                .is_none()
            {
                continue;
            }
            let Some(path) = builder.finish() else {
                continue;
            };
            pixmap.fill_path(
                &path,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
            drawn += 1;
        }

        if debug_text {
            eprintln!(
                "[certpress][raster-text] font='{}' size={:.2} glyphs={} at=({},{}) text='{}'",
                self.name,
                size,
                drawn,
                x,
                y,
                truncate_debug_text(text)
            );
        }
    }

    // Glyph placements in font units plus the total advance.
    fn layout(&self, text: &str) -> Option<(Vec<GlyphPlacement>, f32)> {
        if let Some(shaped) = self.layout_shaped(text) {
            return Some(shaped);
        }
        self.layout_unshaped(text)
    }

    fn layout_shaped(&self, text: &str) -> Option<(Vec<GlyphPlacement>, f32)> {
        let face = HbFace::from_slice(self.data.as_slice(), 0)?;
        let mut buffer = UnicodeBuffer::new();
        buffer.set_direction(HbDirection::LeftToRight);
        buffer.push_str(text);
        let output = rustybuzz::shape(&face, &[], buffer);
        let infos = output.glyph_infos();
        let positions = output.glyph_positions();
        if infos.is_empty() || infos.len() != positions.len() {
            return None;
        }
        let mut out = Vec::with_capacity(infos.len());
        let mut pen_x = 0.0f32;
        for (info, pos) in infos.iter().zip(positions.iter()) {
            let gid = info.glyph_id as u16;
            if gid != 0 {
                out.push(GlyphPlacement {
                    glyph_id: gid,
                    offset_x: pen_x + pos.x_offset as f32,
                    offset_y: pos.y_offset as f32,
                });
            }
            pen_x += pos.x_advance as f32;
        }
        Some((out, pen_x.max(0.0)))
    }

    fn layout_unshaped(&self, text: &str) -> Option<(Vec<GlyphPlacement>, f32)> {
        let face = ttf_parser::Face::parse(self.data.as_slice(), 0).ok()?;
        let fallback_advance = self.units_per_em * 0.5;
        let mut out = Vec::new();
        let mut pen_x = 0.0f32;
        for ch in text.chars() {
            let Some(gid) = face.glyph_index(ch) else {
                pen_x += fallback_advance;
                continue;
            };
            out.push(GlyphPlacement {
                glyph_id: gid.0,
                offset_x: pen_x,
                offset_y: 0.0,
            });
            pen_x += face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32)
                .unwrap_or(fallback_advance);
        }
        Some((out, pen_x))
    }
}

/// Regular and bold faces; emphasized runs use the bold face.
#[derive(Debug)]
pub struct FontPair {
    pub regular: FontFace,
    pub bold: FontFace,
}

impl FontPair {
    pub fn new(regular: FontFace, bold: FontFace) -> Self {
        Self { regular, bold }
    }

    fn face(&self, emphasized: bool) -> &FontFace {
        if emphasized { &self.bold } else { &self.regular }
    }
}

impl TextRenderer for FontPair {
    fn measure(&self, text: &str, emphasized: bool, size: f32) -> i32 {
        self.face(emphasized).measure_px(text, size)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw(
        &self,
        pixmap: &mut Pixmap,
        x: i32,
        y: i32,
        text: &str,
        emphasized: bool,
        size: f32,
        color: Color,
    ) {
        self.face(emphasized)
            .draw_at(pixmap, x, y, text, size, color);
    }
}

/// Rejects renderers that report zero width for ordinary text; such a
/// font would collapse every line onto the center point.
pub(crate) fn check_measurable(renderer: &dyn TextRenderer, size: f32) -> Result<(), CertError> {
    for emphasized in [false, true] {
        if renderer.measure("Mw", emphasized, size) <= 0 {
            let style = if emphasized { "bold" } else { "regular" };
            return Err(CertError::InvalidConfiguration(format!(
                "{style} font measures zero width at size {size}"
            )));
        }
    }
    Ok(())
}

fn truncate_debug_text(text: &str) -> String {
    const MAX_CHARS: usize = 48;
    let mut out = String::new();
    for (idx, ch) in text.chars().enumerate() {
        if idx >= MAX_CHARS {
            out.push_str("...");
            break;
        }
        if ch.is_control() {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

fn font_name(face: &ttf_parser::Face<'_>, path: &Path) -> String {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => {
                if family.is_none() {
                    family = Some(name);
                }
            }
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            name_id::POST_SCRIPT_NAME => {
                if post.is_none() {
                    post = Some(name);
                }
            }
            _ => {}
        }
    }
    let stem = path
        .file_stem()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string());
    post.or(full)
        .or(family)
        .or(stem)
        .unwrap_or_else(|| "EmbeddedFont".to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::BlockText;
    use super::*;

    #[test]
    fn invalid_font_bytes_are_an_asset_error() {
        let err = FontFace::from_bytes(b"definitely not a font".to_vec(), "Broken.ttf")
            .unwrap_err();
        assert!(matches!(err, CertError::Asset(_)));
        assert!(err.to_string().contains("Broken.ttf"));
    }

    #[test]
    fn width_cache_evicts_oldest_entries() {
        let mut cache = TextWidthCache::new(2);
        let key = |text: &str| TextWidthKey {
            size_milli: 40_000,
            text: text.to_string(),
        };
        cache.insert(key("a"), 1);
        cache.insert(key("b"), 2);
        cache.insert(key("c"), 3);
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")), Some(2));
        assert_eq!(cache.get(&key("c")), Some(3));
    }

    #[test]
    fn zero_width_renderer_is_rejected() {
        let err = check_measurable(&BlockText { advance: 0 }, 40.0).unwrap_err();
        assert!(matches!(err, CertError::InvalidConfiguration(_)));
        assert!(check_measurable(&BlockText { advance: 5 }, 40.0).is_ok());
    }

    #[test]
    fn truncate_debug_text_limits_length() {
        let long = "x".repeat(60);
        let out = truncate_debug_text(&long);
        assert_eq!(out.len(), 51);
        assert!(out.ends_with("..."));
    }

    fn system_font_bytes() -> Option<Vec<u8>> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/Library/Fonts/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .find_map(|path| std::fs::read(path).ok())
    }

    #[test]
    fn system_font_measures_and_draws_when_available() {
        let Some(bytes) = system_font_bytes() else {
            return;
        };
        let face = FontFace::from_bytes(bytes, "system.ttf").expect("font");
        let short = face.measure_px("Hello", 40.0);
        let long = face.measure_px("Hello, world", 40.0);
        assert!(short > 0);
        assert!(long > short);
        assert_eq!(face.measure_px("Hello", 40.0), short);

        let mut pixmap = Pixmap::new(300, 80).unwrap();
        pixmap.fill(tiny_skia::Color::WHITE);
        face.draw_at(&mut pixmap, 10, 10, "Hello", 40.0, Color::BLACK);
        assert!(pixmap.pixels().iter().any(|px| px.red() < 128));
    }
}
