use crate::types::Size;
use image::imageops::FilterType;
use image::RgbaImage;
use tiny_skia::{Path, PathBuilder, Pixmap, PixmapPaint, Transform};
use ttf_parser::OutlineBuilder;

/// Decodes PNG/JPEG bytes into a premultiplied pixmap.
pub(crate) fn decode_image_to_pixmap(data: &[u8]) -> Option<Pixmap> {
    rgba_to_pixmap(&decode_rgba(data)?)
}

pub(crate) fn decode_rgba(data: &[u8]) -> Option<RgbaImage> {
    let decoded = match image::guess_format(data) {
        Ok(fmt) => image::load_from_memory_with_format(data, fmt).ok()?,
        Err(_) => image::load_from_memory(data).ok()?,
    };
    Some(decoded.to_rgba8())
}

/// Resamples to exactly `size`, ignoring aspect ratio.
pub(crate) fn resize_rgba(image: &RgbaImage, size: Size) -> RgbaImage {
    if image.dimensions() == (size.width, size.height) {
        return image.clone();
    }
    image::imageops::resize(image, size.width, size.height, FilterType::Lanczos3)
}

pub(crate) fn rgba_to_pixmap(rgba: &RgbaImage) -> Option<Pixmap> {
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    let src = rgba.as_raw();
    let dst = pixmap.data_mut();
    for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let a = src_px[3];
        dst_px[0] = premul_u8(src_px[0], a);
        dst_px[1] = premul_u8(src_px[1], a);
        dst_px[2] = premul_u8(src_px[2], a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

/// Composites `overlay` at (x, y) using its own alpha channel.
pub(crate) fn paste_with_alpha(target: &mut Pixmap, overlay: &Pixmap, x: i32, y: i32) {
    target.draw_pixmap(
        x,
        y,
        overlay.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

/// Straight (demultiplied) RGB bytes, alpha dropped.
pub(crate) fn pixmap_to_rgb(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity((pixmap.width() * pixmap.height() * 3) as usize);
    for px in pixmap.pixels() {
        let color = px.demultiply();
        out.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    out
}

pub(crate) fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, String> {
    pixmap
        .encode_png()
        .map_err(|e| format!("png encode failed: {e}"))
}

/// Collects glyph outlines (font units, y up) into a device path (pixels, y down).
pub(crate) struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    pub(crate) fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    pub(crate) fn finish(self) -> Option<Path> {
        self.builder.finish()
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
