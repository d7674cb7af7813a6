use crate::assets::CertificateAssets;
use crate::config::LayoutConfig;
use crate::error::CertError;
use crate::raster::{encode_png, paste_with_alpha};
use crate::roster::RosterRow;
use crate::types::{Point, TemplateVariant};
use crate::wrap::{Line, centered_start};
use std::path::{Path, PathBuf};
use tiny_skia::Pixmap;

/// One rendered certificate. Owned by the render pass that produced it.
#[derive(Clone)]
pub struct CertificateImage {
    pub row_number: usize,
    pub row_name: String,
    pub variant: TemplateVariant,
    pixmap: Pixmap,
}

impl CertificateImage {
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, CertError> {
        encode_png(&self.pixmap).map_err(|message| CertError::Render {
            row_number: self.row_number,
            name: self.row_name.clone(),
            message,
        })
    }

    pub fn save_png(&self, path: &Path) -> Result<(), CertError> {
        let png = self.to_png()?;
        std::fs::write(path, png)?;
        Ok(())
    }
}

impl std::fmt::Debug for CertificateImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateImage")
            .field("row_number", &self.row_number)
            .field("row_name", &self.row_name)
            .field("variant", &self.variant)
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish()
    }
}

/// How per-row PNG files are named inside the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// `<name>.png`; rows sharing a name overwrite each other.
    #[default]
    RowName,
    /// `<row number>_<name>.png`; unique per batch.
    IndexedRowName,
}

pub fn output_path(dir: &Path, row_number: usize, name: &str, naming: OutputNaming) -> PathBuf {
    let stem = sanitize_file_stem(name);
    let file_name = match naming {
        OutputNaming::RowName => format!("{stem}.png"),
        OutputNaming::IndexedRowName => format!("{row_number:04}_{stem}.png"),
    };
    dir.join(file_name)
}

fn sanitize_file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('_');
        }
    }
    let out = out.trim_matches(|c| c == '.' || c == '_').to_string();
    if out.is_empty() {
        "certificate".to_string()
    } else {
        out
    }
}

/// Origins of every text run of `lines`, in drawing order.
pub fn line_run_origins(lines: &[Line], layout: &LayoutConfig) -> Vec<Vec<Point>> {
    let mut out = Vec::with_capacity(lines.len());
    let mut y = layout.text_start_y;
    for line in lines {
        let mut x = line.start_x(layout.text_center_x);
        let mut origins = Vec::with_capacity(line.runs().len());
        for run in line.runs() {
            origins.push(Point::new(x, y));
            x += run.width;
        }
        out.push(origins);
        y += layout.line_height;
    }
    out
}

/// Top-left corners of the two signature boxes.
pub fn signature_origins(layout: &LayoutConfig) -> [Point; 2] {
    let half = (layout.signature_box.width as i32).div_euclid(2);
    layout
        .label_centers
        .map(|center| Point::new(center - half, layout.signature_y))
}

/// Draws one certificate onto a private copy of the rank-selected template.
pub fn render_certificate(
    row_number: usize,
    row: &RosterRow,
    lines: &[Line],
    assets: &CertificateAssets,
    layout: &LayoutConfig,
) -> Result<CertificateImage, CertError> {
    let variant = row.variant(&layout.participation_sentinel);
    let mut pixmap = assets.template(variant).clone();
    let renderer = assets.text_renderer();

    for (line, origins) in lines.iter().zip(line_run_origins(lines, layout)) {
        for (run, origin) in line.runs().iter().zip(origins) {
            renderer.draw(
                &mut pixmap,
                origin.x,
                origin.y,
                run.run.text(),
                run.run.is_emphasized(),
                layout.body_font_size,
                layout.text_color,
            );
        }
    }

    for (signature, origin) in assets.signatures().iter().zip(signature_origins(layout)) {
        paste_with_alpha(&mut pixmap, signature, origin.x, origin.y);
    }

    for (label, center) in assets
        .text()
        .signatory_names
        .iter()
        .zip(layout.label_centers)
    {
        let width = renderer.measure(label, false, layout.label_font_size);
        renderer.draw(
            &mut pixmap,
            centered_start(center, width),
            layout.label_y,
            label,
            false,
            layout.label_font_size,
            layout.text_color,
        );
    }

    Ok(CertificateImage {
        row_number,
        row_name: row.name().to_string(),
        variant,
        pixmap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::{EXCELLENCE_RGBA, PARTICIPATION_RGBA, block_renderer, bundle};
    use crate::config::CertificateText;
    use crate::message::build_runs;
    use crate::types::Size;
    use crate::wrap::wrap;

    fn small_layout() -> LayoutConfig {
        LayoutConfig {
            max_line_width: 160,
            line_height: 12,
            text_start_y: 60,
            text_center_x: 100,
            label_centers: [55, 145],
            label_y: 110,
            signature_y: 95,
            signature_box: Size::new(10, 8),
            page_size: Size::new(200, 140),
            body_font_size: 10.0,
            label_font_size: 10.0,
            ..LayoutConfig::default()
        }
    }

    fn assets(layout: &LayoutConfig) -> CertificateAssets {
        CertificateAssets::load(
            &bundle(Size::new(200, 140)),
            CertificateText::new("Fest", "Rao", "Iyer"),
            layout.signature_box,
            Some(block_renderer()),
        )
        .unwrap()
    }

    fn lines_for(row: &RosterRow, assets: &CertificateAssets, layout: &LayoutConfig) -> Vec<Line> {
        let runs = build_runs(row, &assets.text().event_name, &layout.participation_sentinel);
        let renderer = assets.text_renderer();
        wrap(
            &runs,
            |text, emphasized| renderer.measure(text, emphasized, layout.body_font_size),
            layout.max_line_width,
        )
    }

    fn rgb_at(image: &CertificateImage, x: u32, y: u32) -> [u8; 3] {
        let px = image.pixmap().pixel(x, y).unwrap().demultiply();
        [px.red(), px.green(), px.blue()]
    }

    #[test]
    fn rank_selects_template_variant() {
        let layout = small_layout();
        let assets = assets(&layout);

        let row = RosterRow::new("Ada", "PARTICIPATION", "MIT").unwrap();
        let image = render_certificate(1, &row, &lines_for(&row, &assets, &layout), &assets, &layout)
            .unwrap();
        assert_eq!(image.variant, TemplateVariant::Participation);
        let [r, g, b, _] = PARTICIPATION_RGBA;
        assert_eq!(rgb_at(&image, 0, 0), [r, g, b]);

        let row = RosterRow::new("Ada", "First", "MIT").unwrap();
        let image = render_certificate(2, &row, &lines_for(&row, &assets, &layout), &assets, &layout)
            .unwrap();
        assert_eq!(image.variant, TemplateVariant::Excellence);
        let [r, g, b, _] = EXCELLENCE_RGBA;
        assert_eq!(rgb_at(&image, 0, 0), [r, g, b]);
        assert_eq!(image.row_number, 2);
    }

    #[test]
    fn shared_template_is_not_mutated() {
        let layout = small_layout();
        let assets = assets(&layout);
        let before = assets.template(TemplateVariant::Excellence).clone();
        let row = RosterRow::new("Grace", "Second", "Navy").unwrap();
        render_certificate(1, &row, &lines_for(&row, &assets, &layout), &assets, &layout).unwrap();
        assert_eq!(
            assets.template(TemplateVariant::Excellence).data(),
            before.data()
        );
    }

    #[test]
    fn lines_are_centered_and_stacked() {
        let layout = small_layout();
        let assets = assets(&layout);
        let row = RosterRow::new("Ada", "First", "MIT").unwrap();
        let lines = lines_for(&row, &assets, &layout);
        assert!(lines.len() > 1);
        let origins = line_run_origins(&lines, &layout);
        for (idx, (line, line_origins)) in lines.iter().zip(&origins).enumerate() {
            let first = line_origins[0];
            assert_eq!(first.x, 100 - line.width().div_euclid(2));
            assert_eq!(first.y, 60 + 12 * idx as i32);
            let last = line_origins[line_origins.len() - 1];
            let last_width = line.runs()[line.runs().len() - 1].width;
            assert_eq!(last.x + last_width - first.x, line.width());
        }
    }

    #[test]
    fn first_line_pixels_are_drawn_at_centered_origin() {
        let layout = small_layout();
        let assets = assets(&layout);
        let row = RosterRow::new("Ada", "First", "MIT").unwrap();
        let lines = lines_for(&row, &assets, &layout);
        let image = render_certificate(1, &row, &lines, &assets, &layout).unwrap();
        let start = lines[0].start_x(layout.text_center_x) as u32;
        // "This" begins the first run; block glyphs are solid text-colored boxes.
        assert_eq!(rgb_at(&image, start + 1, 61), [0, 0, 0]);
        let [r, g, b, _] = EXCELLENCE_RGBA;
        assert_eq!(rgb_at(&image, start - 1, 61), [r, g, b]);
    }

    #[test]
    fn signatures_are_pasted_in_their_boxes() {
        let layout = small_layout();
        let assets = assets(&layout);
        let row = RosterRow::new("Ada", "First", "MIT").unwrap();
        let image = render_certificate(1, &row, &[], &assets, &layout).unwrap();
        let [first, second] = signature_origins(&layout);
        assert_eq!(first, Point::new(50, 95));
        assert_eq!(second, Point::new(140, 95));
        assert_eq!(rgb_at(&image, 52, 97), [0, 0, 0]);
        let [r, g, _] = rgb_at(&image, 142, 97);
        assert!(r < 10 && (110..=130).contains(&g), "unexpected signature pixel");
        let [r, g, b, _] = EXCELLENCE_RGBA;
        assert_eq!(rgb_at(&image, 49, 97), [r, g, b]);
    }

    #[test]
    fn labels_are_centered_under_signatures() {
        let layout = small_layout();
        let assets = assets(&layout);
        let row = RosterRow::new("Ada", "First", "MIT").unwrap();
        let image = render_certificate(1, &row, &[], &assets, &layout).unwrap();
        // "Rao" is three 5px block glyphs: width 15, start 55 - 7 = 48.
        assert_eq!(rgb_at(&image, 48, 111), [0, 0, 0]);
        let [r, g, b, _] = EXCELLENCE_RGBA;
        assert_eq!(rgb_at(&image, 47, 111), [r, g, b]);
        assert_eq!(rgb_at(&image, 63, 111), [r, g, b]);
    }

    #[test]
    fn output_paths_follow_naming_policy() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            output_path(dir, 3, "Ada Lovelace", OutputNaming::RowName),
            PathBuf::from("/tmp/out/Ada_Lovelace.png")
        );
        assert_eq!(
            output_path(dir, 3, "Ada Lovelace", OutputNaming::IndexedRowName),
            PathBuf::from("/tmp/out/0003_Ada_Lovelace.png")
        );
        assert_eq!(
            output_path(dir, 1, "../../etc/passwd", OutputNaming::RowName),
            PathBuf::from("/tmp/out/etcpasswd.png")
        );
        assert_eq!(
            output_path(dir, 1, "///", OutputNaming::RowName),
            PathBuf::from("/tmp/out/certificate.png")
        );
    }
}
