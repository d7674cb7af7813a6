use crate::config::CertificateText;
use crate::error::CertError;
use crate::font::{FontFace, FontPair, TextRenderer};
use crate::raster::{decode_image_to_pixmap, decode_rgba, resize_rgba, rgba_to_pixmap};
use crate::types::{Size, TemplateVariant};
use base64::Engine;
use std::path::PathBuf;
use std::sync::Arc;
use tiny_skia::Pixmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetRole {
    ParticipationTemplate,
    ExcellenceTemplate,
    RegularFont,
    BoldFont,
    FirstSignature,
    SecondSignature,
}

impl AssetRole {
    pub const ALL: [AssetRole; 6] = [
        AssetRole::ParticipationTemplate,
        AssetRole::ExcellenceTemplate,
        AssetRole::RegularFont,
        AssetRole::BoldFont,
        AssetRole::FirstSignature,
        AssetRole::SecondSignature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRole::ParticipationTemplate => "participation template",
            AssetRole::ExcellenceTemplate => "excellence template",
            AssetRole::RegularFont => "regular font",
            AssetRole::BoldFont => "bold font",
            AssetRole::FirstSignature => "first signature",
            AssetRole::SecondSignature => "second signature",
        }
    }

    pub fn is_font(&self) -> bool {
        matches!(self, AssetRole::RegularFont | AssetRole::BoldFont)
    }
}

/// Where an asset's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    File(PathBuf),
    Bytes(Vec<u8>),
    /// `data:<mime>[;base64],<payload>`
    DataUri(String),
}

impl AssetSource {
    pub fn read(&self) -> Result<Vec<u8>, CertError> {
        match self {
            AssetSource::File(path) => std::fs::read(path).map_err(|err| {
                CertError::Asset(format!("cannot read {}: {}", path.display(), err))
            }),
            AssetSource::Bytes(data) => Ok(data.clone()),
            AssetSource::DataUri(uri) => parse_data_uri(uri)
                .map(|(_mime, data)| data)
                .ok_or_else(|| CertError::Asset("malformed data URI".to_string())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AssetSource::File(path) => path.display().to_string(),
            AssetSource::Bytes(data) => format!("<{} bytes>", data.len()),
            AssetSource::DataUri(_) => "<data uri>".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Asset {
    pub role: AssetRole,
    pub source: AssetSource,
}

#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub assets: Vec<Asset>,
}

impl AssetBundle {
    /// Later entries for the same role replace earlier ones.
    pub fn set(&mut self, role: AssetRole, source: AssetSource) {
        self.assets.retain(|asset| asset.role != role);
        self.assets.push(Asset { role, source });
    }

    pub fn get(&self, role: AssetRole) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.role == role)
    }

    pub fn missing_roles(&self, include_fonts: bool) -> Vec<AssetRole> {
        AssetRole::ALL
            .iter()
            .copied()
            .filter(|role| include_fonts || !role.is_font())
            .filter(|role| self.get(*role).is_none())
            .collect()
    }

    fn read(&self, role: AssetRole) -> Result<(Vec<u8>, String), CertError> {
        let asset = self
            .get(role)
            .ok_or_else(|| CertError::Asset(format!("missing {}", role.as_str())))?;
        let data = asset.source.read()?;
        Ok((data, asset.source.describe()))
    }
}

/// Read-only resources shared by every row of a batch.
pub struct CertificateAssets {
    participation_template: Arc<Pixmap>,
    excellence_template: Arc<Pixmap>,
    signatures: [Arc<Pixmap>; 2],
    text_renderer: Arc<dyn TextRenderer>,
    text: CertificateText,
}

impl CertificateAssets {
    /// Loads every asset up front. Any missing or undecodable asset fails
    /// the whole load; nothing is loaded lazily per row.
    ///
    /// When `text_renderer` is given, the font roles are not required.
    pub fn load(
        bundle: &AssetBundle,
        text: CertificateText,
        signature_box: Size,
        text_renderer: Option<Arc<dyn TextRenderer>>,
    ) -> Result<Self, CertError> {
        let missing = bundle.missing_roles(text_renderer.is_none());
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(AssetRole::as_str).collect();
            return Err(CertError::Asset(format!("missing {}", names.join(", "))));
        }

        let participation_template = load_template(bundle, AssetRole::ParticipationTemplate)?;
        let excellence_template = load_template(bundle, AssetRole::ExcellenceTemplate)?;
        let signatures = [
            load_signature(bundle, AssetRole::FirstSignature, signature_box)?,
            load_signature(bundle, AssetRole::SecondSignature, signature_box)?,
        ];
        let text_renderer = match text_renderer {
            Some(renderer) => renderer,
            None => {
                let (regular, regular_src) = bundle.read(AssetRole::RegularFont)?;
                let (bold, bold_src) = bundle.read(AssetRole::BoldFont)?;
                Arc::new(FontPair::new(
                    FontFace::from_bytes(regular, &regular_src)?,
                    FontFace::from_bytes(bold, &bold_src)?,
                ))
            }
        };

        Ok(Self {
            participation_template: Arc::new(participation_template),
            excellence_template: Arc::new(excellence_template),
            signatures: signatures.map(Arc::new),
            text_renderer,
            text,
        })
    }

    pub fn template(&self, variant: TemplateVariant) -> &Pixmap {
        match variant {
            TemplateVariant::Participation => self.participation_template.as_ref(),
            TemplateVariant::Excellence => self.excellence_template.as_ref(),
        }
    }

    pub fn signatures(&self) -> [&Pixmap; 2] {
        [self.signatures[0].as_ref(), self.signatures[1].as_ref()]
    }

    pub fn text_renderer(&self) -> &dyn TextRenderer {
        self.text_renderer.as_ref()
    }

    pub fn text(&self) -> &CertificateText {
        &self.text
    }
}

fn load_template(bundle: &AssetBundle, role: AssetRole) -> Result<Pixmap, CertError> {
    let (data, source) = bundle.read(role)?;
    decode_image_to_pixmap(&data).ok_or_else(|| {
        CertError::Asset(format!("cannot decode {} from {}", role.as_str(), source))
    })
}

fn load_signature(
    bundle: &AssetBundle,
    role: AssetRole,
    signature_box: Size,
) -> Result<Pixmap, CertError> {
    let (data, source) = bundle.read(role)?;
    let rgba = decode_rgba(&data).ok_or_else(|| {
        CertError::Asset(format!("cannot decode {} from {}", role.as_str(), source))
    })?;
    let resized = resize_rgba(&rgba, signature_box);
    rgba_to_pixmap(&resized).ok_or_else(|| {
        CertError::Asset(format!(
            "cannot allocate {}x{} {}",
            signature_box.width,
            signature_box.height,
            role.as_str()
        ))
    })
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn text() -> CertificateText {
        CertificateText::new("Hackfest", "Dr. Rao", "Prof. Iyer")
    }

    #[test]
    fn parse_data_uri_base64_decodes_payload() {
        let (mime, data) = parse_data_uri("data:text/plain;base64,SGVsbG8=").unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(data, b"Hello");
        assert!(parse_data_uri("http://example.com/x.png").is_none());
    }

    #[test]
    fn data_uri_source_reads_bytes() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png(2, 2, [1, 2, 3, 255]));
        let source = AssetSource::DataUri(format!("data:image/png;base64,{encoded}"));
        let bytes = source.read().unwrap();
        assert!(decode_image_to_pixmap(&bytes).is_some());
    }

    #[test]
    fn bundle_set_replaces_previous_source() {
        let mut bundle = AssetBundle::default();
        bundle.set(AssetRole::BoldFont, AssetSource::Bytes(vec![1]));
        bundle.set(AssetRole::BoldFont, AssetSource::Bytes(vec![2]));
        assert_eq!(bundle.assets.len(), 1);
        assert_eq!(
            bundle.get(AssetRole::BoldFont).map(|a| &a.source),
            Some(&AssetSource::Bytes(vec![2]))
        );
    }

    #[test]
    fn load_resizes_signatures_and_keeps_templates() {
        let assets = CertificateAssets::load(
            &bundle(Size::new(40, 30)),
            text(),
            Size::new(10, 8),
            Some(block_renderer()),
        )
        .unwrap();
        let [first, second] = assets.signatures();
        assert_eq!((first.width(), first.height()), (10, 8));
        assert_eq!((second.width(), second.height()), (10, 8));
        let tpl = assets.template(TemplateVariant::Excellence);
        assert_eq!((tpl.width(), tpl.height()), (40, 30));
        assert_eq!(tpl.pixel(0, 0).unwrap().blue(), 200);
    }

    #[test]
    fn missing_assets_are_listed() {
        let mut bundle = bundle(Size::new(4, 4));
        bundle.assets.retain(|a| a.role != AssetRole::SecondSignature);
        let err = CertificateAssets::load(&bundle, text(), Size::new(10, 8), None)
            .err()
            .expect("load should fail");
        let message = err.to_string();
        assert!(message.contains("second signature"), "{message}");
        assert!(message.contains("regular font"), "{message}");
    }

    #[test]
    fn undecodable_template_is_an_asset_error() {
        let mut bundle = bundle(Size::new(4, 4));
        bundle.set(
            AssetRole::ParticipationTemplate,
            AssetSource::Bytes(b"garbage".to_vec()),
        );
        let err = CertificateAssets::load(&bundle, text(), Size::new(10, 8), Some(block_renderer()))
            .err()
            .expect("load should fail");
        assert!(matches!(err, CertError::Asset(_)));
        assert!(err.to_string().contains("participation template"));
    }

    #[test]
    fn missing_file_is_an_asset_error() {
        let source = AssetSource::File(PathBuf::from("/nonexistent/certpress/template.png"));
        assert!(matches!(source.read(), Err(CertError::Asset(_))));
    }
}
