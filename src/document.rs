use crate::compose::CertificateImage;
use crate::error::CertError;
use crate::raster::pixmap_to_rgb;
use crate::types::{Size, TemplateVariant};
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPage {
    pub row_number: usize,
    pub row_name: String,
    pub variant: TemplateVariant,
}

/// The assembled multi-page PDF. Built once, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CompositeDocument {
    pages: Vec<DocumentPage>,
    page_size: Size,
    bytes: Vec<u8>,
}

impl CompositeDocument {
    pub fn pages(&self) -> &[DocumentPage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Writes through a sibling temp file and renames it into place, so a
    /// reader never sees a half-written document at `path`.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), CertError> {
        let path = path.as_ref();
        let tmp = temp_sibling(path);
        if let Err(err) = std::fs::write(&tmp, &self.bytes) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        if let Err(err) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("certificates.pdf");
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}

fn lopdf_err(err: impl std::fmt::Display) -> CertError {
    CertError::Document(format!("pdf write error: {err}"))
}

/// One page per image, in input order. Each image is stretched to fill the
/// page exactly; its aspect ratio is not preserved.
pub fn assemble(
    images: &[CertificateImage],
    page_size: Size,
) -> Result<CompositeDocument, CertError> {
    if images.is_empty() {
        return Err(CertError::EmptyBatch);
    }
    if page_size.is_empty() {
        return Err(CertError::InvalidConfiguration(format!(
            "page size must be non-empty (got {}x{})",
            page_size.width, page_size.height
        )));
    }

    let page_w = page_size.width as i64;
    let page_h = page_size.height as i64;
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<LoObject> = Vec::with_capacity(images.len());
    let mut pages = Vec::with_capacity(images.len());

    for (idx, image) in images.iter().enumerate() {
        let image_id = doc.add_object(LoStream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            pixmap_to_rgb(image.pixmap()),
        ));
        let image_name = format!("Im{}", idx + 1);
        let content = format!("q {page_w} 0 0 {page_h} 0 0 cm /{image_name} Do Q\n").into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    image_name => image_id,
                },
            },
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
        });
        kids.push(LoObject::Reference(page_id));
        pages.push(DocumentPage {
            row_number: image.row_number,
            row_name: image.row_name.clone(),
            variant: image.variant,
        });
    }

    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => images.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(lopdf_err)?;

    Ok(CompositeDocument {
        pages,
        page_size,
        bytes,
    })
}
