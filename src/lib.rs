mod assets;
mod compose;
mod config;
mod debug;
mod document;
mod error;
mod font;
mod message;
mod metrics;
mod raster;
mod roster;
mod types;
mod wrap;

pub use assets::{Asset, AssetBundle, AssetRole, AssetSource, CertificateAssets};
pub use compose::{
    CertificateImage, OutputNaming, line_run_origins, output_path, render_certificate,
    signature_origins,
};
pub use config::{CertificateText, LayoutConfig};
use debug::DebugLogger;
pub use document::{CompositeDocument, DocumentPage, assemble};
pub use error::{CertError, RosterField, RowError};
use font::check_measurable;
pub use font::{FontFace, FontPair, TextRenderer};
pub use message::{StyledRun, build_runs};
pub use metrics::{BatchMetrics, RowMetrics};
pub use roster::{Roster, RosterRecord, RosterRow, ValidatedRoster, ValidationPolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
pub use types::{Color, Point, Size, TemplateVariant};
pub use wrap::{Line, MeasuredRun, centered_start, wrap};

/// Everything a batch produced. Pages of `document` and entries of `images`
/// share the input order of the rendered rows.
#[derive(Debug)]
pub struct BatchOutput {
    pub document: CompositeDocument,
    pub images: Vec<CertificateImage>,
    pub skipped: Vec<RowError>,
    pub metrics: BatchMetrics,
}

pub struct CertificateEngine {
    layout: LayoutConfig,
    assets: CertificateAssets,
    validation_policy: ValidationPolicy,
    output_dir: Option<PathBuf>,
    output_naming: OutputNaming,
    parallel: bool,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone)]
pub struct CertificateEngineBuilder {
    layout: LayoutConfig,
    asset_bundle: AssetBundle,
    event_name: String,
    signatory_names: [String; 2],
    text_renderer: Option<Arc<dyn TextRenderer>>,
    validation_policy: ValidationPolicy,
    output_dir: Option<PathBuf>,
    output_naming: OutputNaming,
    parallel: bool,
    debug_path: Option<PathBuf>,
}

impl CertificateEngine {
    pub fn builder() -> CertificateEngineBuilder {
        CertificateEngineBuilder::new()
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn assets(&self) -> &CertificateAssets {
        &self.assets
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }

    pub fn build_runs(&self, row: &RosterRow) -> Vec<StyledRun> {
        build_runs(
            row,
            &self.assets.text().event_name,
            &self.layout.participation_sentinel,
        )
    }

    /// Wraps runs with the engine's fonts at the body size.
    pub fn wrap_runs(&self, runs: &[StyledRun]) -> Vec<Line> {
        let renderer = self.assets.text_renderer();
        let size = self.layout.body_font_size;
        wrap(
            runs,
            |text, emphasized| renderer.measure(text, emphasized, size),
            self.layout.max_line_width,
        )
    }

    pub fn render_row(
        &self,
        row_number: usize,
        row: &RosterRow,
    ) -> Result<CertificateImage, CertError> {
        self.render_row_with_metrics(row_number, row)
            .map(|(image, _)| image)
    }

    fn render_row_with_metrics(
        &self,
        row_number: usize,
        row: &RosterRow,
    ) -> Result<(CertificateImage, RowMetrics), CertError> {
        let started = std::time::Instant::now();
        let lines = self.wrap_runs(&self.build_runs(row));
        let image = render_certificate(row_number, row, &lines, &self.assets, &self.layout)?;
        let metrics = RowMetrics {
            row_number,
            render_ms: started.elapsed().as_secs_f64() * 1000.0,
            line_count: lines.len(),
        };
        Ok((image, metrics))
    }

    /// Renders already-validated rows, numbered from 1 in slice order.
    pub fn render_rows(&self, rows: &[RosterRow]) -> Result<BatchOutput, CertError> {
        let numbered: Vec<(usize, RosterRow)> = rows
            .iter()
            .cloned()
            .enumerate()
            .map(|(idx, row)| (idx + 1, row))
            .collect();
        self.render_numbered(&numbered, Vec::new())
    }

    /// Validates the whole roster before any row is rendered.
    pub fn render_roster(&self, roster: &Roster) -> Result<BatchOutput, CertError> {
        let validated = roster.validate(self.validation_policy)?;
        for err in &validated.skipped {
            eprintln!("[certpress][roster] skipping {}", err);
            if let Some(logger) = self.debug.as_deref() {
                logger.row_skipped(err);
            }
        }
        self.render_numbered(&validated.rows, validated.skipped)
    }

    pub fn render_roster_to_file(
        &self,
        roster: &Roster,
        path: impl AsRef<Path>,
    ) -> Result<BatchOutput, CertError> {
        let output = self.render_roster(roster)?;
        output.document.write_to_path(path)?;
        Ok(output)
    }

    fn render_numbered(
        &self,
        rows: &[(usize, RosterRow)],
        skipped: Vec<RowError>,
    ) -> Result<BatchOutput, CertError> {
        let rendered = if self.parallel {
            self.render_parallel(rows)?
        } else {
            rows.iter()
                .map(|(row_number, row)| self.render_row_with_metrics(*row_number, row))
                .collect::<Result<Vec<_>, _>>()?
        };

        if let Some(logger) = self.debug.as_deref() {
            for (image, metrics) in &rendered {
                logger.row_rendered(&image.row_name, image.variant, metrics);
            }
        }

        let (images, row_metrics): (Vec<_>, Vec<_>) = rendered.into_iter().unzip();
        let document = assemble(&images, self.layout.page_size)?;
        let mut metrics = BatchMetrics::from_rows(row_metrics, skipped.len());
        metrics.document_bytes = document.as_bytes().len();

        self.persist_images(&images)?;

        if let Some(logger) = self.debug.as_deref() {
            logger.batch_assembled(document.page_count(), &metrics);
        }
        self.emit_debug_summary("batch");

        Ok(BatchOutput {
            document,
            images,
            skipped,
            metrics,
        })
    }

    // Rows render in parallel, then merge back into input order.
    fn render_parallel(
        &self,
        rows: &[(usize, RosterRow)],
    ) -> Result<Vec<(CertificateImage, RowMetrics)>, CertError> {
        use rayon::prelude::*;

        let mut results: Vec<(usize, Result<(CertificateImage, RowMetrics), CertError>)> = rows
            .par_iter()
            .enumerate()
            .map(|(idx, (row_number, row))| {
                (idx, self.render_row_with_metrics(*row_number, row))
            })
            .collect();
        results.sort_by_key(|(idx, _)| *idx);

        let mut rendered = Vec::with_capacity(results.len());
        for (_, res) in results {
            rendered.push(res?);
        }
        Ok(rendered)
    }

    fn persist_images(&self, images: &[CertificateImage]) -> Result<(), CertError> {
        let Some(dir) = self.output_dir.as_deref() else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        for image in images {
            let path = output_path(dir, image.row_number, &image.row_name, self.output_naming);
            image.save_png(&path)?;
        }
        Ok(())
    }
}

impl CertificateEngineBuilder {
    pub fn new() -> Self {
        Self {
            layout: LayoutConfig::default(),
            asset_bundle: AssetBundle::default(),
            event_name: String::new(),
            signatory_names: [String::new(), String::new()],
            text_renderer: None,
            validation_policy: ValidationPolicy::Abort,
            output_dir: None,
            output_naming: OutputNaming::RowName,
            parallel: false,
            debug_path: None,
        }
    }

    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.layout.page_size = size;
        self
    }

    pub fn asset(mut self, role: AssetRole, source: AssetSource) -> Self {
        self.asset_bundle.set(role, source);
        self
    }

    pub fn asset_file(self, role: AssetRole, path: impl Into<PathBuf>) -> Self {
        self.asset(role, AssetSource::File(path.into()))
    }

    pub fn asset_bytes(self, role: AssetRole, data: Vec<u8>) -> Self {
        self.asset(role, AssetSource::Bytes(data))
    }

    pub fn templates(
        self,
        participation: impl Into<PathBuf>,
        excellence: impl Into<PathBuf>,
    ) -> Self {
        self.asset_file(AssetRole::ParticipationTemplate, participation)
            .asset_file(AssetRole::ExcellenceTemplate, excellence)
    }

    pub fn fonts(self, regular: impl Into<PathBuf>, bold: impl Into<PathBuf>) -> Self {
        self.asset_file(AssetRole::RegularFont, regular)
            .asset_file(AssetRole::BoldFont, bold)
    }

    pub fn signatures(self, first: impl Into<PathBuf>, second: impl Into<PathBuf>) -> Self {
        self.asset_file(AssetRole::FirstSignature, first)
            .asset_file(AssetRole::SecondSignature, second)
    }

    pub fn asset_bundle(mut self, bundle: AssetBundle) -> Self {
        self.asset_bundle = bundle;
        self
    }

    pub fn event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = name.into();
        self
    }

    pub fn signatory_names(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.signatory_names = [first.into(), second.into()];
        self
    }

    pub fn text(mut self, text: CertificateText) -> Self {
        self.event_name = text.event_name;
        self.signatory_names = text.signatory_names;
        self
    }

    // Replaces the font assets; the font roles are then optional.
    pub fn text_renderer(mut self, renderer: Arc<dyn TextRenderer>) -> Self {
        self.text_renderer = Some(renderer);
        self
    }

    pub fn validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = policy;
        self
    }

    /// Also write one PNG per rendered row into `dir`.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn output_naming(mut self, naming: OutputNaming) -> Self {
        self.output_naming = naming;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<CertificateEngine, CertError> {
        self.layout.validate()?;
        let [first, second] = self.signatory_names;
        let text = CertificateText::new(self.event_name, first, second);
        text.validate()?;
        let assets = CertificateAssets::load(
            &self.asset_bundle,
            text,
            self.layout.signature_box,
            self.text_renderer,
        )?;
        check_measurable(assets.text_renderer(), self.layout.body_font_size)?;
        check_measurable(assets.text_renderer(), self.layout.label_font_size)?;
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(CertificateEngine {
            layout: self.layout,
            assets,
            validation_policy: self.validation_policy,
            output_dir: self.output_dir,
            output_naming: self.output_naming,
            parallel: self.parallel,
            debug,
        })
    }
}

impl Default for CertificateEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
