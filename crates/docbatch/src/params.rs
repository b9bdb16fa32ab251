//! Validated conversion settings shared by every item of a batch.
//!
//! [`ConversionOptions`] is built once per batch through its builder and is
//! immutable afterwards. [`ConversionParams`] pairs it with one input file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

/// Defines a fieldless option enum with its CLI token and parser.
macro_rules! cli_option {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, default = $default:ident {
            $($variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Token passed to the converter.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl FromStr for $name {
            type Err = ParamsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| ParamsError::UnknownOption {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

cli_option! {
    OutputFormat, "output format", default = Markdown {
        Markdown => "md",
        Json => "json",
        Html => "html",
        HtmlSplitPage => "html_split_page",
        Text => "text",
        DocTags => "doctags",
    }
}

cli_option! {
    /// Processing strategy of the converter.
    Pipeline, "pipeline", default = Standard {
        Standard => "standard",
        Vlm => "vlm",
        Asr => "asr",
    }
}

cli_option! {
    /// `Auto` leaves the choice to the converter.
    OcrEngine, "OCR engine", default = Auto {
        Auto => "auto",
        EasyOcr => "easyocr",
        Tesseract => "tesseract",
        TesserOcr => "tesserocr",
        RapidOcr => "rapidocr",
        OcrMac => "ocrmac",
    }
}

cli_option! {
    PdfBackend, "PDF backend", default = DlparseV4 {
        DlparseV4 => "dlparse_v4",
        DlparseV2 => "dlparse_v2",
        DlparseV1 => "dlparse_v1",
        PyPdfium2 => "pypdfium2",
    }
}

cli_option! {
    TableMode, "table mode", default = Accurate {
        Accurate => "accurate",
        Fast => "fast",
    }
}

cli_option! {
    ImageExportMode, "image export mode", default = Embedded {
        Embedded => "embedded",
        Placeholder => "placeholder",
        Referenced => "referenced",
    }
}

/// Where the converter gets its models from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Models are fetched on demand.
    #[default]
    Online,
    /// Models are read from a local artifacts directory.
    Offline { artifacts_root: PathBuf },
}

impl ProcessingMode {
    pub fn is_offline(&self) -> bool {
        matches!(self, ProcessingMode::Offline { .. })
    }

    pub fn artifacts_root(&self) -> Option<&Path> {
        match self {
            ProcessingMode::Online => None,
            ProcessingMode::Offline { artifacts_root } => Some(artifacts_root),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOptions {
    pub enabled: bool,
    /// Replace existing text layers. Only meaningful while OCR is enabled.
    pub force: bool,
    pub engine: OcrEngine,
    /// Language codes, e.g. `["eng", "deu"]`. Empty means the engine default.
    pub languages: Vec<String>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            force: false,
            engine: OcrEngine::Auto,
            languages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub code: bool,
    pub formula: bool,
    pub picture_classes: bool,
    pub picture_description: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugVisualization {
    pub show_layout: bool,
    pub layout: bool,
    pub cells: bool,
    pub ocr: bool,
    pub tables: bool,
}

/// Settings for every conversion in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    output_format: OutputFormat,
    output_dir: PathBuf,
    mode: ProcessingMode,
    pipeline: Pipeline,
    vlm_model: Option<String>,
    asr_model: Option<String>,
    ocr: OcrOptions,
    enrichment: Enrichment,
    pdf_backend: PdfBackend,
    pdf_password: Option<String>,
    table_mode: TableMode,
    image_export_mode: ImageExportMode,
    debug: DebugVisualization,
    verbosity: u8,
}

impl ConversionOptions {
    pub fn builder<P: Into<PathBuf>>(output_dir: P) -> ConversionOptionsBuilder {
        ConversionOptionsBuilder::new(output_dir)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn mode(&self) -> &ProcessingMode {
        &self.mode
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// Set only when the pipeline is [`Pipeline::Vlm`].
    pub fn vlm_model(&self) -> Option<&str> {
        self.vlm_model.as_deref()
    }

    /// Set only when the pipeline is [`Pipeline::Asr`].
    pub fn asr_model(&self) -> Option<&str> {
        self.asr_model.as_deref()
    }

    pub fn ocr(&self) -> &OcrOptions {
        &self.ocr
    }

    pub fn enrichment(&self) -> Enrichment {
        self.enrichment
    }

    pub fn pdf_backend(&self) -> PdfBackend {
        self.pdf_backend
    }

    pub fn pdf_password(&self) -> Option<&str> {
        self.pdf_password.as_deref()
    }

    pub fn table_mode(&self) -> TableMode {
        self.table_mode
    }

    pub fn image_export_mode(&self) -> ImageExportMode {
        self.image_export_mode
    }

    pub fn debug(&self) -> DebugVisualization {
        self.debug
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }
}

#[derive(Debug, Clone)]
pub struct ConversionOptionsBuilder {
    inner: ConversionOptions,
}

impl ConversionOptionsBuilder {
    fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            inner: ConversionOptions {
                output_format: OutputFormat::default(),
                output_dir: output_dir.into(),
                mode: ProcessingMode::Online,
                pipeline: Pipeline::default(),
                vlm_model: None,
                asr_model: None,
                ocr: OcrOptions::default(),
                enrichment: Enrichment::default(),
                pdf_backend: PdfBackend::default(),
                pdf_password: None,
                table_mode: TableMode::default(),
                image_export_mode: ImageExportMode::default(),
                debug: DebugVisualization::default(),
                verbosity: 0,
            },
        }
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.inner.output_format = format;
        self
    }

    pub fn mode(mut self, mode: ProcessingMode) -> Self {
        self.inner.mode = mode;
        self
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.inner.pipeline = pipeline;
        self
    }

    pub fn vlm_model<S: Into<String>>(mut self, model: Option<S>) -> Self {
        self.inner.vlm_model = model.map(Into::into);
        self
    }

    pub fn asr_model<S: Into<String>>(mut self, model: Option<S>) -> Self {
        self.inner.asr_model = model.map(Into::into);
        self
    }

    pub fn ocr(mut self, ocr: OcrOptions) -> Self {
        self.inner.ocr = ocr;
        self
    }

    pub fn ocr_enabled(mut self, enabled: bool) -> Self {
        self.inner.ocr.enabled = enabled;
        self
    }

    pub fn enrichment(mut self, enrichment: Enrichment) -> Self {
        self.inner.enrichment = enrichment;
        self
    }

    pub fn pdf_backend(mut self, backend: PdfBackend) -> Self {
        self.inner.pdf_backend = backend;
        self
    }

    pub fn pdf_password<S: Into<String>>(mut self, password: Option<S>) -> Self {
        self.inner.pdf_password = password.map(Into::into);
        self
    }

    pub fn table_mode(mut self, mode: TableMode) -> Self {
        self.inner.table_mode = mode;
        self
    }

    pub fn image_export_mode(mut self, mode: ImageExportMode) -> Self {
        self.inner.image_export_mode = mode;
        self
    }

    pub fn debug(mut self, debug: DebugVisualization) -> Self {
        self.inner.debug = debug;
        self
    }

    pub fn verbosity(mut self, level: u8) -> Self {
        self.inner.verbosity = level;
        self
    }

    /// Validates and normalises the collected options.
    pub fn build(self) -> Result<ConversionOptions, ParamsError> {
        let mut options = self.inner;

        if options.output_dir.as_os_str().is_empty() {
            return Err(ParamsError::MissingOutputDirectory);
        }

        if let ProcessingMode::Offline { artifacts_root } = &options.mode {
            if artifacts_root.as_os_str().is_empty() {
                return Err(ParamsError::MissingArtifactsPath);
            }
        }

        if options.verbosity > 2 {
            return Err(ParamsError::InvalidVerbosity(options.verbosity));
        }

        options.vlm_model = non_blank(options.vlm_model.take())
            .filter(|_| options.pipeline == Pipeline::Vlm);
        options.asr_model = non_blank(options.asr_model.take())
            .filter(|_| options.pipeline == Pipeline::Asr);
        options.pdf_password = options.pdf_password.take().filter(|p| !p.trim().is_empty());
        options.ocr.languages = options
            .ocr
            .languages
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Ok(options)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Splits a comma separated language list such as `"eng, deu"`.
pub fn parse_languages(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// One conversion: an input file plus the batch's options.
#[derive(Debug, Clone)]
pub struct ConversionParams {
    input: PathBuf,
    options: Arc<ConversionOptions>,
}

impl ConversionParams {
    pub fn new<P: Into<PathBuf>>(input: P, options: Arc<ConversionOptions>) -> Self {
        Self {
            input: input.into(),
            options,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }
}
