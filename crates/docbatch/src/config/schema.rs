use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParamsError;
use crate::logging::LoggingOptions;
use crate::params::{
    parse_languages, ConversionOptions, Enrichment, ImageExportMode, OcrEngine, OcrOptions,
    OutputFormat, PdfBackend, Pipeline, ProcessingMode, TableMode,
};
use crate::runner::ToolLocator;

pub const SETTINGS_VERSION: &str = "1.0";

/// Value of `processing.converterPath` that keeps automatic discovery.
pub const AUTO_CONVERTER_PATH: &str = "auto";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub version: String,
    pub general: GeneralSettings,
    pub processing: ProcessingSettings,
    pub defaults: DefaultSettings,
    pub interface: InterfaceSettings,
    pub window: WindowSettings,
    pub models: ModelLists,
    /// Top-level keys this version does not know about, kept for round trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION.to_string(),
            general: GeneralSettings::default(),
            processing: ProcessingSettings::default(),
            defaults: DefaultSettings::default(),
            interface: InterfaceSettings::default(),
            window: WindowSettings::default(),
            models: ModelLists::default(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    pub default_output_dir: PathBuf,
    pub use_last_output_dir: bool,
    pub default_output_format: OutputFormat,
    pub auto_open_output_folder: bool,
    pub remember_window_geometry: bool,
    pub enable_logging: bool,
    pub log_directory: PathBuf,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            default_output_dir: documents_dir().join("docling_output"),
            use_last_output_dir: true,
            default_output_format: OutputFormat::Markdown,
            auto_open_output_folder: false,
            remember_window_geometry: true,
            enable_logging: false,
            log_directory: documents_dir().join("docling_logs"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    #[default]
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingSettings {
    pub mode: ModeSetting,
    pub artifacts_path: PathBuf,
    /// Explicit converter executable, or `"auto"`.
    pub converter_path: String,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            mode: ModeSetting::Online,
            artifacts_path: default_artifacts_path(),
            converter_path: AUTO_CONVERTER_PATH.to_string(),
        }
    }
}

/// Per-run defaults shown in the options panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultSettings {
    pub pipeline: Pipeline,
    pub vlm_model: String,
    pub asr_model: String,
    pub ocr_enabled: bool,
    pub force_ocr: bool,
    pub ocr_engine: OcrEngine,
    /// Comma separated language codes.
    pub ocr_languages: String,
    pub image_export_mode: ImageExportMode,
    pub table_mode: TableMode,
    pub pdf_backend: PdfBackend,
    pub enrich_code: bool,
    pub enrich_formula: bool,
    pub enrich_picture_classes: bool,
    pub enrich_picture_description: bool,
    pub verbose: u8,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            pipeline: Pipeline::Standard,
            vlm_model: "smoldocling".to_string(),
            asr_model: "whisper_tiny".to_string(),
            ocr_enabled: true,
            force_ocr: false,
            ocr_engine: OcrEngine::EasyOcr,
            ocr_languages: "eng".to_string(),
            image_export_mode: ImageExportMode::Embedded,
            table_mode: TableMode::Accurate,
            pdf_backend: PdfBackend::DlparseV4,
            enrich_code: false,
            enrich_formula: false,
            enrich_picture_classes: false,
            enrich_picture_description: false,
            verbose: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterfaceSettings {
    pub theme: String,
    pub console_font_size: u32,
}

impl Default for InterfaceSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            console_font_size: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 900,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    pub code: String,
    pub name: String,
}

/// Static option lists offered by the UI. Always taken from the running
/// version, never from the saved file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelLists {
    pub pipelines: Vec<String>,
    pub ocr_engines: Vec<String>,
    pub ocr_languages: Vec<LanguageOption>,
    pub vlm_models: Vec<String>,
    pub asr_models: Vec<String>,
}

impl Default for ModelLists {
    fn default() -> Self {
        let languages = [
            ("eng", "English"),
            ("deu", "German"),
            ("fra", "French"),
            ("spa", "Spanish"),
            ("ita", "Italian"),
            ("por", "Portuguese"),
            ("nld", "Dutch"),
            ("pol", "Polish"),
            ("rus", "Russian"),
            ("chi_sim", "Chinese (Simplified)"),
            ("chi_tra", "Chinese (Traditional)"),
            ("jpn", "Japanese"),
            ("kor", "Korean"),
            ("ara", "Arabic"),
            ("hin", "Hindi"),
            ("tur", "Turkish"),
            ("vie", "Vietnamese"),
            ("tha", "Thai"),
        ];

        Self {
            pipelines: tokens(Pipeline::ALL.iter().map(|p| p.as_str())),
            ocr_engines: tokens(OcrEngine::ALL.iter().map(|e| e.as_str())),
            ocr_languages: languages
                .iter()
                .map(|(code, name)| LanguageOption {
                    code: code.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            vlm_models: tokens(["smoldocling", "granite_vision"]),
            asr_models: tokens([
                "whisper_tiny",
                "whisper_small",
                "whisper_medium",
                "whisper_base",
                "whisper_large",
                "whisper_turbo",
            ]),
        }
    }
}

fn tokens<'a, I: IntoIterator<Item = &'a str>>(items: I) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

fn documents_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_artifacts_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".cache").join("docling"))
        .unwrap_or_else(|| std::env::temp_dir().join("docling"))
}

impl Settings {
    pub fn processing_mode(&self) -> ProcessingMode {
        match self.processing.mode {
            ModeSetting::Online => ProcessingMode::Online,
            ModeSetting::Offline => ProcessingMode::Offline {
                artifacts_root: self.processing.artifacts_path.clone(),
            },
        }
    }

    /// Batch options from the saved defaults.
    ///
    /// `output_dir` replaces `general.defaultOutputDir` when given.
    pub fn conversion_options(
        &self,
        output_dir: Option<&Path>,
    ) -> Result<ConversionOptions, ParamsError> {
        let defaults = &self.defaults;
        let output_dir = output_dir.unwrap_or(&self.general.default_output_dir);

        ConversionOptions::builder(output_dir)
            .output_format(self.general.default_output_format)
            .mode(self.processing_mode())
            .pipeline(defaults.pipeline)
            .vlm_model(Some(defaults.vlm_model.as_str()))
            .asr_model(Some(defaults.asr_model.as_str()))
            .ocr(OcrOptions {
                enabled: defaults.ocr_enabled,
                force: defaults.force_ocr,
                engine: defaults.ocr_engine,
                languages: parse_languages(&defaults.ocr_languages),
            })
            .enrichment(Enrichment {
                code: defaults.enrich_code,
                formula: defaults.enrich_formula,
                picture_classes: defaults.enrich_picture_classes,
                picture_description: defaults.enrich_picture_description,
            })
            .pdf_backend(defaults.pdf_backend)
            .table_mode(defaults.table_mode)
            .image_export_mode(defaults.image_export_mode)
            .verbosity(defaults.verbose)
            .build()
    }

    pub fn tool_locator(&self) -> ToolLocator {
        let configured = self.processing.converter_path.trim();
        let override_path = (!configured.is_empty()
            && !configured.eq_ignore_ascii_case(AUTO_CONVERTER_PATH))
        .then(|| PathBuf::from(configured));

        ToolLocator::default().with_override(override_path)
    }

    pub fn logging_options(&self) -> LoggingOptions {
        LoggingOptions {
            log_to_file: self.general.enable_logging,
            log_directory: self.general.log_directory.clone(),
            ..LoggingOptions::default()
        }
    }
}
