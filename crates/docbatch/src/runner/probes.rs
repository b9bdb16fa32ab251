//! Read-only environment checks consulted before a batch starts.

use std::path::{Path, PathBuf};

use crate::params::OcrEngine;
use crate::runner::command::MODELS_SUBDIR;

/// Outcome of a probe with a human readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub ok: bool,
    pub diagnostic: String,
}

impl ProbeResult {
    pub fn ok<S: Into<String>>(diagnostic: S) -> Self {
        Self {
            ok: true,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn failed<S: Into<String>>(diagnostic: S) -> Self {
        Self {
            ok: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Decides whether offline conversion has the models it needs.
///
/// Which files are required depends on the converter version, so callers
/// supply the check rather than the runner.
pub trait ModelValidator: Send + Sync {
    fn check(&self, artifacts_root: &Path) -> ProbeResult;
}

/// Requires the given paths under `<artifacts_root>/models`.
///
/// With no paths listed it only requires the models directory to exist and
/// contain something.
#[derive(Debug, Clone, Default)]
pub struct RequiredArtifacts {
    files: Vec<PathBuf>,
}

impl RequiredArtifacts {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

impl ModelValidator for RequiredArtifacts {
    fn check(&self, artifacts_root: &Path) -> ProbeResult {
        let models_dir = artifacts_root.join(MODELS_SUBDIR);

        if !models_dir.is_dir() {
            return ProbeResult::failed(format!(
                "Models directory not found: {}",
                models_dir.display()
            ));
        }

        if self.files.is_empty() {
            let has_entries = std::fs::read_dir(&models_dir)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
            return if has_entries {
                ProbeResult::ok(format!("Models found in {}", models_dir.display()))
            } else {
                ProbeResult::failed(format!("Models directory is empty: {}", models_dir.display()))
            };
        }

        let missing: Vec<String> = self
            .files
            .iter()
            .filter(|f| !models_dir.join(f).exists())
            .map(|f| f.display().to_string())
            .collect();

        if missing.is_empty() {
            ProbeResult::ok(format!("All required models found in {}", models_dir.display()))
        } else {
            ProbeResult::failed(format!("Missing files: {}", missing.join(", ")))
        }
    }
}

impl<F> ModelValidator for F
where
    F: Fn(&Path) -> ProbeResult + Send + Sync,
{
    fn check(&self, artifacts_root: &Path) -> ProbeResult {
        self(artifacts_root)
    }
}

/// Best-effort availability check for an OCR engine.
///
/// Only engines backed by a native binary or a platform API can be checked
/// from here; the Python-only engines are reported as the converter's concern.
pub fn check_ocr_engine(engine: OcrEngine) -> ProbeResult {
    match engine {
        OcrEngine::Tesseract | OcrEngine::TesserOcr => match which::which("tesseract") {
            Ok(path) => ProbeResult::ok(format!("tesseract found at {}", path.display())),
            Err(_) => ProbeResult::failed(
                "tesseract not found on PATH. Install Tesseract OCR to use this engine.",
            ),
        },
        OcrEngine::OcrMac => {
            if cfg!(target_os = "macos") {
                ProbeResult::ok("ocrmac uses the macOS Vision framework")
            } else {
                ProbeResult::failed("ocrmac is only available on macOS")
            }
        }
        OcrEngine::Auto | OcrEngine::EasyOcr | OcrEngine::RapidOcr => ProbeResult::ok(format!(
            "{} is provided by the converter's Python environment",
            engine
        )),
    }
}
