//! Model downloads through the converter's companion tool.

use std::ffi::OsString;
use std::path::Path;

/// Hugging Face repository of the SmolDocling vision-language model.
pub const SMOLDOCLING_REPO: &str = "ds4sd/SmolDocling-256M-preview";

/// Hugging Face repository of the SmolVLM instruct model.
pub const SMOLVLM_REPO: &str = "HuggingFaceTB/SmolVLM-256M-Instruct";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelDownload {
    /// The standard model set (`models download`).
    All,
    /// A single Hugging Face repository (`models download-hf-repo <repo>`).
    HuggingFace(String),
}

impl ModelDownload {
    pub fn smoldocling() -> Self {
        ModelDownload::HuggingFace(SMOLDOCLING_REPO.to_string())
    }

    pub fn smolvlm() -> Self {
        ModelDownload::HuggingFace(SMOLVLM_REPO.to_string())
    }

    /// Console banner shown before the step runs.
    pub fn title(&self) -> String {
        match self {
            ModelDownload::All => "Downloading all required models...".to_string(),
            ModelDownload::HuggingFace(repo) => format!("Downloading {}...", repo),
        }
    }

    pub fn command(&self, tools: &Path) -> Vec<OsString> {
        let mut cmd: Vec<OsString> = vec![tools.into(), "models".into()];
        match self {
            ModelDownload::All => cmd.push("download".into()),
            ModelDownload::HuggingFace(repo) => {
                cmd.push("download-hf-repo".into());
                cmd.push(repo.into());
            }
        }
        cmd
    }
}
