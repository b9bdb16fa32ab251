//! Resolution of the converter executable.

use std::path::{Path, PathBuf};

use log::debug;

/// Name of the converter command.
pub const CONVERTER_TOOL: &str = "docling";

/// Appended to "<tool> not found." when a launch fails.
pub const INSTALL_HINT: &str = "Please install it: pip install docling";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocator {
    name: String,
    override_path: Option<PathBuf>,
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self::new(CONVERTER_TOOL)
    }
}

impl ToolLocator {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            override_path: None,
        }
    }

    /// Prefers `path` when it exists. `None` keeps automatic discovery.
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_path = path;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Locator for the companion `<tool>-tools` command.
    ///
    /// An overridden converter path carries over as a sibling file.
    pub fn companion(&self) -> ToolLocator {
        let name = format!("{}-tools", self.name);
        let override_path = self
            .override_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(|dir| dir.join(executable_name(&name)));

        ToolLocator {
            name,
            override_path,
        }
    }

    /// Resolves the executable path.
    ///
    /// Search order: explicit override, active virtual environment, the
    /// directory of the host executable, `PATH`, then the bare name.
    pub fn resolve(&self) -> PathBuf {
        let virtual_env = std::env::var_os("VIRTUAL_ENV").map(PathBuf::from);
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        self.resolve_with(virtual_env.as_deref(), exe_dir.as_deref())
    }

    fn resolve_with(&self, virtual_env: Option<&Path>, exe_dir: Option<&Path>) -> PathBuf {
        if let Some(path) = self.override_path.as_ref().filter(|p| p.exists()) {
            debug!("Using configured {}: {}", self.name, path.display());
            return path.clone();
        }

        let file_name = executable_name(&self.name);

        if let Some(venv) = virtual_env {
            let candidate = venv.join(venv_bin_dir()).join(&file_name);
            if candidate.exists() {
                return candidate;
            }
        }

        if let Some(dir) = exe_dir {
            let candidate = dir.join(&file_name);
            if candidate.exists() {
                return candidate;
            }
        }

        if let Ok(found) = which::which(&self.name) {
            return found;
        }

        PathBuf::from(&self.name)
    }

    /// Advisory check; a missing tool never blocks a conversion attempt.
    pub fn is_available(&self) -> bool {
        let resolved = self.resolve();
        resolved.is_file() || which::which(&resolved).is_ok()
    }
}

fn executable_name(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

fn venv_bin_dir() -> &'static str {
    if cfg!(windows) {
        "Scripts"
    } else {
        "bin"
    }
}
