//! Translation of [`ConversionParams`] into converter arguments.

use std::ffi::OsString;
use std::path::Path;

use crate::params::{ConversionParams, OcrEngine, PdfBackend, Pipeline, TableMode};

/// Subdirectory of the artifacts root that holds downloaded models.
pub const MODELS_SUBDIR: &str = "models";

const PASSWORD_FLAG: &str = "--pdf-password";
const REDACTED: &str = "********";

/// Builds the full argument vector, executable first.
///
/// Pure and deterministic: flags that are off or left at the converter's
/// own default are omitted rather than spelled out.
pub fn build_command(tool: &Path, params: &ConversionParams) -> Vec<OsString> {
    let options = params.options();
    let mut cmd: Vec<OsString> = vec![tool.into(), params.input().into()];

    cmd.push("--to".into());
    cmd.push(options.output_format().as_str().into());
    cmd.push("--output".into());
    cmd.push(options.output_dir().into());

    if options.pipeline() != Pipeline::Standard {
        cmd.push("--pipeline".into());
        cmd.push(options.pipeline().as_str().into());
    }
    if let Some(model) = options.vlm_model() {
        cmd.push("--vlm-model".into());
        cmd.push(model.into());
    }
    if let Some(model) = options.asr_model() {
        cmd.push("--asr-model".into());
        cmd.push(model.into());
    }

    let ocr = options.ocr();
    if ocr.enabled {
        cmd.push("--ocr".into());
        if ocr.force {
            cmd.push("--force-ocr".into());
        }
    } else {
        cmd.push("--no-ocr".into());
    }
    if ocr.engine != OcrEngine::Auto {
        cmd.push("--ocr-engine".into());
        cmd.push(ocr.engine.as_str().into());
    }
    if !ocr.languages.is_empty() {
        cmd.push("--ocr-lang".into());
        cmd.push(ocr.languages.join(",").into());
    }

    if options.pdf_backend() != PdfBackend::DlparseV4 {
        cmd.push("--pdf-backend".into());
        cmd.push(options.pdf_backend().as_str().into());
    }
    if let Some(password) = options.pdf_password() {
        cmd.push(PASSWORD_FLAG.into());
        cmd.push(password.into());
    }

    if options.table_mode() != TableMode::Accurate {
        cmd.push("--table-mode".into());
        cmd.push(options.table_mode().as_str().into());
    }
    cmd.push("--image-export-mode".into());
    cmd.push(options.image_export_mode().as_str().into());

    let enrichment = options.enrichment();
    push_flag(&mut cmd, enrichment.code, "--enrich-code");
    push_flag(&mut cmd, enrichment.formula, "--enrich-formula");
    push_flag(&mut cmd, enrichment.picture_classes, "--enrich-picture-classes");
    push_flag(
        &mut cmd,
        enrichment.picture_description,
        "--enrich-picture-description",
    );

    let debug = options.debug();
    push_flag(&mut cmd, debug.show_layout, "--show-layout");
    push_flag(&mut cmd, debug.layout, "--debug-visualize-layout");
    push_flag(&mut cmd, debug.cells, "--debug-visualize-cells");
    push_flag(&mut cmd, debug.ocr, "--debug-visualize-ocr");
    push_flag(&mut cmd, debug.tables, "--debug-visualize-tables");

    match options.verbosity() {
        0 => {}
        1 => cmd.push("-v".into()),
        _ => cmd.push("-vv".into()),
    }

    if let Some(root) = options.mode().artifacts_root() {
        cmd.push("--artifacts-path".into());
        cmd.push(root.join(MODELS_SUBDIR).into());
    }

    cmd
}

fn push_flag(cmd: &mut Vec<OsString>, enabled: bool, flag: &str) {
    if enabled {
        cmd.push(flag.into());
    }
}

/// Renders tokens as one console line, hiding the PDF password.
pub fn display_command(tokens: &[OsString]) -> String {
    let mut parts = Vec::with_capacity(tokens.len());
    let mut hide_next = false;

    for token in tokens {
        let text = token.to_string_lossy();
        if hide_next {
            parts.push(REDACTED.to_string());
            hide_next = false;
            continue;
        }
        hide_next = text == PASSWORD_FLAG;
        if text.is_empty() || text.contains(char::is_whitespace) {
            parts.push(format!("\"{}\"", text));
        } else {
            parts.push(text.into_owned());
        }
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{
        ConversionOptions, ConversionOptionsBuilder, DebugVisualization, Enrichment,
        ImageExportMode, OcrOptions, OutputFormat, ProcessingMode,
    };
    use std::path::PathBuf;
    use std::sync::Arc;

    fn tokens(builder: ConversionOptionsBuilder) -> Vec<String> {
        let params = ConversionParams::new("/in/doc.pdf", Arc::new(builder.build().unwrap()));
        build_command(Path::new("/bin/docling"), &params)
            .into_iter()
            .map(|t| t.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_minimal_command() {
        let cmd = tokens(ConversionOptions::builder("/out"));
        assert_eq!(
            cmd,
            vec![
                "/bin/docling",
                "/in/doc.pdf",
                "--to",
                "md",
                "--output",
                "/out",
                "--ocr",
                "--image-export-mode",
                "embedded",
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let make = || {
            ConversionOptions::builder("/out")
                .pipeline(Pipeline::Vlm)
                .vlm_model(Some("smoldocling"))
                .verbosity(1)
        };
        assert_eq!(tokens(make()), tokens(make()));
    }

    #[test]
    fn test_ocr_toggle_only_changes_ocr_block() {
        let ocr = |enabled: bool| OcrOptions {
            enabled,
            force: true,
            engine: OcrEngine::Tesseract,
            languages: vec!["eng".into(), "deu".into()],
        };
        let make = |enabled: bool| {
            ConversionOptions::builder("/out")
                .ocr(ocr(enabled))
                .table_mode(TableMode::Fast)
        };

        let on = tokens(make(true));
        let off = tokens(make(false));

        let without_ocr_block = |cmd: &[String]| -> Vec<String> {
            cmd.iter()
                .filter(|t| !matches!(t.as_str(), "--ocr" | "--force-ocr" | "--no-ocr"))
                .cloned()
                .collect()
        };

        assert!(on.contains(&"--ocr".to_string()));
        assert!(on.contains(&"--force-ocr".to_string()));
        assert!(!on.contains(&"--no-ocr".to_string()));
        assert!(off.contains(&"--no-ocr".to_string()));
        assert!(!off.contains(&"--ocr".to_string()));
        assert!(!off.contains(&"--force-ocr".to_string()));

        assert_eq!(without_ocr_block(&on), without_ocr_block(&off));
        let on_pos = on.iter().position(|t| t == "--ocr").unwrap();
        let off_pos = off.iter().position(|t| t == "--no-ocr").unwrap();
        assert_eq!(on_pos, off_pos);
    }

    #[test]
    fn test_defaults_are_omitted() {
        let cmd = tokens(ConversionOptions::builder("/out"));
        for flag in [
            "--pipeline",
            "--ocr-engine",
            "--ocr-lang",
            "--pdf-backend",
            "--table-mode",
            "--artifacts-path",
            "-v",
            "-vv",
            "--enrich-formula",
            "--show-layout",
        ] {
            assert!(!cmd.contains(&flag.to_string()), "unexpected {}", flag);
        }
    }

    #[test]
    fn test_full_command() {
        let cmd = tokens(
            ConversionOptions::builder("/out")
                .output_format(OutputFormat::Json)
                .pipeline(Pipeline::Asr)
                .asr_model(Some("whisper_turbo"))
                .ocr(OcrOptions {
                    enabled: true,
                    force: false,
                    engine: OcrEngine::RapidOcr,
                    languages: vec!["eng".into(), "fra".into()],
                })
                .pdf_backend(PdfBackend::PyPdfium2)
                .pdf_password(Some("secret"))
                .table_mode(TableMode::Fast)
                .image_export_mode(ImageExportMode::Referenced)
                .enrichment(Enrichment {
                    code: true,
                    formula: true,
                    picture_classes: false,
                    picture_description: true,
                })
                .debug(DebugVisualization {
                    show_layout: true,
                    tables: true,
                    ..DebugVisualization::default()
                })
                .verbosity(2)
                .mode(ProcessingMode::Offline {
                    artifacts_root: PathBuf::from("/cache/docling"),
                }),
        );

        let expected_models = PathBuf::from("/cache/docling")
            .join(MODELS_SUBDIR)
            .to_string_lossy()
            .into_owned();

        assert_eq!(
            cmd,
            vec![
                "/bin/docling",
                "/in/doc.pdf",
                "--to",
                "json",
                "--output",
                "/out",
                "--pipeline",
                "asr",
                "--asr-model",
                "whisper_turbo",
                "--ocr",
                "--ocr-engine",
                "rapidocr",
                "--ocr-lang",
                "eng,fra",
                "--pdf-backend",
                "pypdfium2",
                "--pdf-password",
                "secret",
                "--table-mode",
                "fast",
                "--image-export-mode",
                "referenced",
                "--enrich-code",
                "--enrich-formula",
                "--enrich-picture-description",
                "--show-layout",
                "--debug-visualize-tables",
                "-vv",
                "--artifacts-path",
                expected_models.as_str(),
            ]
        );
    }

    #[test]
    fn test_verbosity_one() {
        let cmd = tokens(ConversionOptions::builder("/out").verbosity(1));
        assert_eq!(cmd.last().map(String::as_str), Some("-v"));
    }

    #[test]
    fn test_artifacts_only_offline() {
        let online = tokens(ConversionOptions::builder("/out"));
        assert!(!online.iter().any(|t| t == "--artifacts-path"));
    }

    #[test]
    fn test_display_command_redacts_password() {
        let tokens: Vec<OsString> = ["/bin/docling", "/in/my doc.pdf", "--pdf-password", "hunter2"]
            .iter()
            .map(OsString::from)
            .collect();
        let line = display_command(&tokens);
        assert_eq!(
            line,
            "/bin/docling \"/in/my doc.pdf\" --pdf-password ********"
        );
        assert!(!line.contains("hunter2"));
    }
}
