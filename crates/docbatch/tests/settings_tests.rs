//! Loading settings files written by older versions.

mod common;

use std::fs;

use common::TestHarness;
use docbatch::config::{ModeSetting, Settings};
use docbatch::params::{OcrEngine, OutputFormat, Pipeline};

const OLD_SETTINGS: &str = r#"{
  "version": "0.9",
  "general": {
    "defaultOutputDir": "/srv/converted",
    "defaultOutputFormat": "json",
    "enableLogging": true
  },
  "processing": {
    "mode": "offline",
    "artifactsPath": "/srv/models"
  },
  "defaults": {
    "pipeline": "vlm",
    "ocrEngine": "tesseract",
    "ocrLanguages": "deu,eng"
  },
  "window": { "width": 1440 },
  "models": {
    "pipelines": ["standard"],
    "ocrEngines": ["easyocr"]
  },
  "recentFiles": ["/tmp/a.pdf"]
}"#;

#[test]
fn test_old_schema_merges_with_new_defaults() {
    let harness = TestHarness::new();
    let path = harness.root().join("config.json");
    fs::write(&path, OLD_SETTINGS).unwrap();

    let settings = Settings::load(&path);
    let defaults = Settings::default();

    // Saved scalars survive.
    assert_eq!(settings.version, "0.9");
    assert_eq!(settings.general.default_output_dir.to_str(), Some("/srv/converted"));
    assert_eq!(settings.general.default_output_format, OutputFormat::Json);
    assert!(settings.general.enable_logging);
    assert_eq!(settings.processing.mode, ModeSetting::Offline);
    assert_eq!(settings.defaults.pipeline, Pipeline::Vlm);
    assert_eq!(settings.defaults.ocr_engine, OcrEngine::Tesseract);
    assert_eq!(settings.defaults.ocr_languages, "deu,eng");
    assert_eq!(settings.window.width, 1440);

    // Keys the old file never had come from the defaults.
    assert_eq!(settings.processing.converter_path, "auto");
    assert_eq!(settings.defaults.asr_model, defaults.defaults.asr_model);
    assert_eq!(settings.window.height, defaults.window.height);
    assert_eq!(settings.interface, defaults.interface);

    // Lists always follow the current defaults.
    assert_eq!(settings.models, defaults.models);
    assert!(settings.models.pipelines.contains(&"asr".to_string()));

    // Unknown keys are carried along.
    assert_eq!(
        settings.extra.get("recentFiles"),
        Some(&serde_json::json!(["/tmp/a.pdf"]))
    );
}

#[test]
fn test_merged_settings_drive_conversion_options() {
    let harness = TestHarness::new();
    let path = harness.root().join("config.json");
    fs::write(&path, OLD_SETTINGS).unwrap();

    let settings = Settings::load(&path);
    let options = settings.conversion_options(Some(&harness.output_dir)).unwrap();

    assert_eq!(options.output_dir(), harness.output_dir.as_path());
    assert_eq!(options.output_format(), OutputFormat::Json);
    assert_eq!(options.vlm_model(), Some("smoldocling"));
    assert_eq!(options.ocr().languages, vec!["deu", "eng"]);
    assert_eq!(
        options.mode().artifacts_root().and_then(|p| p.to_str()),
        Some("/srv/models")
    );
}

#[test]
fn test_resave_keeps_unknown_keys() {
    let harness = TestHarness::new();
    let path = harness.root().join("config.json");
    fs::write(&path, OLD_SETTINGS).unwrap();

    let mut settings = Settings::load(&path);
    settings.interface.console_font_size = 14;
    settings.save(&path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["recentFiles"][0], "/tmp/a.pdf");
    assert_eq!(raw["interface"]["consoleFontSize"], 14);
    assert_eq!(raw["general"]["defaultOutputFormat"], "json");

    assert_eq!(Settings::load(&path), settings);
}

#[test]
fn test_unreadable_settings_fall_back() {
    let harness = TestHarness::new();
    let path = harness.root().join("config.json");
    fs::write(&path, "[1, 2,").unwrap();

    assert_eq!(Settings::load(&path), Settings::default());
}
