pub mod loader;
pub mod schema;

pub use loader::{
    default_config_path, load_settings, load_settings_from_str, merge_with_defaults,
    save_settings,
};
pub use schema::{
    DefaultSettings, GeneralSettings, InterfaceSettings, LanguageOption, ModeSetting, ModelLists,
    ProcessingSettings, Settings, WindowSettings, AUTO_CONVERTER_PATH, SETTINGS_VERSION,
};
