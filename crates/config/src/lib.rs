// Configuration loading

pub mod settings;

pub use settings::{Settings, SettingsError, API_URL_ENV};
