// Application settings
// Loaded from ~/.config/weekboard/settings.json

pub mod settings;

pub use settings::{BusSettings, GridSettings, RetrySettings, Settings};
