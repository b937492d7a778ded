pub mod state;

pub use state::{ArenaSettings, ScorerSettings, SettingsError, SettingsStore};
