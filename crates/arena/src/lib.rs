pub mod aggregator;
pub mod app;
pub mod error;
pub mod ingest;
pub mod render;
pub mod session;
pub mod settings;
pub mod telemetry;
pub mod vibe;
pub mod window;

pub use aggregator::{DEFAULT_FEED_CAPACITY, DEFAULT_WINDOW_CAPACITY, RollingAggregator, VibeSnapshot};
pub use app::ArenaApp;
pub use error::{ArenaError, ArenaResult};
pub use ingest::{DEFAULT_MAX_CONTENT_CHARS, IngestionService};
pub use render::render_snapshot;
pub use session::ViewerSession;
pub use settings::{ArenaSettings, ScorerSettings, SettingsError, SettingsStore};
pub use vibe::{VibeLabel, VibeState, classify, display_fraction};
pub use window::{RollingWindow, WindowPush};
