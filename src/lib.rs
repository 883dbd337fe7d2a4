// lib.rs - GameTracker client core.
//
// This crate holds the client-side state of a video game collection whose
// source of truth is a REST backend:
//   1. a cache of games (and of the reviews of the game being viewed)
//   2. pure derivations over it: filtered list, dropdown options, statistics
//   3. the modal overlays, their forms, and the page-wide resources they hold
// A UI shell drives it through the functions in `commands`.
//
// RUST NOTE: `mod` declares a module. Rust looks for either
//   src/<name>.rs  or  src/<name>/mod.rs

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod forms;
pub mod models;
pub mod overlay;
pub mod reviews;
pub mod session;
pub mod stats;
pub mod store;

pub use api::{CollectionApi, HttpApi};
pub use commands::{AppState, CmdResult, CommandError, ViewSnapshot};
pub use config::Config;
pub use error::{ApiError, ConfigError, FormError, OverlayError, StoreError, ValidationError};
pub use filter::{CompletionFilter, FilterCriteria, Selector};
pub use models::{
    Difficulty, GameDraft, GameId, GameRecord, ReleaseYear, ReviewDraft, ReviewId, ReviewRecord,
};
pub use overlay::{ClickRegion, OverlayKind};
pub use session::Session;
pub use stats::{DashboardView, StatisticsSummary};

/// Set up `env_logger` once for the embedding shell. `RUST_LOG` controls the
/// level; the default is `info`. Calling it again is harmless.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}
