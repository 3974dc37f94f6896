//! Operation history, config, and app directory layout (spec §4.8, C9).

mod atomic;
mod config;
mod history;
mod paths;

pub use config::{EcosystemKeywordsConfig, SyncConfig, SyncInterval, UiConfig, WindowState, WinpacmanConfig};
pub use history::HistoryStore;
pub use paths::AppPaths;
