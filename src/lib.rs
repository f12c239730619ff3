pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig, ConsoleConfig};

pub use core::cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use core::console::{ConsoleEngine, ExportPlan, SessionReport};
pub use core::dispatcher::{DispatchOptions, Dispatcher};
pub use domain::model::{Artifact, DispatchRequest, DispatchResult, OutcomeKind, ServiceOutcome};
pub use utils::error::{DispatchError, Result};
