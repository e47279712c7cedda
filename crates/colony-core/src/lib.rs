pub mod config;
pub mod constants;
pub mod events;
pub mod focus;
pub mod models;
pub mod prefs;
pub mod presence;
pub mod runtime;
pub mod stats;
pub mod store;
pub mod streaming;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use events::{CoreEvent, ServerEvent};
pub use runtime::{ClientCommand, CoreHandle, CoreRuntime, OutboundAction};
pub use store::{EntityStore, Reconciler};
