pub mod executor;
pub mod planner;
pub mod types;

pub use executor::SelfInstallExecutor;
pub use planner::{apply_to_state, reconcile};
pub use types::{Action, InitSystem, Manifest, State, Step};
