pub mod adapters;
pub mod bootstrap;
pub mod document;
pub mod sdk;

pub use bootstrap::{BootstrapOutcome, TaskKey, ViewerBootstrap};
pub use document::{DocumentNode, find_first_geometry};
pub use sdk::{TokenSource, ViewerError, ViewerHandle, ViewerSdk};
