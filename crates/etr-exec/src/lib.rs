//! Local collaborators for the ETR lifecycle.
//!
//! Everything here runs on the local machine: recipes as `sh -c` processes,
//! workspaces and the log area as directories, events as JSON lines.

pub mod error;
pub mod events;
pub mod executor;
pub mod log_area;
pub mod monitoring;
pub mod plugin;
pub mod workspace;

pub use error::{ExecError, ExecResult};
pub use events::{EventEnvelope, JsonlEventBus};
pub use executor::ProcessExecutor;
pub use log_area::LocalLogArea;
pub use monitoring::CommandIutMonitoring;
pub use plugin::TracingPlugin;
pub use workspace::{FsWorkspace, FsWorkspaceProvider, ARTIFACT_DIR};
