//! Terminal session backend.
//!
//! Orchestration code talks to tmux only through [`SessionBackend`].
//! [`TmuxClient`] is the production implementation; [`command`] builds the
//! command lines it runs and [`layout`] decides which ones.

mod client;
pub mod command;
pub mod layout;

pub use client::{TMUX_ENV, TmuxClient};
pub use layout::{SessionKind, SessionSpec};

use crate::Result;

/// Session operations.
///
/// Names are normalized the way tmux stores them before use, so callers
/// may pass names containing `.`.
pub trait SessionBackend {
    fn exists(&self, name: &str) -> bool;

    /// Names of all live sessions; empty when no server is running.
    fn list(&self) -> Vec<String>;

    /// Create a detached session with the standard layout.
    fn create(&self, spec: &SessionSpec) -> Result<()>;

    fn kill(&self, name: &str) -> Result<()>;

    /// Attach to (or switch the current client to) a session. Blocks until
    /// the user detaches when attaching from outside tmux.
    fn attach(&self, name: &str) -> Result<()>;

    /// Attach to the most recent session. Fails inside tmux.
    fn attach_default(&self) -> Result<()>;

    /// The session rig is running in, if any.
    fn current_session_name(&self) -> Option<String>;

    /// Inject keystrokes. Fire-and-forget: failures are logged, not returned.
    fn send_keys(&self, target: &str, keys: &str);

    /// Where keystrokes for a session's agent go.
    fn agent_target(&self, session: &str) -> String;
}
