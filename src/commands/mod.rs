/// Result structs for command output. Commands return these instead of printing
/// directly; main.rs renders them as human-readable text or JSON (--json).
/// Console echo of child processes is the runner's job, not theirs.
mod bootstrap;
mod clone;
mod config;
mod env;
mod pip;
mod run;
mod ssh_key;
mod style;

pub use bootstrap::*;
pub use clone::*;
pub use config::*;
pub use env::*;
pub use pip::*;
pub use run::*;
pub use ssh_key::*;
pub use style::*;
