//! Command dispatch: bridges CLI args -> core entities -> output formatting.

pub mod cameras;
pub mod home_mode;
pub mod serve;
pub mod snapshot;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a host-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Serve(args) => serve::handle(args, global).await,
        Command::Cameras => cameras::handle(global).await,
        Command::Snapshot(args) => snapshot::handle(args, global).await,
        Command::HomeMode(args) => home_mode::handle(args, global).await,
        // Completions never reach dispatch
        Command::Completions(_) => Ok(()),
    }
}
