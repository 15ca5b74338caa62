//! Subcommand implementations

pub mod completions;
pub mod inspect;
pub mod serve;

pub use completions::{run_completions, CompletionsArgs};
pub use inspect::{run_inspect_sheet, InspectSheetArgs};
pub use serve::{run_serve, ServeArgs};
