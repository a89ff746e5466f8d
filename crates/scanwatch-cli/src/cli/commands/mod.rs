//! CLI command handlers, one file per command.

mod cancel;
mod completions;
mod man;
mod scan;
mod status;

pub use cancel::run_cancel;
pub use completions::run_completions;
pub use man::run_man;
pub use scan::run_scan;
pub use status::run_status;
