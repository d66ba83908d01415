pub mod arrival;
pub mod constants;
pub mod rule;

pub use arrival::{is_interchange_file, FileArrival};
pub use rule::{RuleError, WatchRule};
