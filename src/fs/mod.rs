//! Filesystem access for the monitor: folder scans, arrival checks, and
//! locked report writes.

pub mod locking;
pub mod scan;
pub mod stability;

pub use locking::{can_open_for_shared_read, locked_write};
pub use scan::{list_matching, ScannedFile};
pub use stability::StabilityProber;
