pub mod markers;
pub mod outline;
pub mod scan;

pub use markers::{collect_markers, MarkedText};
pub use outline::{Child, Node, Outline};
pub use scan::{DiscoveredRow, ScanOutcome, ScanSettings, Scanner};
