pub mod request_guard;
pub mod scan_flow;

pub use request_guard::{RequestGuard, RequestTicket};
pub use scan_flow::{Extraction, ExtractionOutcome, ScanFlow};
