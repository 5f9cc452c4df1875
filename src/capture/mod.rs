//! Distributed packet capture: jumpbox node resolution and the fan-out
//! FIFO session.

pub mod error;
pub mod resolve;
pub mod session;

pub use error::CaptureError;
pub use resolve::{NodeResolution, resolve_nodes};
pub use session::{CaptureBackend, CaptureChild, ProcessBackend, run_session};
