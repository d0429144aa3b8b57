//! CAUSA Runtime - Process orchestration
//!
//! Two execution models over the same per-process state:
//! - `System`: deterministic single-threaded stepping. A driver pumps the
//!   message bus one transit at a time, or feeds packets in any order it likes.
//! - `Cluster`: one tokio task per process. Each task owns its clocks,
//!   delivery buffer and history; processes only exchange immutable copies.
//!
//! Delivery observers are the only seam for visualization and logging of
//! histories; the runtime itself never formats or prints.

pub mod config;
pub mod logging;
pub mod bus;
pub mod observer;
pub mod process;
pub mod system;
pub mod cluster;

pub use config::*;
pub use logging::*;
pub use bus::*;
pub use observer::*;
pub use process::*;
pub use system::*;
pub use cluster::*;
