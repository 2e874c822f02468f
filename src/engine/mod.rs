// engine/mod.rs
//
// The core pipeline engine: reservation stations, reorder buffer, register
// renaming, stall accounting, and the five-stage per-cycle driver.

pub mod pipeline;
pub mod register_status;
pub mod reorder_buffer;
pub mod reservation_station;
pub mod stalls;
pub mod timing;

pub use pipeline::simulate;
pub use stalls::StallCounters;
pub use timing::{TimingRecord, TimingRecorder};
