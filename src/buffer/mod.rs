pub mod queue;

pub use queue::{BatchMode, EventQueue, QueueMetrics};
