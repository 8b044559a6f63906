pub mod duration;
pub mod fs_atomic;
pub mod ids;
pub mod logging;

pub use duration::format_duration;
pub use ids::UnitId;
pub use logging::{DebugLevel, Logger};
