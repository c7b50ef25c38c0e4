//! Domain types for PatternLab

pub mod bar;
pub mod fundamentals;
pub mod series;
pub mod signal;

pub use bar::Bar;
pub use fundamentals::FundamentalSnapshot;
pub use series::{Series, SeriesError};
pub use signal::{group, Horizon, Signal};

/// Symbol type alias
pub type Symbol = String;
