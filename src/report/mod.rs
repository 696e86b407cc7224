//! Static report generation.
//!
//! This module renders one interactive chart page per tracked entity and
//! the index page linking to all of them.

pub mod chart;
pub mod index;

pub use chart::write_chart;
pub use index::write_index;
