//! dutchmint-schedule
//!
//! Admission pricing. A schedule is either a constant price or a Dutch
//! auction that steps down by a fixed amount at every interval boundary
//! after the sale start, never dropping below its floor.

pub mod schedule;

pub use schedule::{PricePoint, PriceSchedule};
