//! Typed data records shared across the simulation pipeline.

pub mod observation;
pub mod source;
pub mod time;

pub use observation::{Observation, ObservationSchedule, Pointing};
pub use source::SimulatedSource;
pub use time::ModifiedJulianDate;
