use serde::{Deserialize, Serialize};

/// One synthetic transient: the three parameters defining its emission
/// profile under the chosen light-curve family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSource {
    /// Characteristic onset time (MJD days).
    pub chartime: f64,
    /// Characteristic duration (days).
    pub chardur: f64,
    /// Characteristic flux (Jy).
    pub charflux: f64,
}

impl SimulatedSource {
    pub fn new(chartime: f64, chardur: f64, charflux: f64) -> Self {
        Self {
            chartime,
            chardur,
            charflux,
        }
    }
}
