use serde::{Deserialize, Serialize};

/// A named pool of interchangeable physical units.
///
/// Invariant: `0 <= available <= capacity` at all times. `capacity` is fixed
/// at provisioning; only check-in/check-out move `available`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HardwareSet {
    pub name: String,
    pub available: i64,
    pub capacity: i64,
}
