use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A group of users sharing a pool of checked-out hardware allocations.
///
/// `hardware` maps a hardware-set name to the units currently allocated to
/// this project. Stored values are never negative; a zero entry means
/// "none allocated" and is hidden from read views.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Project {
    pub id: String, // "<owner>_<n>" from the owner's project counter
    pub name: String,
    pub description: String,
    pub members: BTreeSet<String>,
    pub hardware: BTreeMap<String, i64>,
}

impl Project {
    /// Display transform for read views: drops hardware entries with
    /// nothing allocated. Does not touch storage.
    pub fn for_display(mut self) -> Self {
        self.hardware.retain(|_, units| *units > 0);
        self
    }
}
