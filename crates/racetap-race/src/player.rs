use serde::{Deserialize, Serialize};

pub type PlayerId = u32;

/// A seat in the race, as configured by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RacePlayer {
    pub id: PlayerId,
    pub short_name: String,
    pub full_name: String,
    /// Representative palette index for markers and tower rows.
    pub color: u8,
}

impl RacePlayer {
    pub fn new(id: PlayerId, short_name: &str) -> Self {
        Self {
            id,
            short_name: short_name.to_owned(),
            full_name: short_name.to_owned(),
            color: 0x16,
        }
    }
}
