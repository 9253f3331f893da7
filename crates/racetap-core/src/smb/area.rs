use serde::{Deserialize, Serialize};

/// Identifies a level layout by its area-data pointer (`$e7`/`$e8`).
///
/// The game reuses layouts across worlds (4-2's underground is the same
/// layout id for every visit), so routes pair this with world/level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct AreaId(pub u16);

impl AreaId {
    /// 1-1.
    pub const GROUND_AREA_6: AreaId = AreaId(0xa2e5);
    /// 1-2 underground.
    pub const UNDERGROUND_AREA_1: AreaId = AreaId(0xa5ca);
    /// 4-1.
    pub const GROUND_AREA_10: AreaId = AreaId(0xa32f);
    /// 4-2 underground.
    pub const UNDERGROUND_AREA_2: AreaId = AreaId(0xa61f);
    /// 8-1.
    pub const GROUND_AREA_19: AreaId = AreaId(0xa3eb);
    /// 8-2.
    pub const GROUND_AREA_20: AreaId = AreaId(0xa454);
    /// 8-3.
    pub const GROUND_AREA_21: AreaId = AreaId(0xa4c2);
    /// 8-4, the final castle with the looping maze corridors.
    pub const CASTLE_AREA_6: AreaId = AreaId(0xa7b9);

    pub fn from_bytes(low: u8, high: u8) -> Self {
        Self(u16::from(low) | (u16::from(high) << 8))
    }
}

impl std::fmt::Display for AreaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
