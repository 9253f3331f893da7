//! Race routes: the ordered level sections a category runs through.

use serde::{Deserialize, Serialize};

use super::area::AreaId;

/// Horizontal gap inserted between sections when composing the minimap.
pub const SECTION_GAP: i32 = 16;

/// One contiguous stretch of a category: an area layout bounded by
/// `left <= apx < right`, pinned to a world/level so reused layouts
/// stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub aid: AreaId,
    pub left: i32,
    pub right: i32,
    pub world: u8,
    pub level: u8,
}

impl Section {
    pub fn width(&self) -> i32 {
        self.right - self.left - 1
    }
}

/// A (section, page) jump that must not record a split, e.g. a shortcut
/// the category allows that skips the intermediate pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitException {
    pub from_section: usize,
    pub from_page: i32,
    pub to_section: usize,
    pub to_page: i32,
}

/// Where a player sits inside a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPosition {
    pub section: usize,
    /// Pixel offset into the composed category strip (minimap x).
    pub category_x: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub split_exceptions: Vec<SplitException>,
}

impl Route {
    /// Composed strip width: section widths plus a fixed gap between them.
    pub fn total_width(&self) -> i32 {
        let widths: i32 = self.sections.iter().map(Section::width).sum();
        widths + SECTION_GAP * (self.sections.len().saturating_sub(1) as i32)
    }

    /// Locate `(aid, apx, world, level)` within the route.
    ///
    /// Returns `None` when the player is not anywhere on the route this
    /// frame (menus, pipes transitions, off-route areas); callers treat
    /// that as "no timing update, no minimap marker".
    pub fn in_category(
        &self,
        aid: AreaId,
        apx: i32,
        world: u8,
        level: u8,
    ) -> Option<CategoryPosition> {
        let mut offset = 0i32;
        for (i, sec) in self.sections.iter().enumerate() {
            if sec.aid == aid
                && sec.world == world
                && sec.level == level
                && apx >= sec.left
                && apx < sec.right
            {
                return Some(CategoryPosition {
                    section: i,
                    category_x: offset + (apx - sec.left),
                });
            }
            offset += sec.width() + SECTION_GAP;
        }
        None
    }

    /// Page within a section: 256 pixel slices from the section's left edge.
    pub fn page_of(&self, section: usize, apx: i32) -> i32 {
        let sec = &self.sections[section];
        (apx - sec.left) / 256
    }

    pub fn is_split_exception(&self, from: (usize, i32), to: (usize, i32)) -> bool {
        self.split_exceptions.iter().any(|e| {
            (e.from_section, e.from_page) == from && (e.to_section, e.to_page) == to
        })
    }

    /// The any% warps route: 1-1, 1-2, 4-1, 4-2, 8-1, 8-2, 8-3, 8-4.
    pub fn any_percent() -> Self {
        let sec = |aid, left, right, world, level| Section {
            aid,
            left,
            right,
            world,
            level,
        };
        Self {
            name: "any_percent".to_owned(),
            sections: vec![
                sec(AreaId::GROUND_AREA_6, 0, 3584, 1, 1),
                sec(AreaId::UNDERGROUND_AREA_1, 0, 3072, 1, 2),
                sec(AreaId::GROUND_AREA_10, 0, 3584, 4, 1),
                sec(AreaId::UNDERGROUND_AREA_2, 0, 3072, 4, 2),
                sec(AreaId::GROUND_AREA_19, 0, 6144, 8, 1),
                sec(AreaId::GROUND_AREA_20, 0, 3840, 8, 2),
                sec(AreaId::GROUND_AREA_21, 0, 3840, 8, 3),
                sec(AreaId::CASTLE_AREA_6, 0, 4608, 8, 4),
            ],
            split_exceptions: vec![SplitException {
                from_section: 2,
                from_page: 2,
                to_section: 5,
                to_page: 1,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_width_counts_gaps() {
        let route = Route::any_percent();
        let widths: i32 = route.sections.iter().map(|s| s.right - s.left - 1).sum();
        assert_eq!(route.total_width(), widths + 16 * 7);
    }

    #[test]
    fn in_category_matches_world_and_level() {
        let route = Route::any_percent();
        let pos = route
            .in_category(AreaId::GROUND_AREA_6, 100, 1, 1)
            .unwrap();
        assert_eq!(pos.section, 0);
        assert_eq!(pos.category_x, 100);

        // Same layout in the wrong world is off route.
        assert!(route.in_category(AreaId::GROUND_AREA_6, 100, 2, 1).is_none());
        // Past the right edge is off route.
        assert!(
            route
                .in_category(AreaId::GROUND_AREA_6, 3584, 1, 1)
                .is_none()
        );
    }

    #[test]
    fn category_x_accumulates_prior_sections() {
        let route = Route::any_percent();
        let pos = route
            .in_category(AreaId::UNDERGROUND_AREA_1, 10, 1, 2)
            .unwrap();
        assert_eq!(pos.section, 1);
        assert_eq!(pos.category_x, (3584 - 1) + 16 + 10);
    }

    #[test]
    fn split_exception_lookup() {
        let route = Route::any_percent();
        assert!(route.is_split_exception((2, 2), (5, 1)));
        assert!(!route.is_split_exception((2, 2), (5, 2)));
    }

    #[test]
    fn json_round_trip() {
        let route = Route::any_percent();
        let raw = serde_json::to_string(&route).unwrap();
        let back: Route = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, route);
    }
}
