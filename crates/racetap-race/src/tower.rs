//! The timing tower: ranked players with gaps, and the animation that
//! reconciles the drawn rows toward the live standings.

pub const TOWER_Y_SPACING: i32 = 12;
pub const TOWER_MOVE_FRAMES: i32 = 16;

/// Interval display grid: gaps are rounded to tenths of a second.
pub const INTERVAL_GRID_MS: i64 = 100;

pub fn round_to_grid(ms: i64) -> i64 {
    let half = INTERVAL_GRID_MS / 2;
    if ms >= 0 {
        (ms + half) / INTERVAL_GRID_MS * INTERVAL_GRID_MS
    } else {
        -((-ms + half) / INTERVAL_GRID_MS * INTERVAL_GRID_MS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TowerEntry {
    pub position: i32,
    pub color: u8,
    pub name: String,
    /// -1: not running; 0: leader; positive: gap to the row above.
    pub interval_ms: i64,
    pub is_final_time: bool,
    pub in_section: bool,
    pub is_highlight: bool,
    /// Pixel offset from the tower top, animated during reorders.
    pub y: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TowerState {
    pub title: String,
    pub subtitle: String,
    pub entries: Vec<TowerEntry>,
}

#[derive(Debug, Clone, Copy, Default)]
struct EntryReconciliation {
    start_y: i32,
}

/// Drawn state plus the fixed-frame animation toward the target.
#[derive(Debug, Default)]
pub struct TimingTower {
    pub draw_state: TowerState,
    pub target_state: TowerState,
    moving_timer: i32,
    reconciliation: Vec<EntryReconciliation>,
    pub from_leader: bool,
}

impl TimingTower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the drawn tower one display frame toward the target.
    pub fn reconcile(&mut self) {
        let target = &self.target_state;

        if !same_identity(&self.draw_state, target) {
            // Different players (or a different count): no animation to
            // speak of, replace outright.
            self.draw_state = target.clone();
            for (i, entry) in self.draw_state.entries.iter_mut().enumerate() {
                entry.y = i as i32 * TOWER_Y_SPACING;
            }
            self.reconciliation = vec![EntryReconciliation::default(); target.entries.len()];
            self.moving_timer = 0;
            return;
        }

        // Same players: adopt the target data but keep the animated rows.
        let old_y: Vec<(String, i32)> = self
            .draw_state
            .entries
            .iter()
            .map(|e| (e.name.clone(), e.y))
            .collect();
        let mut moved = false;
        let mut next = target.clone();
        for (i, entry) in next.entries.iter_mut().enumerate() {
            let resting = i as i32 * TOWER_Y_SPACING;
            let y = old_y
                .iter()
                .find(|(name, _)| *name == entry.name)
                .map(|&(_, y)| y)
                .unwrap_or(resting);
            entry.y = y;
            if y != resting {
                moved = true;
            }
        }
        self.draw_state.title = next.title.clone();
        self.draw_state.subtitle = next.subtitle.clone();
        self.draw_state.entries = next.entries;

        if moved && self.moving_timer == 0 {
            self.moving_timer = TOWER_MOVE_FRAMES;
            self.reconciliation = self
                .draw_state
                .entries
                .iter()
                .map(|e| EntryReconciliation { start_y: e.y })
                .collect();
        }

        if self.moving_timer > 0 {
            self.moving_timer -= 1;
            let t = (TOWER_MOVE_FRAMES - self.moving_timer) as f32 / TOWER_MOVE_FRAMES as f32;
            for (i, entry) in self.draw_state.entries.iter_mut().enumerate() {
                let start = self.reconciliation.get(i).map(|r| r.start_y).unwrap_or(0);
                let resting = i as i32 * TOWER_Y_SPACING;
                entry.y = start + ((resting - start) as f32 * t).round() as i32;
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        self.moving_timer > 0
    }
}

fn same_identity(a: &TowerState, b: &TowerState) -> bool {
    if a.entries.len() != b.entries.len() {
        return false;
    }
    let mut an: Vec<&str> = a.entries.iter().map(|e| e.name.as_str()).collect();
    let mut bn: Vec<&str> = b.entries.iter().map(|e| e.name.as_str()).collect();
    an.sort_unstable();
    bn.sort_unstable();
    an == bn
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, position: i32, interval: i64) -> TowerEntry {
        TowerEntry {
            position,
            color: 0x16,
            name: name.to_owned(),
            interval_ms: interval,
            is_final_time: false,
            in_section: true,
            is_highlight: false,
            y: 0,
        }
    }

    fn target(entries: Vec<TowerEntry>) -> TowerState {
        TowerState {
            title: "race".to_owned(),
            subtitle: "any%".to_owned(),
            entries,
        }
    }

    #[test]
    fn identity_change_replaces_directly() {
        let mut tower = TimingTower::new();
        tower.target_state = target(vec![entry("a", 1, 0), entry("b", 2, 300)]);
        tower.reconcile();
        assert_eq!(tower.draw_state.entries.len(), 2);
        assert_eq!(tower.draw_state.entries[0].y, 0);
        assert_eq!(tower.draw_state.entries[1].y, TOWER_Y_SPACING);
        assert!(!tower.is_animating());
    }

    #[test]
    fn reorder_animates_over_fixed_frames() {
        let mut tower = TimingTower::new();
        tower.target_state = target(vec![entry("a", 1, 0), entry("b", 2, 300)]);
        tower.reconcile();

        // b takes the lead.
        tower.target_state = target(vec![entry("b", 1, 0), entry("a", 2, 200)]);
        tower.reconcile();
        assert!(tower.is_animating());
        let mid_b = tower.draw_state.entries[0].y;
        assert!(mid_b > 0 && mid_b <= TOWER_Y_SPACING);

        for _ in 0..TOWER_MOVE_FRAMES {
            tower.reconcile();
        }
        assert!(!tower.is_animating());
        assert_eq!(tower.draw_state.entries[0].name, "b");
        assert_eq!(tower.draw_state.entries[0].y, 0);
        assert_eq!(tower.draw_state.entries[1].y, TOWER_Y_SPACING);
    }

    #[test]
    fn data_updates_flow_through_while_static() {
        let mut tower = TimingTower::new();
        tower.target_state = target(vec![entry("a", 1, 0), entry("b", 2, 300)]);
        tower.reconcile();
        tower.target_state = target(vec![entry("a", 1, 0), entry("b", 2, 500)]);
        tower.reconcile();
        assert_eq!(tower.draw_state.entries[1].interval_ms, 500);
        assert!(!tower.is_animating());
    }

    #[test]
    fn grid_rounding() {
        assert_eq!(round_to_grid(0), 0);
        assert_eq!(round_to_grid(49), 0);
        assert_eq!(round_to_grid(50), 100);
        assert_eq!(round_to_grid(2067), 2100);
        assert_eq!(round_to_grid(-49), 0);
        assert_eq!(round_to_grid(-150), -200);
    }
}
