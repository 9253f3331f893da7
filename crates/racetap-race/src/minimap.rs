//! Scrolling minimap model: player markers along the composed route
//! strip and a damped camera following them.

use racetap_core::smb::Route;

use crate::camera::Lerper;
use crate::player::PlayerId;

/// Default visible strip width in pixels (two screens).
pub const DEFAULT_VIEW_WIDTH: i32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMethod {
    #[default]
    None,
    FollowPlayer(PlayerId),
    FollowFarthest,
}

/// A player's dot on the strip this frame. Players off route this frame
/// have no marker at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMarker {
    pub player: PlayerId,
    pub section: usize,
    pub category_x: i32,
}

#[derive(Debug)]
pub struct Minimap {
    pub left_x: i32,
    pub width: i32,
    pub follow: FollowMethod,
    pub target_x: i32,
    camera: Lerper,
}

impl Minimap {
    pub fn new() -> Self {
        Self {
            left_x: 0,
            width: DEFAULT_VIEW_WIDTH,
            follow: FollowMethod::None,
            target_x: 0,
            camera: Lerper::new(),
        }
    }

    /// Visible window `[left_x, left_x + width)` in category coordinates.
    pub fn window(&self) -> (i32, i32) {
        (self.left_x, self.left_x + self.width)
    }

    pub fn step(&mut self, route: &Route, markers: &[PlayerMarker]) {
        if let Some(target) = self.follow_target(markers) {
            self.target_x = target;
            let max_left = (route.total_width() - self.width).max(0);
            let left = (target - self.width / 2).clamp(0, max_left);
            self.camera.target = left as f32;
        }
        self.camera.step();
        self.left_x = self.camera.position.round() as i32;
    }

    fn follow_target(&self, markers: &[PlayerMarker]) -> Option<i32> {
        match self.follow {
            FollowMethod::None => None,
            FollowMethod::FollowPlayer(id) => markers
                .iter()
                .find(|m| m.player == id)
                .map(|m| m.category_x),
            FollowMethod::FollowFarthest => markers.iter().map(|m| m.category_x).max(),
        }
    }

    /// Markers currently inside the visible window.
    pub fn visible<'a>(&self, markers: &'a [PlayerMarker]) -> Vec<&'a PlayerMarker> {
        let (left, right) = self.window();
        markers
            .iter()
            .filter(|m| m.category_x >= left && m.category_x < right)
            .collect()
    }
}

impl Default for Minimap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racetap_core::smb::Route;

    fn marker(player: PlayerId, section: usize, x: i32) -> PlayerMarker {
        PlayerMarker {
            player,
            section,
            category_x: x,
        }
    }

    #[test]
    fn follow_farthest_tracks_the_max() {
        let route = Route::any_percent();
        let mut map = Minimap::new();
        map.follow = FollowMethod::FollowFarthest;
        let markers = [marker(1, 0, 1000), marker(2, 1, 4000)];
        for _ in 0..1200 {
            map.step(&route, &markers);
        }
        assert_eq!(map.target_x, 4000);
        // Camera settles with the leader centered.
        assert!((map.left_x - (4000 - map.width / 2)).abs() <= 1);
    }

    #[test]
    fn follow_player_ignores_others() {
        let route = Route::any_percent();
        let mut map = Minimap::new();
        map.follow = FollowMethod::FollowPlayer(1);
        let markers = [marker(1, 0, 300), marker(2, 3, 9000)];
        for _ in 0..1200 {
            map.step(&route, &markers);
        }
        assert_eq!(map.target_x, 300);
        // Clamped at the strip's left edge.
        assert_eq!(map.left_x, (300 - map.width / 2).max(0));
    }

    #[test]
    fn missing_marker_keeps_the_camera_put() {
        let route = Route::any_percent();
        let mut map = Minimap::new();
        map.follow = FollowMethod::FollowPlayer(7);
        for _ in 0..10 {
            map.step(&route, &[]);
        }
        assert_eq!(map.left_x, 0);
    }

    #[test]
    fn visible_filters_to_the_window() {
        let route = Route::any_percent();
        let mut map = Minimap::new();
        map.follow = FollowMethod::None;
        map.step(&route, &[]);
        let markers = [marker(1, 0, 10), marker(2, 2, 9000)];
        let visible = map.visible(&markers);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].player, 1);
    }
}
