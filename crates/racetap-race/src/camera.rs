//! Damped camera follow for the minimap and combined view.

/// Velocity-limited lerper with a short smoothing history.
///
/// Each step accelerates the velocity toward a damped fraction of the
/// remaining error, clamps it, and moves by the average of the last four
/// velocities. The smoothing keeps the camera from twitching when the
/// target jumps around (players trading the lead).
#[derive(Debug, Clone)]
pub struct Lerper {
    pub position: f32,
    pub target: f32,
    last_velocity: [f32; 4],
    pub acceleration: f32,
    pub dampen_amount: f32,
    pub max_velocity: f32,
}

impl Lerper {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            target: 0.0,
            last_velocity: [0.0; 4],
            acceleration: 0.8,
            dampen_amount: 0.25,
            max_velocity: 9.0,
        }
    }

    pub fn jump_to(&mut self, position: f32) {
        self.position = position;
        self.target = position;
        self.last_velocity = [0.0; 4];
    }

    pub fn step(&mut self) {
        let desired = (self.target - self.position) * self.dampen_amount;
        let current = self.last_velocity[0];
        let delta = (desired - current).clamp(-self.acceleration, self.acceleration);
        let velocity = (current + delta).clamp(-self.max_velocity, self.max_velocity);

        self.last_velocity.rotate_right(1);
        self.last_velocity[0] = velocity;

        let smoothed: f32 = self.last_velocity.iter().sum::<f32>() / 4.0;
        self.position += smoothed;
    }
}

impl Default for Lerper {
    fn default() -> Self {
        Self::new()
    }
}
