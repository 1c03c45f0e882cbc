use std::time::Duration;

/// Tunables shared by the geometry engine and the view synchronisation.
#[derive(Clone, Debug)]
pub struct MprConfig {
    /// Delay between two polls for a view condition.
    pub poll_interval: Duration,
    /// Polls attempted before a wait fails.
    pub max_poll_attempts: u32,
    /// Minimum angle in radians between two plane normals for a reference line.
    pub reference_line_min_angle: f64,
    /// Rotation applied per mouse wheel step, in degrees.
    pub wheel_step_degrees: f64,
    /// Minimum magnitude of the unit slice normal's largest component for a
    /// stack to count as L/R, A/P or S/I.
    pub orientation_dominance: f64,
    pub geometry_epsilon: f64,
    /// Value written where a reslice plane leaves the volume.
    pub background: f64,
    /// Slice loads kept in flight while assembling a volume.
    pub max_concurrent_loads: usize,
}

impl Default for MprConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            max_poll_attempts: 15,
            reference_line_min_angle: 0.5,
            wheel_step_degrees: 1.0,
            orientation_dominance: 0.8,
            geometry_epsilon: 1e-6,
            background: 0.0,
            max_concurrent_loads: 8,
        }
    }
}

impl MprConfig {
    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    pub fn with_reference_line_min_angle(mut self, radians: f64) -> Self {
        self.reference_line_min_angle = radians;
        self
    }

    pub fn with_wheel_step_degrees(mut self, degrees: f64) -> Self {
        self.wheel_step_degrees = degrees;
        self
    }

    pub fn with_max_concurrent_loads(mut self, loads: usize) -> Self {
        self.max_concurrent_loads = loads.max(1);
        self
    }
}
