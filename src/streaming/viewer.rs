/// Viewer position with movement hysteresis.
///
/// Positions are in grid units (world position divided by the terrain scale).
#[derive(Clone, Debug)]
pub struct ViewerState {
    position: (f32, f32),
    last_update: Option<(f32, f32)>,
    sqr_threshold: f32,
}

impl ViewerState {
    pub fn new(move_threshold: f32) -> Self {
        Self {
            position: (0.0, 0.0),
            last_update: None,
            sqr_threshold: move_threshold * move_threshold,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn set_position(&mut self, position: (f32, f32)) {
        self.position = position;
    }

    /// Position at the last recomputation, if any.
    pub fn last_update(&self) -> Option<(f32, f32)> {
        self.last_update
    }

    /// True before the first recomputation, then once the viewer has moved at
    /// least the threshold distance since the last one.
    pub fn should_update(&self) -> bool {
        match self.last_update {
            None => true,
            Some((x, y)) => {
                let dx = self.position.0 - x;
                let dy = self.position.1 - y;
                dx * dx + dy * dy >= self.sqr_threshold
            }
        }
    }

    pub fn mark_updated(&mut self) {
        self.last_update = Some(self.position);
    }
}
