use arcade_racer_core::{LevelInfo, LevelTable};

/// Ordered level table; progress beyond the last entry keeps the last level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelList {
    levels: Vec<LevelInfo>,
}

impl LevelList {
    /// Wraps the provided levels.
    #[must_use]
    pub fn new(levels: Vec<LevelInfo>) -> Self {
        Self { levels }
    }

    /// Number of configured levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Reports whether no level is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl LevelTable for LevelList {
    fn level_info(&self, progress: f32) -> LevelInfo {
        let index = if progress.is_finite() && progress > 0.0 {
            progress.floor() as usize
        } else {
            0
        };
        self.levels
            .get(index)
            .or_else(|| self.levels.last())
            .copied()
            .unwrap_or(LevelInfo {
                lane_count: 1,
                traffic_density: 0.0,
            })
    }
}
