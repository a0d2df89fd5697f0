use serde::{Deserialize, Serialize};

use crate::constants::SUBJECT_WALK_SPEED;
use crate::rng::Rng;
use crate::types::{Vec2, ViewBounds};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubjectSample {
    pub position: Vec2,
    pub velocity_x: f32,
}

/// Read-only access to the tracked subject. `None` means there is nothing to
/// observe this tick.
pub trait SubjectProvider {
    fn sample(&self) -> Option<SubjectSample>;

    /// Advances the subject by one tick. Providers driven from outside keep
    /// the default no-op.
    fn tick(&mut self, _dt_secs: f32, _bounds: &ViewBounds) {}
}

#[derive(Clone, Debug, Default)]
pub struct FixedSubject {
    pub present: bool,
    pub position: Vec2,
    pub velocity_x: f32,
}

impl FixedSubject {
    pub fn at(position: Vec2) -> Self {
        Self {
            present: true,
            position,
            velocity_x: 0.0,
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

impl SubjectProvider for FixedSubject {
    fn sample(&self) -> Option<SubjectSample> {
        self.present.then_some(SubjectSample {
            position: self.position,
            velocity_x: self.velocity_x,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectConfig {
    pub start: Vec2,
    pub walk_speed: f32,
    pub min_walk_secs: f32,
    pub max_walk_secs: f32,
    pub min_still_secs: f32,
    pub max_still_secs: f32,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            start: Vec2::ZERO,
            walk_speed: SUBJECT_WALK_SPEED,
            min_walk_secs: 0.5,
            max_walk_secs: 2.5,
            min_still_secs: 0.5,
            max_still_secs: 3.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Stride {
    Walking { dir: f32, remaining: f32 },
    Still { remaining: f32 },
}

/// A stand-in player that alternates between walking and freezing, the way a
/// cautious player moves through the carriage.
#[derive(Clone, Debug)]
pub struct ScriptedSubject {
    config: SubjectConfig,
    position: Vec2,
    velocity_x: f32,
    stride: Stride,
    rng: Rng,
}

impl ScriptedSubject {
    pub fn new(config: SubjectConfig, seed: u32) -> Self {
        let mut rng = Rng::new(seed);
        let remaining = rng.range_f32(config.min_still_secs, config.max_still_secs);
        Self {
            position: config.start,
            velocity_x: 0.0,
            stride: Stride::Still { remaining },
            config,
            rng,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_walking(&self) -> bool {
        matches!(self.stride, Stride::Walking { .. })
    }

    fn next_stride(&mut self, bounds: &ViewBounds) -> Stride {
        if self.is_walking() {
            return Stride::Still {
                remaining: self
                    .rng
                    .range_f32(self.config.min_still_secs, self.config.max_still_secs),
            };
        }
        // Head back toward the middle when close to an edge.
        let margin = bounds.half_width * 0.2;
        let dir = if self.position.x <= bounds.left_edge() + margin {
            1.0
        } else if self.position.x >= bounds.right_edge() - margin {
            -1.0
        } else if self.rng.bool(0.5) {
            1.0
        } else {
            -1.0
        };
        Stride::Walking {
            dir,
            remaining: self
                .rng
                .range_f32(self.config.min_walk_secs, self.config.max_walk_secs),
        }
    }
}

impl SubjectProvider for ScriptedSubject {
    fn sample(&self) -> Option<SubjectSample> {
        Some(SubjectSample {
            position: self.position,
            velocity_x: self.velocity_x,
        })
    }

    fn tick(&mut self, dt_secs: f32, bounds: &ViewBounds) {
        let remaining = match &mut self.stride {
            Stride::Walking { remaining, .. } | Stride::Still { remaining } => {
                *remaining -= dt_secs;
                *remaining
            }
        };
        if remaining <= 0.0 {
            self.stride = self.next_stride(bounds);
        }

        match self.stride {
            Stride::Walking { dir, .. } => {
                let before = self.position.x;
                let next = before + dir * self.config.walk_speed * dt_secs;
                self.position.x = next.clamp(bounds.left_edge(), bounds.right_edge());
                self.velocity_x = if dt_secs > 0.0 {
                    (self.position.x - before) / dt_secs
                } else {
                    0.0
                };
            }
            Stride::Still { .. } => {
                self.velocity_x = 0.0;
            }
        }
    }
}
