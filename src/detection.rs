use serde::{Deserialize, Serialize};

use crate::constants::{DETECTION_HEIGHT, DETECTION_WIDTH};
use crate::types::Vec2;

/// Axis-aligned sensor box that sits ahead of an agent.
///
/// The box is not an angular field of view; a subject anywhere inside the
/// rectangle counts as seen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionZone {
    pub width: f32,
    pub height: f32,
    pub offset: Vec2,
}

impl Default for DetectionZone {
    fn default() -> Self {
        Self::new(DETECTION_WIDTH, DETECTION_HEIGHT, Vec2::ZERO)
    }
}

impl DetectionZone {
    pub fn new(width: f32, height: f32, offset: Vec2) -> Self {
        Self {
            width,
            height,
            offset,
        }
    }

    pub fn center(&self, agent_pos: Vec2, facing_sign: f32) -> Vec2 {
        let sign = if facing_sign < 0.0 { -1.0 } else { 1.0 };
        Vec2::new(agent_pos.x + self.offset.x * sign, agent_pos.y + self.offset.y)
    }

    pub fn contains(&self, subject_pos: Vec2, agent_pos: Vec2, facing_sign: f32) -> bool {
        let center = self.center(agent_pos, facing_sign);
        (subject_pos.x - center.x).abs() < self.width * 0.5
            && (subject_pos.y - center.y).abs() < self.height * 0.5
    }

    pub fn widened(mut self, bonus: f32) -> Self {
        self.width += bonus;
        self
    }
}
