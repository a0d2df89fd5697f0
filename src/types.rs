use serde::{Deserialize, Serialize};

use crate::constants::{camera_half_width, CAMERA_ASPECT, CAMERA_ORTHOGRAPHIC_SIZE};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const RIGHT: Vec2 = Vec2 { x: 1.0, y: 0.0 };
    pub const LEFT: Vec2 = Vec2 { x: -1.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `fallback` when the vector is
    /// zero-length or not finite.
    pub fn normalize_or(self, fallback: Vec2) -> Vec2 {
        let len = self.length();
        if !len.is_finite() || len <= f32::EPSILON {
            return fallback;
        }
        Vec2::new(self.x / len, self.y / len)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewBounds {
    pub center_x: f32,
    pub half_width: f32,
}

impl Default for ViewBounds {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            half_width: camera_half_width(CAMERA_ORTHOGRAPHIC_SIZE, CAMERA_ASPECT),
        }
    }
}

impl ViewBounds {
    pub fn left_edge(&self) -> f32 {
        self.center_x - self.half_width
    }

    pub fn right_edge(&self) -> f32 {
        self.center_x + self.half_width
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnSide {
    Left,
    Right,
    Random,
}

impl SpawnSide {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Patrolling,
    Paused,
    Observing,
    Fleeing,
    Despawned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Survived,
    TimeUp,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "facing")]
    pub facing_sign: f32,
    pub speed: f32,
    pub phase: AgentPhase,
    #[serde(rename = "pauseCount")]
    pub pause_count: u32,
    #[serde(rename = "maxPauses")]
    pub max_pauses: u32,
    #[serde(rename = "eyesFollowing")]
    pub eyes_following: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    AgentSpawned {
        #[serde(rename = "agentId")]
        agent_id: String,
        x: f32,
        y: f32,
        tier: usize,
        #[serde(rename = "detectionWidth")]
        detection_width: f32,
    },
    AgentPaused {
        #[serde(rename = "agentId")]
        agent_id: String,
        #[serde(rename = "pauseCount")]
        pause_count: u32,
        #[serde(rename = "maxPauses")]
        max_pauses: u32,
    },
    ObservationStarted {
        #[serde(rename = "agentId")]
        agent_id: String,
        #[serde(rename = "subjectX")]
        subject_x: f32,
        #[serde(rename = "subjectY")]
        subject_y: f32,
    },
    Detected {
        #[serde(rename = "agentId")]
        agent_id: String,
        detections: u32,
        tier: usize,
        #[serde(rename = "vignetteIntensity")]
        vignette_intensity: f32,
    },
    TimePenalty {
        seconds: f32,
    },
    TierChanged {
        from: usize,
        to: usize,
    },
    AgentResumed {
        #[serde(rename = "agentId")]
        agent_id: String,
        detected: bool,
    },
    EyesCleared {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    AgentDespawned {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    TimeUp,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(rename = "timeLeftSecs")]
    pub time_left_secs: f32,
    pub clock: String,
    pub warning: bool,
    pub detections: u32,
    pub tier: usize,
    #[serde(rename = "subjectX", skip_serializing_if = "Option::is_none")]
    pub subject_x: Option<f32>,
    pub agents: Vec<AgentView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub detections: u32,
    #[serde(rename = "finalTier")]
    pub final_tier: usize,
    #[serde(rename = "timeLeftSecs")]
    pub time_left_secs: f32,
    #[serde(rename = "totalPenaltySecs")]
    pub total_penalty_secs: f32,
    pub spawned: u32,
    pub despawned: u32,
    pub pauses: u32,
}
