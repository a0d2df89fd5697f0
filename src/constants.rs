pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const AGENT_BASE_SPEED: f32 = 2.0;
pub const PAUSE_DURATION_SECS: f32 = 1.0;
pub const DETECTION_START_DELAY_SECS: f32 = 0.2;
pub const MIN_PAUSE_INTERVAL_SECS: f32 = 2.0;
pub const MOVEMENT_THRESHOLD: f32 = 0.1;
pub const MIN_AGENT_LIFETIME_SECS: f32 = 0.5;

pub const DETECTION_WIDTH: f32 = 30.0;
pub const DETECTION_HEIGHT: f32 = 2.0;

pub const DESPAWN_MARGIN: f32 = 2.0;
pub const MIN_SPAWN_DELAY_SECS: f32 = 3.0;
pub const MAX_SPAWN_DELAY_SECS: f32 = 6.0;

pub const CAMERA_ORTHOGRAPHIC_SIZE: f32 = 5.0;
pub const CAMERA_ASPECT: f32 = 16.0 / 9.0;

pub const ESCAPE_TIME_SECS: f32 = 60.0;
pub const ESCAPE_WARNING_SECS: f32 = 15.0;
pub const MIN_TIME_AFTER_PENALTY_SECS: f32 = 1.0;

pub const SUBJECT_WALK_SPEED: f32 = 3.0;

/// Upper detection-count bound per tier; the tier after the last bound is open-ended.
pub const DETECTION_THRESHOLDS: [u32; 3] = [3, 6, 9];
pub const MAX_PAUSES_PER_TIER: [u32; 4] = [3, 4, 5, 6];
pub const PAUSE_CHANCE_PER_TIER: [u32; 4] = [30, 45, 60, 75];
pub const TIME_PENALTY_PER_TIER: [f32; 4] = [3.0, 5.0, 7.0, 10.0];
pub const VIGNETTE_INTENSITY_PER_TIER: [f32; 4] = [0.3, 0.4, 0.5, 0.6];
pub const VIGNETTE_INCREASE_PER_TIER: [f32; 4] = [0.0, 0.1, 0.2, 0.3];
pub const WIDTH_BONUS_PER_SPAWN: f32 = 1.0;

pub fn camera_half_width(orthographic_size: f32, aspect: f32) -> f32 {
    orthographic_size * aspect
}
