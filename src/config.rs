use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AGENT_BASE_SPEED, DESPAWN_MARGIN, DETECTION_START_DELAY_SECS, MAX_SPAWN_DELAY_SECS,
    MIN_AGENT_LIFETIME_SECS, MIN_PAUSE_INTERVAL_SECS, MIN_SPAWN_DELAY_SECS, MOVEMENT_THRESHOLD,
    PAUSE_DURATION_SECS,
};
use crate::detection::DetectionZone;
use crate::error::{ConfigError, Result};
use crate::escalation::TierTable;
use crate::subject::SubjectConfig;
use crate::timer::TimerConfig;
use crate::types::{SpawnSide, ViewBounds};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    pub speed: f32,
    pub pause_duration_secs: f32,
    pub detection_start_delay_secs: f32,
    pub min_pause_interval_secs: f32,
    pub movement_threshold: f32,
    pub min_lifetime_secs: f32,
    pub despawn_margin: f32,
    pub detection: DetectionZone,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            speed: AGENT_BASE_SPEED,
            pause_duration_secs: PAUSE_DURATION_SECS,
            detection_start_delay_secs: DETECTION_START_DELAY_SECS,
            min_pause_interval_secs: MIN_PAUSE_INTERVAL_SECS,
            movement_threshold: MOVEMENT_THRESHOLD,
            min_lifetime_secs: MIN_AGENT_LIFETIME_SECS,
            despawn_margin: DESPAWN_MARGIN,
            detection: DetectionZone::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnerConfig {
    pub min_spawn_delay_secs: f32,
    pub max_spawn_delay_secs: f32,
    pub spawn_y: f32,
    pub side: SpawnSide,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            min_spawn_delay_secs: MIN_SPAWN_DELAY_SECS,
            max_spawn_delay_secs: MAX_SPAWN_DELAY_SECS,
            spawn_y: 0.0,
            side: SpawnSide::Left,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimConfig {
    pub agent: AgentConfig,
    pub spawner: SpawnerConfig,
    pub tiers: TierTable,
    pub timer: TimerConfig,
    pub view: ViewBounds,
    pub subject: SubjectConfig,
}

impl SimConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SimConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let agent = &self.agent;
        non_negative("agent.speed", agent.speed)?;
        positive("agent.pauseDurationSecs", agent.pause_duration_secs)?;
        non_negative(
            "agent.detectionStartDelaySecs",
            agent.detection_start_delay_secs,
        )?;
        non_negative("agent.minPauseIntervalSecs", agent.min_pause_interval_secs)?;
        non_negative("agent.movementThreshold", agent.movement_threshold)?;
        non_negative("agent.minLifetimeSecs", agent.min_lifetime_secs)?;
        non_negative("agent.despawnMargin", agent.despawn_margin)?;
        positive("agent.detection.width", agent.detection.width)?;
        positive("agent.detection.height", agent.detection.height)?;
        finite("agent.detection.offset.x", agent.detection.offset.x)?;
        finite("agent.detection.offset.y", agent.detection.offset.y)?;
        not_above(
            "agent.detectionStartDelaySecs",
            agent.detection_start_delay_secs,
            "agent.pauseDurationSecs",
            agent.pause_duration_secs,
        )?;

        let spawner = &self.spawner;
        non_negative("spawner.minSpawnDelaySecs", spawner.min_spawn_delay_secs)?;
        non_negative("spawner.maxSpawnDelaySecs", spawner.max_spawn_delay_secs)?;
        finite("spawner.spawnY", spawner.spawn_y)?;
        not_above(
            "spawner.minSpawnDelaySecs",
            spawner.min_spawn_delay_secs,
            "spawner.maxSpawnDelaySecs",
            spawner.max_spawn_delay_secs,
        )?;

        positive("timer.initialSecs", self.timer.initial_secs)?;
        non_negative("timer.warningSecs", self.timer.warning_secs)?;

        finite("view.centerX", self.view.center_x)?;
        positive("view.halfWidth", self.view.half_width)?;

        let subject = &self.subject;
        finite("subject.start.x", subject.start.x)?;
        finite("subject.start.y", subject.start.y)?;
        non_negative("subject.walkSpeed", subject.walk_speed)?;
        positive("subject.minWalkSecs", subject.min_walk_secs)?;
        positive("subject.minStillSecs", subject.min_still_secs)?;
        not_above(
            "subject.minWalkSecs",
            subject.min_walk_secs,
            "subject.maxWalkSecs",
            subject.max_walk_secs,
        )?;
        not_above(
            "subject.minStillSecs",
            subject.min_still_secs,
            "subject.maxStillSecs",
            subject.max_still_secs,
        )?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::InvalidValue { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::InvalidValue { field, value });
    }
    Ok(())
}

fn not_above(field: &'static str, value: f32, limit_field: &'static str, limit: f32) -> Result<()> {
    if value > limit {
        return Err(ConfigError::OutOfOrder {
            field,
            value,
            limit_field,
            limit,
        });
    }
    Ok(())
}
