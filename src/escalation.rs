use serde::{Deserialize, Serialize};

use crate::agent::AgentParams;
use crate::config::AgentConfig;
use crate::constants::{
    DETECTION_THRESHOLDS, MAX_PAUSES_PER_TIER, PAUSE_CHANCE_PER_TIER, TIME_PENALTY_PER_TIER,
    VIGNETTE_INCREASE_PER_TIER, VIGNETTE_INTENSITY_PER_TIER, WIDTH_BONUS_PER_SPAWN,
};
use crate::error::{ConfigError, Result};
use crate::timer::CountdownTimer;

/// Difficulty settings for one tier.
///
/// `until` is the exclusive upper bound on the detection count that still maps
/// to this tier. Only the last tier may leave it open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDescriptor {
    #[serde(default)]
    pub until: Option<u32>,
    pub time_penalty_secs: f32,
    #[serde(default)]
    pub width_bonus: f32,
    pub pause_chance: u32,
    pub max_pauses: u32,
    #[serde(default)]
    pub vignette_intensity: f32,
    #[serde(default)]
    pub vignette_increase: f32,
}

impl TierDescriptor {
    pub fn peak_vignette(&self) -> f32 {
        (self.vignette_intensity + self.vignette_increase).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TierDescriptor>", into = "Vec<TierDescriptor>")]
pub struct TierTable {
    tiers: Vec<TierDescriptor>,
    thresholds: Vec<u32>,
}

impl TierTable {
    pub fn new(tiers: Vec<TierDescriptor>) -> Result<Self> {
        let Some((last, bounded)) = tiers.split_last() else {
            return Err(ConfigError::EmptyTierTable);
        };
        if let Some(threshold) = last.until {
            return Err(ConfigError::BoundedFinalTier { threshold });
        }

        let mut thresholds = Vec::with_capacity(bounded.len());
        for (index, tier) in bounded.iter().enumerate() {
            let Some(threshold) = tier.until else {
                return Err(ConfigError::UnboundedTierNotLast { index });
            };
            if let Some(&previous) = thresholds.last() {
                if threshold <= previous {
                    return Err(ConfigError::ThresholdsNotIncreasing {
                        index,
                        threshold,
                        previous,
                    });
                }
            }
            thresholds.push(threshold);
        }

        for (index, tier) in tiers.iter().enumerate() {
            if tier.pause_chance > 100 {
                return Err(ConfigError::PauseChanceOutOfRange {
                    index,
                    value: tier.pause_chance,
                });
            }
            let numbers = [
                ("timePenaltySecs", tier.time_penalty_secs),
                ("widthBonus", tier.width_bonus),
                ("vignetteIntensity", tier.vignette_intensity),
                ("vignetteIncrease", tier.vignette_increase),
            ];
            for (field, value) in numbers {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidValue { field, value });
                }
            }
        }

        Ok(Self { tiers, thresholds })
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    pub fn tier_for(&self, detections: u32) -> usize {
        tier_index(detections, &self.thresholds)
    }

    pub fn descriptor(&self, tier: usize) -> &TierDescriptor {
        // A validated table always has one more descriptor than thresholds,
        // so `tier_index` never points past the end.
        &self.tiers[tier.min(self.tiers.len() - 1)]
    }
}

impl Default for TierTable {
    fn default() -> Self {
        let tiers = (0..MAX_PAUSES_PER_TIER.len())
            .map(|idx| TierDescriptor {
                until: DETECTION_THRESHOLDS.get(idx).copied(),
                time_penalty_secs: TIME_PENALTY_PER_TIER[idx],
                width_bonus: WIDTH_BONUS_PER_SPAWN,
                pause_chance: PAUSE_CHANCE_PER_TIER[idx],
                max_pauses: MAX_PAUSES_PER_TIER[idx],
                vignette_intensity: VIGNETTE_INTENSITY_PER_TIER[idx],
                vignette_increase: VIGNETTE_INCREASE_PER_TIER[idx],
            })
            .collect();
        let thresholds = DETECTION_THRESHOLDS.to_vec();
        Self { tiers, thresholds }
    }
}

impl TryFrom<Vec<TierDescriptor>> for TierTable {
    type Error = ConfigError;

    fn try_from(tiers: Vec<TierDescriptor>) -> Result<Self> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<TierDescriptor> {
    fn from(table: TierTable) -> Self {
        table.tiers
    }
}

/// Smallest index whose threshold is still above `counter`, or
/// `thresholds.len()` once every threshold has been reached.
pub fn tier_index(counter: u32, thresholds: &[u32]) -> usize {
    thresholds
        .iter()
        .position(|&threshold| counter < threshold)
        .unwrap_or(thresholds.len())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionReport {
    pub detections: u32,
    pub previous_tier: usize,
    pub tier: usize,
    pub penalty_secs: f32,
}

impl DetectionReport {
    pub fn tier_changed(&self) -> bool {
        self.tier != self.previous_tier
    }
}

#[derive(Clone, Debug)]
pub struct EscalationTracker {
    detections: u32,
    tiers: TierTable,
}

impl EscalationTracker {
    pub fn new(tiers: TierTable) -> Self {
        Self {
            detections: 0,
            tiers,
        }
    }

    pub fn detections(&self) -> u32 {
        self.detections
    }

    pub fn current_tier(&self) -> usize {
        self.tiers.tier_for(self.detections)
    }

    pub fn descriptor(&self) -> &TierDescriptor {
        self.tiers.descriptor(self.current_tier())
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn agent_params(&self, base: &AgentConfig) -> AgentParams {
        AgentParams::for_tier(base, self.descriptor())
    }

    pub fn report_detection(&mut self, timer: &mut dyn CountdownTimer) -> DetectionReport {
        let previous_tier = self.current_tier();
        self.detections = self.detections.saturating_add(1);
        let tier = self.current_tier();
        let penalty_secs = self.tiers.descriptor(tier).time_penalty_secs;
        timer.modify_time(-penalty_secs);
        DetectionReport {
            detections: self.detections,
            previous_tier,
            tier,
            penalty_secs,
        }
    }
}
