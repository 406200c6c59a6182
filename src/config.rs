use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Boundary defaults (human mtDNA, rCRS)
// ---------------------------------------------------------------------------

pub const DEFAULT_GENOME_LENGTH: i64 = 16569;
pub const DEFAULT_ORI_H: (i64, i64) = (16081, 407);
pub const DEFAULT_ORI_L: (i64, i64) = (5730, 5763);
pub const DEFAULT_HET_LIMIT: f64 = 0.01;
pub const DEFAULT_FLANK_SIZE: usize = 15;

pub const DEFAULT_RADIUS: i64 = 600;

pub const DEFAULT_HIGH_HET: f64 = 10.0;
pub const DEFAULT_NOISE: f64 = 0.3;
pub const DEFAULT_MULTIPLE_THRESHOLD: usize = 10;
pub const DEFAULT_DOMINANT_FRACTION: f64 = 0.70;

/// Smallest group that can count as the dominant group, unless only one
/// event is retained.
pub const MIN_GROUP_SIZE: usize = 2;

// ---------------------------------------------------------------------------
// Genome context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeContext {
    pub genome_length: i64,
    /// Heavy-strand origin, may wrap.
    pub ori_h: (i64, i64),
    /// Light-strand origin, may wrap.
    pub ori_l: (i64, i64),
    /// Minimum heteroplasmy fraction for an event to be emitted.
    pub het_limit: f64,
    pub flank_size: usize,
}

impl Default for GenomeContext {
    fn default() -> Self {
        Self {
            genome_length: DEFAULT_GENOME_LENGTH,
            ori_h: DEFAULT_ORI_H,
            ori_l: DEFAULT_ORI_L,
            het_limit: DEFAULT_HET_LIMIT,
            flank_size: DEFAULT_FLANK_SIZE,
        }
    }
}

impl GenomeContext {
    pub fn validate(&self) -> Result<()> {
        if self.genome_length < 1 {
            return Err(Error::Config(format!(
                "genome length must be positive, got {}",
                self.genome_length
            )));
        }
        for (name, (start, end)) in [("OriH", self.ori_h), ("OriL", self.ori_l)] {
            for pos in [start, end] {
                if pos < 1 || pos > self.genome_length {
                    return Err(Error::Config(format!(
                        "{name} position {pos} is outside [1, {}]",
                        self.genome_length
                    )));
                }
            }
        }
        if !(0.0..=1.0).contains(&self.het_limit) {
            return Err(Error::Config(format!(
                "het_limit must be a fraction in [0, 1], got {}",
                self.het_limit
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Spatial grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Events whose midpoints are at most this many bp apart are linked.
    pub radius: i64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
        }
    }
}

// ---------------------------------------------------------------------------
// Pattern classification
// ---------------------------------------------------------------------------

/// Weights used when neither rule set matches outright and the verdict
/// falls back to comparing satisfied sub-criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionWeights {
    pub event_count: u32,
    pub dominance: u32,
    pub high_het: u32,
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self {
            event_count: 1,
            dominance: 1,
            high_het: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Heteroplasmy (%) at which an event counts as high.
    pub high_het: f64,
    /// Heteroplasmy (%) below which an event is discarded as noise.
    pub noise: f64,
    pub multiple_threshold: usize,
    pub dominant_fraction: f64,
    pub weights: CriterionWeights,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            high_het: DEFAULT_HIGH_HET,
            noise: DEFAULT_NOISE,
            multiple_threshold: DEFAULT_MULTIPLE_THRESHOLD,
            dominant_fraction: DEFAULT_DOMINANT_FRACTION,
            weights: CriterionWeights::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.high_het) || !(0.0..=100.0).contains(&self.noise) {
            return Err(Error::Config(
                "high_het and noise are percentages and must lie in [0, 100]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dominant_fraction) {
            return Err(Error::Config(format!(
                "dominant_fraction must lie in [0, 1], got {}",
                self.dominant_fraction
            )));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: ClassifierConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
