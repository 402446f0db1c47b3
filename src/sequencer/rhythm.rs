// Euclidean rhythm generation
//
// Distributes `pulses` onsets as evenly as possible over `steps` slots using
// the bucket-merging form of Bjorklund's algorithm. The exact rotation of the
// output is part of the contract: the frame planner and every stored job
// depend on it.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rhythm configuration for one channel (`pulses` onsets over `steps` slots)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRhythmConfig")]
pub struct RhythmConfig {
    pulses: usize,
    steps: usize,
}

/// Unvalidated wire form; deserialization goes through `RhythmConfig::new`
#[derive(Deserialize)]
struct RawRhythmConfig {
    pulses: usize,
    steps: usize,
}

impl TryFrom<RawRhythmConfig> for RhythmConfig {
    type Error = EngineError;

    fn try_from(raw: RawRhythmConfig) -> EngineResult<Self> {
        Self::new(raw.pulses, raw.steps)
    }
}

impl RhythmConfig {
    /// Creates a validated rhythm configuration
    ///
    /// Fails unless `0 < pulses <= steps`.
    pub fn new(pulses: usize, steps: usize) -> EngineResult<Self> {
        if pulses == 0 || pulses > steps {
            return Err(EngineError::InvalidRhythm { pulses, steps });
        }
        Ok(Self { pulses, steps })
    }

    /// Builds a configuration from the `[pulses, steps]` pair stored in job files
    pub fn from_pair(pair: &[i64]) -> EngineResult<Self> {
        match pair {
            [pulses, steps] if *pulses > 0 && *steps > 0 => {
                Self::new(*pulses as usize, *steps as usize)
            }
            [pulses, steps] => Err(EngineError::InvalidRhythm {
                pulses: (*pulses).max(0) as usize,
                steps: (*steps).max(0) as usize,
            }),
            _ => Err(EngineError::InvalidConfig(format!(
                "rhythm config must be [pulses, steps], got {} values",
                pair.len()
            ))),
        }
    }

    pub fn pulses(&self) -> usize {
        self.pulses
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Generate the onset pattern for this configuration
    pub fn pattern(&self) -> OnsetPattern {
        OnsetPattern {
            onsets: euclidean(self.pulses, self.steps),
        }
    }
}

impl fmt::Display for RhythmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E({},{})", self.pulses, self.steps)
    }
}

/// Binary onset pattern: `true` marks a step that starts a new frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnsetPattern {
    onsets: Vec<bool>,
}

impl OnsetPattern {
    /// Wraps an explicit pattern (used by tests and hand-written grooves)
    pub fn from_steps(onsets: Vec<bool>) -> Self {
        Self { onsets }
    }

    /// Number of steps in the pattern
    pub fn len(&self) -> usize {
        self.onsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }

    /// Number of onsets (pulses)
    pub fn pulse_count(&self) -> usize {
        self.onsets.iter().filter(|&&on| on).count()
    }

    /// Step indices holding an onset, ascending
    pub fn onset_indices(&self) -> Vec<usize> {
        self.onsets
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
            .collect()
    }

    pub fn steps(&self) -> &[bool] {
        &self.onsets
    }

    /// Pattern as 0/1 values
    pub fn to_bits(&self) -> Vec<u8> {
        self.onsets.iter().map(|&on| on as u8).collect()
    }
}

impl fmt::Display for OnsetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &on in &self.onsets {
            write!(f, "{}", if on { 'x' } else { '.' })?;
        }
        Ok(())
    }
}

/// Generates an onset pattern for `pulses` over `steps`
///
/// Validates the configuration first, so it never loops on bad input.
pub fn generate(pulses: usize, steps: usize) -> EngineResult<OnsetPattern> {
    Ok(RhythmConfig::new(pulses, steps)?.pattern())
}

/// Bucket-merging Euclidean distribution
///
/// Callers must guarantee `0 < pulses <= steps`.
fn euclidean(pulses: usize, steps: usize) -> Vec<bool> {
    let mut buckets: Vec<Vec<bool>> = (0..steps).map(|i| vec![i < pulses]).collect();

    let mut n = pulses;
    let mut k = steps;
    loop {
        k -= n;
        if k <= 1 {
            break;
        }
        if k < n {
            std::mem::swap(&mut n, &mut k);
        }
        for i in 0..n {
            // Append the tail bucket to bucket i, then drop the tail
            let tail = buckets[buckets.len() - 1].clone();
            buckets[i].extend(tail);
            buckets.pop();
        }
    }

    buckets.into_iter().flatten().collect()
}
