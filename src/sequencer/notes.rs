// Scale/key lookup table and note sequences
//
// The table maps (scale name, key) to a comma-separated list of semitone
// offsets. It is built once (built-in or loaded from JSON) and shared
// read-only; the provider turns a row into a two-octave note sequence.

use crate::error::{EngineError, EngineResult};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Key names accepted by the built-in table, with their semitone offset from C
const KEYS: [(&str, i32); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

/// Scale intervals from the root (root = 0)
const SCALES: [(&str, &[i32]); 16] = [
    ("major", &[0, 2, 4, 5, 7, 9, 11]),
    ("minor", &[0, 2, 3, 5, 7, 8, 10]),
    ("harmonic-minor", &[0, 2, 3, 5, 7, 8, 11]),
    ("melodic-minor", &[0, 2, 3, 5, 7, 9, 11]),
    ("dorian", &[0, 2, 3, 5, 7, 9, 10]),
    ("phrygian", &[0, 1, 3, 5, 7, 8, 10]),
    ("lydian", &[0, 2, 4, 6, 7, 9, 11]),
    ("mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
    ("locrian", &[0, 1, 3, 5, 6, 8, 10]),
    ("major-pentatonic", &[0, 2, 4, 7, 9]),
    ("minor-pentatonic", &[0, 3, 5, 7, 10]),
    ("blues", &[0, 3, 5, 6, 7, 10]),
    ("whole-tone", &[0, 2, 4, 6, 8, 10]),
    ("diminished", &[0, 2, 3, 5, 6, 8, 9, 11]),
    ("dominant-diminished", &[0, 1, 3, 4, 6, 7, 9, 10]),
    ("chromatic", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
];

/// One row of the lookup table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRow {
    pub scale_name: String,
    pub key: String,
    /// Comma-separated semitone offsets, e.g. "0, 4, 7"
    pub notes: String,
}

/// Static (scale, key) -> semitones table
#[derive(Debug, Clone, Default)]
pub struct ScaleTable {
    rows: HashMap<(String, String), String>,
}

impl ScaleTable {
    /// Builds a table from explicit rows; later rows win on duplicate keys
    pub fn from_rows(rows: impl IntoIterator<Item = ScaleRow>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| ((row.scale_name, row.key), row.notes))
            .collect();
        Self { rows }
    }

    /// Table covering every built-in scale in every key
    ///
    /// Each row holds the scale transposed to the key, folded into one octave
    /// and sorted ascending.
    pub fn builtin() -> Self {
        let rows = SCALES.iter().flat_map(|&(scale_name, intervals)| {
            KEYS.iter().map(move |&(key, root)| {
                let mut notes: Vec<i32> = intervals.iter().map(|i| (i + root) % 12).collect();
                notes.sort_unstable();
                ScaleRow {
                    scale_name: scale_name.to_string(),
                    key: key.to_string(),
                    notes: join_notes(&notes),
                }
            })
        });
        Self::from_rows(rows)
    }

    /// Parses a JSON array of rows
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let rows: Vec<ScaleRow> = serde_json::from_str(json)?;
        Ok(Self::from_rows(rows))
    }

    /// Loads a JSON table from disk
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Exact-match row lookup
    pub fn get(&self, scale_name: &str, key: &str) -> Option<&str> {
        self.rows
            .get(&(scale_name.to_string(), key.to_string()))
            .map(String::as_str)
    }

    pub fn contains(&self, scale_name: &str, key: &str) -> bool {
        self.get(scale_name, key).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct scale names, sorted
    pub fn scale_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rows.keys().map(|(scale, _)| scale.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// All rows, sorted by scale then key
    pub fn rows(&self) -> Vec<ScaleRow> {
        let mut rows: Vec<ScaleRow> = self
            .rows
            .iter()
            .map(|((scale_name, key), notes)| ScaleRow {
                scale_name: scale_name.clone(),
                key: key.clone(),
                notes: notes.clone(),
            })
            .collect();
        rows.sort_by(|a, b| (&a.scale_name, &a.key).cmp(&(&b.scale_name, &b.key)));
        rows
    }

    pub fn to_json_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(&self.rows())?)
    }
}

fn join_notes(notes: &[i32]) -> String {
    notes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Semitone offsets a channel may be pitch-shifted by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSequence {
    offsets: Vec<i32>,
}

impl NoteSequence {
    pub fn new(offsets: Vec<i32>) -> Self {
        Self { offsets }
    }

    /// Octave-down copy of `semitones` followed by the original octave
    pub fn two_octaves(semitones: &[i32]) -> Self {
        let offsets = semitones
            .iter()
            .map(|s| s - 12)
            .chain(semitones.iter().copied())
            .collect();
        Self { offsets }
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Draws `count` offsets uniformly with replacement
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<i32> {
        (0..count)
            .filter_map(|_| self.offsets.choose(rng).copied())
            .collect()
    }
}

/// Resolves note sequences from an injected table
#[derive(Debug, Clone)]
pub struct NoteSequenceProvider {
    table: Arc<ScaleTable>,
}

impl NoteSequenceProvider {
    pub fn new(table: Arc<ScaleTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ScaleTable {
        &self.table
    }

    /// Note sequence for `(scale, key)`; unknown pairs are a configuration error
    pub fn lookup(&self, scale: &str, key: &str) -> EngineResult<NoteSequence> {
        let row = self
            .table
            .get(scale, key)
            .ok_or_else(|| EngineError::ScaleNotFound {
                scale: scale.to_string(),
                key: key.to_string(),
            })?;

        let semitones = row
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i32>().map_err(|e| {
                    EngineError::InvalidConfig(format!(
                        "bad semitone '{}' for {}/{}: {}",
                        s, scale, key, e
                    ))
                })
            })
            .collect::<EngineResult<Vec<i32>>>()?;

        if semitones.is_empty() {
            return Err(EngineError::InvalidConfig(format!(
                "empty note list for {}/{}",
                scale, key
            )));
        }

        Ok(NoteSequence::two_octaves(&semitones))
    }
}
