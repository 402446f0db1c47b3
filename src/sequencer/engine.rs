// Sequence engine
//
// Runs one channel through the whole pipeline: rhythm, grid, length plan,
// slicing, note lookup and composition.

use crate::config::ChannelParams;
use crate::error::{EngineError, EngineResult};
use crate::sequencer::composer::{ComposeOptions, GeneratedSequence, SequenceComposer};
use crate::sequencer::grid::{self, Tempo};
use crate::sequencer::notes::{NoteSequence, NoteSequenceProvider, ScaleTable};
use crate::sequencer::planner::{self, FrameLengthPlan};
use crate::sequencer::slicer::{self, AudioFrameBank, Frame};
use rand::Rng;
use std::sync::Arc;

/// Everything a composition needs, derived from one channel and its source clip
#[derive(Debug, Clone)]
pub struct PreparedChannel {
    pub plan: FrameLengthPlan,
    pub bank: AudioFrameBank,
    pub notes: NoteSequence,
    pub tempo: Tempo,
}

/// Channel-level entry point into the sequencer
#[derive(Debug, Clone)]
pub struct SequenceEngine {
    sample_rate: u32,
    notes: NoteSequenceProvider,
    composer: SequenceComposer,
}

impl SequenceEngine {
    pub fn new(sample_rate: u32, table: Arc<ScaleTable>) -> Self {
        Self {
            sample_rate,
            notes: NoteSequenceProvider::new(table),
            composer: SequenceComposer::new(ComposeOptions {
                sample_rate,
                ..ComposeOptions::default()
            }),
        }
    }

    /// Replaces the composition options; the engine's sample rate always wins
    pub fn with_options(mut self, options: ComposeOptions) -> Self {
        self.composer = SequenceComposer::new(ComposeOptions {
            sample_rate: self.sample_rate,
            ..options
        });
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn options(&self) -> &ComposeOptions {
        self.composer.options()
    }

    pub fn notes(&self) -> &NoteSequenceProvider {
        &self.notes
    }

    /// Checks tempo and scale/key without touching any audio
    pub fn validate(&self, params: &ChannelParams) -> EngineResult<(Tempo, NoteSequence)> {
        let tempo = Tempo::new(params.bpm)?;
        let notes = self.notes.lookup(&params.scale_value, &params.key_value)?;
        if params.pitch_temperature > 100 {
            return Err(EngineError::InvalidConfig(format!(
                "pitch temperature {} outside 0-100",
                params.pitch_temperature
            )));
        }
        Ok((tempo, notes))
    }

    /// Validates the channel and cuts the source into its frame bank
    ///
    /// Rhythm, tempo, scale/key and source are all checked before any slicing.
    pub fn prepare(&self, params: &ChannelParams, source: &[f32]) -> EngineResult<PreparedChannel> {
        let onsets = params.rhythm.pattern();
        let (tempo, notes) = self.validate(params)?;
        if source.is_empty() {
            return Err(EngineError::SourceAudio(format!(
                "source for channel {} is empty",
                params.channel
            )));
        }

        let grid = grid::compute(source.len(), tempo.bpm(), onsets.len(), self.sample_rate)?;
        tracing::debug!(
            channel = params.channel,
            pulse = grid.pulse_length_samples,
            grid = grid.grid_value,
            "grid computed"
        );

        let plan = planner::plan(&onsets, &grid)?;
        tracing::debug!(
            channel = params.channel,
            rhythm = %params.rhythm,
            buckets = plan.buckets().len(),
            "frame lengths planned"
        );

        let bank = slicer::slice(source, &plan)?;
        Ok(PreparedChannel {
            plan,
            bank,
            notes,
            tempo,
        })
    }

    /// Generates a one-bar sequence for a channel
    pub fn generate<R: Rng + ?Sized>(
        &self,
        params: &ChannelParams,
        source: &[f32],
        rng: &mut R,
    ) -> EngineResult<GeneratedSequence> {
        let prepared = self.prepare(params, source)?;
        let sequence = self.composer.compose(
            &prepared.bank,
            &prepared.plan,
            &prepared.notes,
            params.pitch_temperature,
            prepared.tempo.bpm(),
            rng,
        )?;

        tracing::info!(
            channel = params.channel,
            frames = sequence.raw.len(),
            shifted = sequence.shifted_frames,
            samples = sequence.validated.len(),
            "sequence generated"
        );
        Ok(sequence)
    }

    /// Shuffled preview of every bucket, without pitch or length normalization
    pub fn preview<R: Rng + ?Sized>(
        &self,
        params: &ChannelParams,
        source: &[f32],
        rng: &mut R,
    ) -> EngineResult<Vec<Frame>> {
        let prepared = self.prepare(params, source)?;
        self.composer.compose_auto(&prepared.bank, &prepared.plan, rng)
    }
}
