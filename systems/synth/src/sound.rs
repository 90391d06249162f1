use arcade_racer_core::uniform;
use rand::Rng;

use crate::{synthesize, SynthParams};

/// Handle to a voice started by an [`AudioOutput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(u64);

impl VoiceHandle {
    /// Creates a handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Device that plays already-synthesized PCM buffers.
pub trait AudioOutput {
    /// Reports whether the device can accept new voices right now.
    fn is_ready(&self) -> bool;

    /// Attempts to wake a suspended device. Must not block.
    fn resume(&mut self);

    /// Starts playing `samples` at `volume` and playback `rate`.
    fn schedule(&mut self, samples: &[f32], volume: f32, rate: f32) -> Option<VoiceHandle>;
}

/// Global sound switches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoundSettings {
    /// When false, no buffer is ever synthesized and nothing plays.
    pub enabled: bool,
    /// Master gain applied on top of every per-call volume.
    pub volume: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.3,
        }
    }
}

/// Pre-synthesized sound effect.
#[derive(Clone, Debug, PartialEq)]
pub struct Sound {
    samples: Option<Vec<f32>>,
    randomness: f32,
}

impl Sound {
    /// Synthesizes `params` once, unless sound is disabled.
    #[must_use]
    pub fn new(params: &SynthParams, settings: &SoundSettings) -> Self {
        let samples = settings.enabled.then(|| synthesize(params));
        Self {
            samples,
            randomness: params.randomness,
        }
    }

    /// Rendered samples, or `None` when sound was disabled at creation.
    #[must_use]
    pub fn samples(&self) -> Option<&[f32]> {
        self.samples.as_deref()
    }

    /// Pitch randomness applied on every playback.
    #[must_use]
    pub const fn randomness(&self) -> f32 {
        self.randomness
    }

    /// Plays the buffer with a freshly randomized playback rate.
    ///
    /// The rate is `pitch + randomness * uniform(-pitch, pitch)`. A device
    /// that is not ready gets a single resume attempt and the request is
    /// dropped.
    pub fn play<R: Rng>(
        &self,
        volume: f32,
        pitch: f32,
        rng: &mut R,
        output: &mut dyn AudioOutput,
    ) -> Option<VoiceHandle> {
        let samples = self.samples.as_deref()?;
        if !output.is_ready() {
            output.resume();
            return None;
        }
        let rate = pitch + self.randomness * uniform(rng, -pitch, pitch);
        output.schedule(samples, volume, rate)
    }

    /// Plays the buffer transposed by `semitone_offset` semitones.
    pub fn play_note<R: Rng>(
        &self,
        semitone_offset: f32,
        volume: f32,
        rng: &mut R,
        output: &mut dyn AudioOutput,
    ) -> Option<VoiceHandle> {
        self.play(volume, 2.0_f32.powf(semitone_offset / 12.0), rng, output)
    }
}
