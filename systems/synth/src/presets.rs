use std::collections::BTreeMap;

use arcade_racer_core::{Event, SoundCue};
use rand::Rng;

use crate::{AudioOutput, Sound, SoundSettings, SynthParams, VoiceHandle};

/// Pre-synthesized sound for every [`SoundCue`].
#[derive(Clone, Debug)]
pub struct SoundBank {
    settings: SoundSettings,
    sounds: BTreeMap<SoundCue, Sound>,
}

impl SoundBank {
    /// Synthesizes every preset using `settings`.
    #[must_use]
    pub fn new(settings: SoundSettings) -> Self {
        let sounds = SoundCue::ALL
            .into_iter()
            .map(|cue| (cue, Sound::new(&Self::preset(cue), &settings)))
            .collect();
        Self { settings, sounds }
    }

    /// Synthesis parameters behind `cue`.
    #[must_use]
    pub fn preset(cue: SoundCue) -> SynthParams {
        let base = SynthParams::default();
        match cue {
            SoundCue::Beep => SynthParams {
                attack: 0.01,
                sustain: 0.08,
                release: 0.05,
                shape_curve: 0.5,
                delay: 0.3,
                sustain_volume: 0.9,
                decay: 0.01,
                filter: -99.0,
                ..base
            },
            SoundCue::Engine => SynthParams {
                frequency: 40.0,
                attack: 0.2,
                sustain: 0.5,
                release: 0.5,
                noise: 300.0,
                filter: -80.0,
                ..base
            },
            SoundCue::Hit => SynthParams {
                randomness: 0.3,
                frequency: 90.0,
                release: 0.2,
                shape_curve: 3.0,
                noise: 9.0,
                bit_crush: 0.3,
                sustain_volume: 0.3,
                decay: 0.01,
                ..base
            },
            SoundCue::Bump => SynthParams {
                volume: 4.0,
                randomness: 0.2,
                frequency: 400.0,
                attack: 0.01,
                sustain: 0.01,
                release: 0.01,
                shape_curve: 0.8,
                slide: -60.0,
                delta_slide: -70.0,
                repeat_time: 0.03,
                noise: 0.1,
                delay: 0.1,
                sustain_volume: 0.5,
                decay: 0.01,
                tremolo: 0.4,
                filter: 400.0,
                ..base
            },
            SoundCue::Checkpoint => SynthParams {
                volume: 0.3,
                frequency: 980.0,
                shape_curve: 3.0,
                bit_crush: 0.03,
                filter: 500.0,
                ..base
            },
            SoundCue::Win => SynthParams {
                volume: 1.5,
                frequency: 110.0,
                attack: 0.04,
                release: 2.0,
                shape_curve: 6.0,
                delta_slide: 1.0,
                pitch_jump: 330.0,
                pitch_jump_time: 0.07,
                repeat_time: 0.05,
                delay: 0.4,
                sustain_volume: 0.8,
                tremolo: 0.5,
                filter: 1_000.0,
                ..base
            },
            SoundCue::Lose => SynthParams {
                frequency: 120.0,
                attack: 0.1,
                release: 1.0,
                shape_curve: 3.0,
                delta_slide: 0.6,
                noise: 1.0,
                bit_crush: 0.2,
                delay: 0.4,
                sustain_volume: 0.1,
                decay: 1.0,
                filter: 500.0,
                ..base
            },
            SoundCue::Rain => SynthParams {
                frequency: 200.0,
                attack: 0.01,
                sustain: 0.1,
                release: 0.2,
                shape_curve: 0.3,
                modulation: 0.1,
                delay: 0.1,
                sustain_volume: 0.1,
                tremolo: 0.1,
                filter: 500.0,
                ..base
            },
            SoundCue::Splash => SynthParams {
                frequency: 400.0,
                attack: 0.01,
                sustain: 0.01,
                release: 0.01,
                shape_curve: 0.5,
                noise: 0.1,
                bit_crush: 0.1,
                delay: 0.1,
                sustain_volume: 0.1,
                tremolo: 0.1,
                filter: 200.0,
                ..base
            },
            SoundCue::SpeedLimit => SynthParams {
                frequency: 300.0,
                attack: 0.01,
                sustain: 0.1,
                release: 0.1,
                shape_curve: 0.5,
                noise: 0.1,
                bit_crush: 0.1,
                delay: 0.1,
                sustain_volume: 0.1,
                tremolo: 0.1,
                filter: 300.0,
                ..base
            },
        }
    }

    /// Pre-synthesized sound behind `cue`.
    #[must_use]
    pub fn sound(&self, cue: SoundCue) -> Option<&Sound> {
        self.sounds.get(&cue)
    }

    /// Plays `cue` scaled by the master volume.
    pub fn play<R: Rng>(
        &self,
        cue: SoundCue,
        volume: f32,
        pitch: f32,
        rng: &mut R,
        output: &mut dyn AudioOutput,
    ) -> Option<VoiceHandle> {
        self.sound(cue)?
            .play(volume * self.settings.volume, pitch, rng, output)
    }

    /// Plays the sound requested by `event`, ignoring every other event.
    pub fn play_event<R: Rng>(
        &self,
        event: &Event,
        rng: &mut R,
        output: &mut dyn AudioOutput,
    ) -> Option<VoiceHandle> {
        match event {
            Event::SoundRequested { cue, volume, pitch } => {
                self.play(*cue, *volume, *pitch, rng, output)
            }
            _ => None,
        }
    }
}
