#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural sound synthesis for the arcade racer.
//!
//! [`synthesize`] turns a compact [`SynthParams`] set into a mono PCM buffer.
//! It is a pure function: the same parameters always produce bit-identical
//! samples. [`Sound`] wraps one pre-rendered buffer for low-latency playback
//! through an [`AudioOutput`], and [`SoundBank`] holds the game's cue presets.

use std::f64::consts::TAU;

use log::warn;
use serde::{Deserialize, Serialize};

pub mod music;
mod presets;
mod sound;

pub use presets::SoundBank;
pub use sound::{AudioOutput, Sound, SoundSettings, VoiceHandle};

/// Output sample rate of every synthesized buffer, in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

const FILTER_QUALITY: f64 = 2.0;

/// Base oscillator shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Waveform {
    /// Sine wave.
    #[default]
    Sine,
    /// Triangle wave.
    Triangle,
    /// Falling sawtooth.
    Sawtooth,
    /// Reserved clipped tangent selector; not synthesized.
    Tan,
    /// Reserved noise selector; not synthesized.
    Noise,
}

impl Waveform {
    /// Maps a numeric shape selector onto a waveform.
    ///
    /// Zero (or NaN) selects a sine, `(0, 1]` a triangle, `(1, 2]` a sawtooth;
    /// larger values land on the reserved tangent and noise selectors.
    #[must_use]
    pub fn from_selector(selector: f32) -> Self {
        if !(selector > 0.0) {
            Self::Sine
        } else if selector <= 1.0 {
            Self::Triangle
        } else if selector <= 2.0 {
            Self::Sawtooth
        } else if selector <= 3.0 {
            Self::Tan
        } else {
            Self::Noise
        }
    }

    /// Reports whether the synthesizer renders this shape.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Sine | Self::Triangle | Self::Sawtooth)
    }

    /// Oscillator value in `[-1, 1]` at `phase` radians.
    ///
    /// Reserved shapes render as a sine.
    #[must_use]
    pub fn oscillate(self, phase: f64) -> f64 {
        match self {
            Self::Triangle => {
                let cycles = phase / TAU;
                1.0 - 4.0 * ((cycles + 0.5).floor() - cycles).abs()
            }
            Self::Sawtooth => 1.0 - ((2.0 * phase / TAU % 2.0 + 2.0) % 2.0),
            Self::Sine | Self::Tan | Self::Noise => phase.sin(),
        }
    }
}

/// Compact parameter set consumed by [`synthesize`].
///
/// Durations are in seconds, frequencies in Hz. Every field has a default so
/// partial definitions are valid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthParams {
    /// Output gain.
    pub volume: f32,
    /// Playback pitch randomness used by [`Sound::play`]; ignored by synthesis.
    pub randomness: f32,
    /// Base frequency.
    pub frequency: f32,
    /// Attack ramp duration.
    pub attack: f32,
    /// Flat sustain duration.
    pub sustain: f32,
    /// Release ramp duration.
    pub release: f32,
    /// Oscillator shape.
    pub shape: Waveform,
    /// Exponent applied to the oscillator magnitude.
    pub shape_curve: f32,
    /// Pitch slide rate.
    pub slide: f32,
    /// Pitch slide acceleration.
    pub delta_slide: f32,
    /// Frequency added once at `pitch_jump_time`.
    pub pitch_jump: f32,
    /// Delay before the pitch jump.
    pub pitch_jump_time: f32,
    /// Period after which pitch and slide reset; zero disables repeats.
    pub repeat_time: f32,
    /// Phase perturbation depth.
    pub noise: f32,
    /// Frequency modulation rate.
    pub modulation: f32,
    /// Sample-and-hold stride in hundredths of a sample; zero disables it.
    pub bit_crush: f32,
    /// Echo delay.
    pub delay: f32,
    /// Envelope level held during sustain.
    pub sustain_volume: f32,
    /// Decay ramp duration.
    pub decay: f32,
    /// Tremolo depth keyed to the repeat period.
    pub tremolo: f32,
    /// Biquad cutoff; positive is high-pass, negative is low-pass, zero bypasses.
    pub filter: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            randomness: 0.0,
            frequency: 220.0,
            attack: 0.0,
            sustain: 0.0,
            release: 0.1,
            shape: Waveform::Sine,
            shape_curve: 1.0,
            slide: 0.0,
            delta_slide: 0.0,
            pitch_jump: 0.0,
            pitch_jump_time: 0.0,
            repeat_time: 0.0,
            noise: 0.0,
            modulation: 0.0,
            bit_crush: 0.0,
            delay: 0.0,
            sustain_volume: 1.0,
            decay: 0.0,
            tremolo: 0.0,
            filter: 0.0,
        }
    }
}

impl SynthParams {
    /// Number of positional slots understood by [`SynthParams::from_slots`].
    pub const SLOT_COUNT: usize = 21;

    /// Builds parameters from the positional tuple layout.
    ///
    /// Slot order is volume, randomness, frequency, attack, sustain, release,
    /// shape, shape curve, slide, delta slide, pitch jump, pitch jump time,
    /// repeat time, noise, modulation, bit crush, delay, sustain volume,
    /// decay, tremolo, filter. `None` and missing trailing slots keep their
    /// defaults; extra slots are ignored.
    #[must_use]
    pub fn from_slots(slots: &[Option<f32>]) -> Self {
        let mut params = Self::default();
        for (index, value) in slots.iter().enumerate() {
            let Some(value) = *value else {
                continue;
            };
            match index {
                0 => params.volume = value,
                1 => params.randomness = value,
                2 => params.frequency = value,
                3 => params.attack = value,
                4 => params.sustain = value,
                5 => params.release = value,
                6 => params.shape = Waveform::from_selector(value),
                7 => params.shape_curve = value,
                8 => params.slide = value,
                9 => params.delta_slide = value,
                10 => params.pitch_jump = value,
                11 => params.pitch_jump_time = value,
                12 => params.repeat_time = value,
                13 => params.noise = value,
                14 => params.modulation = value,
                15 => params.bit_crush = value,
                16 => params.delay = value,
                17 => params.sustain_volume = value,
                18 => params.decay = value,
                19 => params.tremolo = value,
                20 => params.filter = value,
                _ => break,
            }
        }
        params
    }

    /// Number of samples [`synthesize`] produces for these parameters.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        let seconds = f64::from(self.attack)
            + f64::from(self.decay)
            + f64::from(self.sustain)
            + f64::from(self.release)
            + f64::from(self.delay);
        let samples = (seconds * f64::from(SAMPLE_RATE)).floor();
        if samples.is_finite() && samples > 0.0 {
            samples as usize
        } else {
            0
        }
    }
}

/// Low- or high-pass biquad with a fixed quality factor.
#[derive(Debug, Default)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn new(cutoff: f64, sample_rate: f64) -> Self {
        let w = TAU * cutoff.abs() * 2.0 / sample_rate;
        let cos = w.cos();
        let alpha = w.sin() / 2.0 / FILTER_QUALITY;
        let direction = if cutoff < 0.0 { -1.0 } else { 1.0 };
        let a0 = 1.0 + alpha;
        let b0 = (1.0 + direction * cos) / 2.0 / a0;
        Self {
            b0,
            b1: -(direction + cos) / a0,
            b2: b0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            ..Self::default()
        }
    }

    fn process(&mut self, input: f64) -> f64 {
        let output = self.b2 * self.x2 + self.b1 * self.x1 + self.b0 * input
            - self.a2 * self.y2
            - self.a1 * self.y1;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// Renders `params` into a mono buffer at [`SAMPLE_RATE`].
///
/// The buffer holds `floor((attack + decay + sustain + release + delay) *
/// SAMPLE_RATE)` samples scaled by `volume`. Reserved waveforms trip a debug
/// assertion and render as a sine in release builds.
#[must_use]
pub fn synthesize(params: &SynthParams) -> Vec<f32> {
    debug_assert!(
        params.shape.is_supported(),
        "waveform {:?} is reserved and cannot be synthesized",
        params.shape
    );
    let shape = if params.shape.is_supported() {
        params.shape
    } else {
        warn!("reserved waveform {:?} rendered as sine", params.shape);
        Waveform::Sine
    };

    let sample_rate = f64::from(SAMPLE_RATE);
    let length = params.sample_count();

    let volume = f64::from(params.volume);
    let shape_curve = f64::from(params.shape_curve);
    let sustain_volume = f64::from(params.sustain_volume);
    let tremolo = f64::from(params.tremolo);
    let noise = f64::from(params.noise);

    let attack = f64::from(params.attack) * sample_rate;
    let decay = f64::from(params.decay) * sample_rate;
    let sustain = f64::from(params.sustain) * sample_rate;
    let release = f64::from(params.release) * sample_rate;
    let delay = f64::from(params.delay) * sample_rate;

    let start_slide = f64::from(params.slide) * 500.0 * TAU / sample_rate / sample_rate;
    let delta_slide = f64::from(params.delta_slide) * 500.0 * TAU / sample_rate.powi(3);
    let mut slide = start_slide;
    let mut start_frequency = f64::from(params.frequency) * TAU / sample_rate;
    let mut frequency = start_frequency;
    let modulation = f64::from(params.modulation) * TAU / sample_rate;
    let pitch_jump = f64::from(params.pitch_jump) * TAU / sample_rate;
    let pitch_jump_time = f64::from(params.pitch_jump_time) * sample_rate;
    let repeat_time = whole_samples(f64::from(params.repeat_time) * sample_rate);
    let crush_stride = whole_samples(f64::from(params.bit_crush * 100.0));

    let mut filter = (params.filter != 0.0).then(|| Biquad::new(f64::from(params.filter), sample_rate));

    let total = length as f64;
    let mut dry: Vec<f64> = Vec::with_capacity(length);
    let mut samples = Vec::with_capacity(length);

    let mut phase = 0.0_f64;
    let mut modulation_tick = 0.0_f64;
    let mut jump_counter: u64 = 1;
    let mut repeat_counter: usize = 0;
    let mut crush_counter: usize = 0;
    let mut s = 0.0_f64;

    for i in 0..length {
        let index = i as f64;
        crush_counter += 1;
        if crush_stride == 0 || crush_counter % crush_stride == 0 {
            let oscillator = shape.oscillate(phase);

            let envelope = if index < attack {
                index / attack
            } else if index < attack + decay {
                1.0 - ((index - attack) / decay) * (1.0 - sustain_volume)
            } else if index < attack + decay + sustain {
                sustain_volume
            } else if index < total - delay && release > 0.0 {
                (total - index - delay) / release * sustain_volume
            } else {
                0.0
            };

            let tremolo_gain = if repeat_time > 0 {
                1.0 - tremolo + tremolo * (TAU * index / repeat_time as f64).sin()
            } else {
                1.0
            };

            let magnitude = oscillator.abs().powf(shape_curve);
            s = tremolo_gain * signum(oscillator) * magnitude * envelope;

            if delay > 0.0 {
                let echo = if delay > index {
                    0.0
                } else {
                    let fade = if index < total - delay {
                        1.0
                    } else {
                        (total - index) / delay
                    };
                    let source = whole_samples(index - delay);
                    fade * dry.get(source).copied().unwrap_or(0.0) / 2.0
                };
                s = s / 2.0 + echo;
            }

            if let Some(filter) = filter.as_mut() {
                s = filter.process(s);
            }
        }

        dry.push(s);
        samples.push((s * volume) as f32);

        slide += delta_slide;
        frequency += slide;
        let step = frequency * (modulation * modulation_tick).cos();
        modulation_tick += 1.0;
        phase += step + step * noise * index.powi(5).sin();

        if jump_counter > 0 {
            jump_counter += 1;
            if jump_counter as f64 > pitch_jump_time {
                frequency += pitch_jump;
                start_frequency += pitch_jump;
                jump_counter = 0;
            }
        }

        if repeat_time > 0 {
            repeat_counter += 1;
            if repeat_counter % repeat_time == 0 {
                frequency = start_frequency;
                slide = start_slide;
                if jump_counter == 0 {
                    jump_counter = 1;
                }
            }
        }
    }

    samples
}

fn whole_samples(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.floor() as usize
    } else {
        0
    }
}

fn signum(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}
