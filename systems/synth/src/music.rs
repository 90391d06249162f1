//! Looping background tunes rendered with the synthesizer's oscillators.
//!
//! Every note layers a sine, a triangle and a sawtooth, each detuned by a
//! fraction of a percent, under a shared pluck envelope.

use std::f64::consts::TAU;
use std::str::FromStr;

use thiserror::Error;

use crate::{Waveform, SAMPLE_RATE};

/// Default playback tempo in beats per minute.
pub const TEMPO: f32 = 100.0;

const LAYERS: [Waveform; 3] = [Waveform::Sine, Waveform::Triangle, Waveform::Sawtooth];
const DETUNE_PER_LAYER: f64 = 0.002;

const PEAK_GAIN: f64 = 0.1;
const HOLD_GAIN: f64 = 0.05;
const PEAK_AT: f64 = 0.02;
const HOLD_AT: f64 = 0.15;
const RELEASE_SECONDS: f64 = 0.2;

/// Pitch available to the songs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Note {
    /// Middle C.
    C4,
    /// D above middle C.
    D4,
    /// E above middle C.
    E4,
    /// F above middle C.
    F4,
    /// G above middle C.
    G4,
    /// Concert A, 440 Hz.
    A4,
    /// B flat above middle C.
    Bb4,
    /// B above middle C.
    B4,
    /// C one octave above middle C.
    C5,
    /// D in the fifth octave.
    D5,
    /// E in the fifth octave.
    E5,
    /// F in the fifth octave.
    F5,
    /// G in the fifth octave.
    G5,
}

impl Note {
    /// Fundamental frequency in Hz.
    #[must_use]
    pub const fn frequency(self) -> f32 {
        match self {
            Self::C4 => 261.63,
            Self::D4 => 293.66,
            Self::E4 => 329.63,
            Self::F4 => 349.23,
            Self::G4 => 392.00,
            Self::A4 => 440.00,
            Self::Bb4 => 466.16,
            Self::B4 => 493.88,
            Self::C5 => 523.25,
            Self::D5 => 587.33,
            Self::E5 => 659.25,
            Self::F5 => 698.46,
            Self::G5 => 783.99,
        }
    }
}

/// Built-in background songs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Song {
    /// "Happy Birthday".
    HappyBirthday,
    /// "Twinkle, Twinkle, Little Star".
    Twinkle,
    /// A short lullaby.
    Lullaby,
}

impl Song {
    /// Every song in menu order.
    pub const ALL: [Song; 3] = [Song::HappyBirthday, Song::Twinkle, Song::Lullaby];

    /// Stable lowercase name of the song.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HappyBirthday => "happy-birthday",
            Self::Twinkle => "twinkle",
            Self::Lullaby => "lullaby",
        }
    }

    /// Notes of the song paired with their length in beats.
    #[must_use]
    pub fn notes(self) -> &'static [(Note, f32)] {
        use Note::*;
        match self {
            Self::HappyBirthday => &[
                (C4, 0.5),
                (C4, 0.5),
                (D4, 1.0),
                (C4, 1.0),
                (F4, 1.0),
                (E4, 2.0),
                (C4, 0.5),
                (C4, 0.5),
                (D4, 1.0),
                (C4, 1.0),
                (G4, 1.0),
                (F4, 2.0),
                (C4, 0.5),
                (C4, 0.5),
                (C5, 1.0),
                (A4, 1.0),
                (F4, 1.0),
                (E4, 1.0),
                (D4, 2.0),
                (Bb4, 0.5),
                (Bb4, 0.5),
                (A4, 1.0),
                (F4, 1.0),
                (G4, 1.0),
                (F4, 2.0),
            ],
            Self::Twinkle => &[
                (C4, 1.0),
                (C4, 1.0),
                (G4, 1.0),
                (G4, 1.0),
                (A4, 1.0),
                (A4, 1.0),
                (G4, 2.0),
                (F4, 1.0),
                (F4, 1.0),
                (E4, 1.0),
                (E4, 1.0),
                (D4, 1.0),
                (D4, 1.0),
                (C4, 2.0),
            ],
            Self::Lullaby => &[
                (F4, 1.0),
                (F4, 1.0),
                (C5, 1.0),
                (A4, 1.0),
                (A4, 1.0),
                (F4, 2.0),
                (G4, 1.0),
                (G4, 1.0),
                (F4, 1.0),
                (E4, 1.0),
                (D4, 1.0),
                (C4, 2.0),
            ],
        }
    }

    /// Total song length in beats.
    #[must_use]
    pub fn beats(self) -> f32 {
        self.notes().iter().map(|&(_, beats)| beats).sum()
    }

    /// Song length in seconds at `tempo` beats per minute.
    #[must_use]
    pub fn duration(self, tempo: f32) -> f32 {
        beat_seconds(tempo) * self.beats()
    }
}

impl FromStr for Song {
    type Err = UnknownSong;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|song| song.name() == value)
            .ok_or_else(|| UnknownSong(value.to_owned()))
    }
}

/// Error returned when parsing a [`Song`] from an unknown name.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown song `{0}`")]
pub struct UnknownSong(pub String);

fn beat_seconds(tempo: f32) -> f32 {
    if tempo > 0.0 {
        60.0 / tempo
    } else {
        0.0
    }
}

/// Gain of a note `t` seconds after its onset.
fn note_envelope(t: f64, duration: f64) -> f64 {
    let rise = if t < PEAK_AT {
        t / PEAK_AT * PEAK_GAIN
    } else if t < HOLD_AT {
        PEAK_GAIN - (t - PEAK_AT) / (HOLD_AT - PEAK_AT) * (PEAK_GAIN - HOLD_GAIN)
    } else {
        HOLD_GAIN
    };
    let fall = ((duration - t) / RELEASE_SECONDS * HOLD_GAIN).max(0.0);
    rise.min(fall)
}

/// Renders a single note of `duration` seconds.
#[must_use]
pub fn render_note(note: Note, duration: f32) -> Vec<f32> {
    let sample_rate = f64::from(SAMPLE_RATE);
    let duration = f64::from(duration.max(0.0));
    let length = (duration * sample_rate).floor() as usize;
    let frequency = f64::from(note.frequency());

    (0..length)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let voices: f64 = LAYERS
                .iter()
                .enumerate()
                .map(|(layer, shape)| {
                    let detuned = frequency * (1.0 + layer as f64 * DETUNE_PER_LAYER);
                    shape.oscillate(TAU * detuned * t)
                })
                .sum();
            (voices * note_envelope(t, duration)) as f32
        })
        .collect()
}

/// Renders one pass of `song` at `tempo` beats per minute.
#[must_use]
pub fn render_song(song: Song, tempo: f32) -> Vec<f32> {
    let beat = beat_seconds(tempo);
    song.notes()
        .iter()
        .flat_map(|&(note, beats)| render_note(note, beat * beats))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn songs_parse_from_their_names() {
        for song in Song::ALL {
            assert_eq!(song.name().parse::<Song>(), Ok(song));
        }
        let error = "polka".parse::<Song>().unwrap_err();
        assert_eq!(error.to_string(), "unknown song `polka`");
    }

    #[test]
    fn twinkle_lasts_sixteen_beats() {
        assert!((Song::Twinkle.beats() - 16.0).abs() < f32::EPSILON);
        assert!((Song::Twinkle.duration(TEMPO) - 9.6).abs() < 1e-4);
    }

    #[test]
    fn envelope_starts_and_ends_silent() {
        assert!(note_envelope(0.0, 0.6).abs() < 1e-12);
        assert!(note_envelope(0.6, 0.6).abs() < 1e-12);
        assert!((note_envelope(PEAK_AT, 0.6) - PEAK_GAIN).abs() < 1e-12);
        assert!((note_envelope(0.3, 0.6) - HOLD_GAIN).abs() < 1e-12);
    }

    #[test]
    fn short_notes_release_before_the_hold() {
        // A half beat at the default tempo is shorter than attack plus release.
        let peak = (0..300)
            .map(|step| note_envelope(f64::from(step) / 1_000.0, 0.3))
            .fold(0.0_f64, f64::max);
        assert!(peak <= PEAK_GAIN);
        assert!(note_envelope(0.25, 0.3) < HOLD_GAIN);
    }

    #[test]
    fn rendered_song_is_bounded() {
        let samples = render_song(Song::Lullaby, TEMPO);
        assert!(!samples.is_empty());
        assert!(samples.iter().all(|sample| sample.abs() <= 0.31));
    }
}
