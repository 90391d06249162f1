use std::path::Path;

use anyhow::{Context, Result};
use arcade_racer_synth::{SynthParams, SAMPLE_RATE};
use hound::{SampleFormat, WavSpec, WavWriter};

/// Writes mono 32-bit float samples to `path`.
pub(crate) fn write(path: &Path, samples: &[f32]) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .with_context(|| format!("failed to write samples to {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("failed to finalize {}", path.display()))
}

/// Parses a comma separated parameter list such as `[,,200,.01,.1]`.
///
/// Empty slots keep their defaults.
pub(crate) fn parse_params(csv: &str) -> Result<SynthParams> {
    let trimmed = csv.trim().trim_start_matches('[').trim_end_matches(']');
    let slots = trimmed
        .split(',')
        .enumerate()
        .map(|(index, slot)| {
            let slot = slot.trim();
            if slot.is_empty() {
                return Ok(None);
            }
            slot.parse::<f32>()
                .map(Some)
                .with_context(|| format!("slot {index} is not a number: '{slot}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    if slots.len() > SynthParams::SLOT_COUNT {
        anyhow::bail!(
            "expected at most {} parameters, got {}",
            SynthParams::SLOT_COUNT,
            slots.len()
        );
    }
    Ok(SynthParams::from_slots(&slots))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slots_keep_defaults() {
        let params = parse_params("[,,200,.01,.1,.2]").expect("valid list");
        let defaults = SynthParams::default();
        assert_eq!(params.volume, defaults.volume);
        assert_eq!(params.frequency, 200.0);
        assert_eq!(params.attack, 0.01);
        assert_eq!(params.sustain, 0.1);
        assert_eq!(params.release, 0.2);
    }

    #[test]
    fn garbage_slots_are_reported() {
        let error = parse_params("1,abc").expect_err("not a number");
        assert!(error.to_string().contains("slot 1"));
    }

    #[test]
    fn overlong_lists_are_rejected() {
        let csv = vec!["1"; SynthParams::SLOT_COUNT + 1].join(",");
        assert!(parse_params(&csv).is_err());
    }
}
