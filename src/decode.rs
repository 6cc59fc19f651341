//! Audio file decoding
//!
//! Decodes any format symphonia supports into a mono [`AudioBuffer`].

use crate::model::AudioBuffer;
use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Longest audio decoded by default, in seconds
pub const DEFAULT_MAX_SECS: u32 = 600;

/// Decode an audio file to mono, up to [`DEFAULT_MAX_SECS`]
pub fn load_audio_file(path: &Path) -> Result<AudioBuffer> {
    load_audio_file_with_limit(path, DEFAULT_MAX_SECS)
}

/// Decode an audio file to mono, keeping at most `max_secs` seconds
pub fn load_audio_file_with_limit(path: &Path, max_secs: u32) -> Result<AudioBuffer> {
    log::debug!("Decoding audio file: {:?}", path);

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {:?}", path))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(ext.to_str().unwrap_or(""));
    }

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .with_context(|| format!("Failed to probe audio format: {:?}", path))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("No sample rate in audio track")?;

    let dec_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .context("Failed to create audio decoder")?;

    let mut all_samples: Vec<f32> = Vec::new();
    let max_samples = sample_rate as usize * max_secs as usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to read audio packet after {} samples: {:?}",
                        all_samples.len(),
                        path
                    )
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Error decoding packet: {:?}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let duration = decoded.capacity() as u64;

        let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let samples = sample_buf.samples();

        // Convert to mono if stereo
        let channels = spec.channels.count();
        if channels > 1 {
            for chunk in samples.chunks(channels) {
                let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                all_samples.push(mono);
            }
        } else {
            all_samples.extend_from_slice(samples);
        }

        if all_samples.len() >= max_samples {
            all_samples.truncate(max_samples);
            log::info!("Audio truncated to {}s", max_secs);
            break;
        }
    }

    log::info!(
        "Decoded {} samples ({:.1}s) at {}Hz from {:?}",
        all_samples.len(),
        all_samples.len() as f32 / sample_rate as f32,
        sample_rate,
        path
    );

    Ok(AudioBuffer::new(all_samples, sample_rate)?)
}
