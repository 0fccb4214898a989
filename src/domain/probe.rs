//! Parsing of the probe tool's JSON report.

use super::task::ShortInputMetadata;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe output is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("probe output has no video stream")]
    NoVideoStream,

    #[error("malformed probe field `{field}`: {value:?}")]
    Malformed { field: &'static str, value: String },
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    codec_name: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    display_aspect_ratio: String,
    #[serde(default)]
    r_frame_rate: String,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    format_long_name: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    size: String,
}

impl ShortInputMetadata {
    /// Build metadata from `-print_format json -show_format -show_streams` output.
    pub fn from_probe_json(raw: &[u8]) -> Result<Self, ProbeError> {
        let probe: ProbeOutput = serde_json::from_slice(raw)?;

        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type == "video")
            .ok_or(ProbeError::NoVideoStream)?;
        let audio_codec = probe
            .streams
            .iter()
            .find(|s| s.codec_type == "audio")
            .map(|s| s.codec_name.clone())
            .unwrap_or_default();

        // Streamed inputs often report no container size.
        let size = probe.format.size.trim().parse::<u64>().unwrap_or(0);

        let duration = probe
            .format
            .duration
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| ProbeError::Malformed {
                field: "format.duration",
                value: probe.format.duration.clone(),
            })?;

        Ok(Self {
            format: probe.format.format_long_name,
            size,
            video_codec: video.codec_name.clone(),
            height: video.height,
            width: video.width,
            aspect_ratio: video.display_aspect_ratio.clone(),
            fps: parse_frame_rate(&video.r_frame_rate)?,
            audio_codec,
            duration: duration.round() as u64,
        })
    }
}

/// Floor of a rational frame rate such as `30000/1001`.
fn parse_frame_rate(raw: &str) -> Result<u32, ProbeError> {
    let malformed = || ProbeError::Malformed {
        field: "r_frame_rate",
        value: raw.to_string(),
    };

    let (num, den) = match raw.split_once('/') {
        Some((num, den)) => (num, den),
        None => (raw, "1"),
    };
    let num: f64 = num.trim().parse().map_err(|_| malformed())?;
    let den: f64 = den.trim().parse().map_err(|_| malformed())?;
    if den == 0.0 || num < 0.0 {
        return Err(malformed());
    }

    Ok((num / den).floor() as u32)
}
