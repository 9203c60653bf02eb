//! Track descriptors and track selection.

use bytes::Bytes;

/// Kind of stream a track carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackType {
    #[default]
    Unknown,
    Video,
    Audio,
    Complex,
    Logo,
    Subtitle,
    Buttons,
    Control,
    Metadata,
}

impl TrackType {
    /// Map the TrackType element's integer value.
    pub fn from_id(value: u64) -> TrackType {
        match value {
            1 => TrackType::Video,
            2 => TrackType::Audio,
            3 => TrackType::Complex,
            0x10 => TrackType::Logo,
            0x11 => TrackType::Subtitle,
            0x12 => TrackType::Buttons,
            0x20 => TrackType::Control,
            0x21 => TrackType::Metadata,
            _ => TrackType::Unknown,
        }
    }
}

/// Audio parameters from a TrackEntry's Audio subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct MatroskaAudioSettings {
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
    /// Real output frequency for implicit-rate codecs (e.g. SBR AAC).
    pub output_sampling_frequency: Option<f64>,
    /// Channel count.
    pub channels: u32,
    /// Bits per sample, when stated.
    pub bit_depth: Option<u32>,
}

impl Default for MatroskaAudioSettings {
    fn default() -> Self {
        // Matroska's own defaults: 8 kHz mono.
        Self {
            sampling_frequency: 8000.0,
            output_sampling_frequency: None,
            channels: 1,
            bit_depth: None,
        }
    }
}

/// One track parsed from the Tracks table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatroskaTrack {
    /// Track number blocks refer to.
    pub track_number: u64,
    /// Globally unique track ID.
    pub track_uid: u64,
    /// Human-readable name, if present.
    pub name: Option<String>,
    /// Codec identifier, e.g. `A_OPUS` or `A_VORBIS`.
    pub codec_id: String,
    /// Kind of stream.
    pub track_type: TrackType,
    /// Opaque codec initialization data.
    pub codec_private: Option<Bytes>,
    /// Audio parameters, for audio tracks.
    pub audio: Option<MatroskaAudioSettings>,
}

/// Picks the track to demux out of the parsed track table.
///
/// Must return the number of a track that exists; a miss fails the pull
/// with [`MkvError::TrackSelectionFailed`](crate::MkvError::TrackSelectionFailed).
pub type TrackSelector = fn(&[MatroskaTrack]) -> u64;

/// Default selection policy: the first audio track, else track `1`.
///
/// The fallback is a fixed guess, not necessarily a valid track — callers
/// demuxing arbitrary files should supply a defensive selector.
pub fn default_track_selector(tracks: &[MatroskaTrack]) -> u64 {
    tracks
        .iter()
        .find(|track| track.track_type == TrackType::Audio)
        .map(|track| track.track_number)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(number: u64, track_type: TrackType) -> MatroskaTrack {
        MatroskaTrack {
            track_number: number,
            track_type,
            ..MatroskaTrack::default()
        }
    }

    #[test]
    fn selector_prefers_first_audio_track() {
        let tracks = [
            track(1, TrackType::Video),
            track(2, TrackType::Subtitle),
            track(3, TrackType::Audio),
            track(4, TrackType::Audio),
        ];
        assert_eq!(default_track_selector(&tracks), 3);
    }

    #[test]
    fn selector_falls_back_to_one_without_audio() {
        let tracks = [track(1, TrackType::Video), track(2, TrackType::Subtitle)];
        assert_eq!(default_track_selector(&tracks), 1);
        assert_eq!(default_track_selector(&[]), 1);
    }

    #[test]
    fn track_type_mapping() {
        assert_eq!(TrackType::from_id(2), TrackType::Audio);
        assert_eq!(TrackType::from_id(0x11), TrackType::Subtitle);
        assert_eq!(TrackType::from_id(99), TrackType::Unknown);
    }
}
