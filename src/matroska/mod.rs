//! Matroska-specific demuxing: tracks, blocks and the pull state machine.
//!
//! # Module layout
//!
//! ```text
//! src/matroska/
//! ├── mod.rs      ← re-exports
//! ├── track.rs    ← MatroskaTrack / MatroskaAudioSettings / track selection
//! ├── block.rs    ← MatroskaBlock + lacing decode
//! └── demuxer.rs  ← MatroskaDemuxer, the resumable frame puller
//! ```

pub mod block;
pub mod demuxer;
pub mod track;

pub use block::{Lacing, MatroskaBlock};
pub use demuxer::{DemuxerOptions, MatroskaDemuxer};
pub use track::{MatroskaAudioSettings, MatroskaTrack, TrackSelector, TrackType, default_track_selector};
