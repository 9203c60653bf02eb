//! The resumable Matroska demuxer.
//!
//! `MatroskaDemuxer` walks Segment → Cluster → BlockGroup → Block → frame
//! and hands back exactly one frame per pull. It remembers the innermost
//! pending element between calls and resumes there, climbing one level at a
//! time when the current level runs out — a pull costs O(depth), never a
//! re-walk from the Segment root.
//!
//! All pulls against one instance must be sequential; parse state is plain
//! mutable fields with no internal synchronization.

use tracing::{debug, trace};

use crate::ebml::element::{ElementType, MatroskaElement};
use crate::ebml::reader::EbmlReader;
use crate::error::{MkvError, Result};
use crate::matroska::block::MatroskaBlock;
use crate::matroska::track::{
    MatroskaAudioSettings, MatroskaTrack, TrackSelector, TrackType, default_track_selector,
};
use crate::source::ByteSource;

/// Construction options for [`MatroskaDemuxer`].
#[derive(Debug, Clone, Copy)]
pub struct DemuxerOptions {
    /// Picks the track to demux once the track table is parsed.
    pub track_selector: TrackSelector,
    /// Whether [`MatroskaDemuxer::close`] swallows the source instead of
    /// returning it.
    pub dispose_source_on_close: bool,
}

impl Default for DemuxerOptions {
    fn default() -> Self {
        Self {
            track_selector: default_track_selector,
            dispose_source_on_close: true,
        }
    }
}

impl DemuxerOptions {
    /// Replace the track selection policy.
    pub fn with_track_selector(mut self, selector: TrackSelector) -> Self {
        self.track_selector = selector;
        self
    }

    /// Keep the source alive past [`MatroskaDemuxer::close`].
    pub fn keep_source_on_close(mut self) -> Self {
        self.dispose_source_on_close = false;
        self
    }
}

/// Streaming demuxer pulling one encoded frame per call.
///
/// The demuxer itself never supports seeking: once frames flow, the only
/// movement is forward. Construction is cheap — the EBML header, Segment
/// and track table are parsed lazily on the first pull.
#[derive(Clone)]
pub struct MatroskaDemuxer<S> {
    reader: EbmlReader<S>,
    options: DemuxerOptions,
    initialized: bool,
    poisoned: bool,
    segment: Option<MatroskaElement>,
    cluster: Option<MatroskaElement>,
    block_group: Option<MatroskaElement>,
    block: Option<MatroskaBlock>,
    frame_index: usize,
    selected: Option<MatroskaTrack>,
}

impl<S: ByteSource> MatroskaDemuxer<S> {
    /// Create a demuxer with default options.
    pub fn new(source: S) -> MatroskaDemuxer<S> {
        Self::with_options(source, DemuxerOptions::default())
    }

    /// Create a demuxer with explicit options.
    pub fn with_options(source: S, options: DemuxerOptions) -> MatroskaDemuxer<S> {
        MatroskaDemuxer {
            reader: EbmlReader::new(source),
            options,
            initialized: false,
            poisoned: false,
            segment: None,
            cluster: None,
            block_group: None,
            block: None,
            frame_index: 0,
            selected: None,
        }
    }

    /// The track being demuxed, available after the first successful pull.
    pub fn selected_track(&self) -> Option<&MatroskaTrack> {
        self.selected.as_ref()
    }

    /// Demuxers never support random access, regardless of the source.
    pub fn can_seek(&self) -> bool {
        false
    }

    /// Seeking the demuxed timeline is unsupported, always an error.
    pub fn seek(&mut self, _position: u64) -> Result<u64> {
        Err(MkvError::Unsupported(
            "seeking is not supported once demuxing starts",
        ))
    }

    /// Pull the next frame of the selected track into `buf`.
    ///
    /// Returns the frame length, or `0` at the clean end of the stream
    /// (and on every call after). The buffer must hold the whole frame;
    /// a short buffer fails with [`MkvError::FrameBufferTooSmall`] before
    /// any bytes are consumed, so the pull may be retried.
    pub async fn demux(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.poisoned {
            return Err(MkvError::Poisoned);
        }
        match self.demux_inner(buf).await {
            Ok(written) => Ok(written),
            Err(err) => {
                if err.is_fatal() {
                    self.poisoned = true;
                }
                Err(err)
            }
        }
    }

    /// Blocking variant of [`demux`](Self::demux).
    ///
    /// Drives the async core on the calling thread; use it with the
    /// blocking source adapters, whose reads never suspend.
    pub fn demux_blocking(&mut self, buf: &mut [u8]) -> Result<usize> {
        futures::executor::block_on(self.demux(buf))
    }

    /// Split off a second demuxer over the same underlying source.
    ///
    /// Both instances share the source's bytes (use a
    /// [`SharedSource`](crate::source::SharedSource) so they share the
    /// offset too); the original gives up disposal of the source so only
    /// one of the two swallows it on close.
    pub fn try_clone(&mut self) -> MatroskaDemuxer<S>
    where
        S: Clone,
    {
        let cloned = self.clone();
        self.options.dispose_source_on_close = false;
        cloned
    }

    /// Tear down the demuxer.
    ///
    /// Returns the source for reuse unless the options asked for disposal.
    pub fn close(self) -> Option<S> {
        if self.options.dispose_source_on_close {
            None
        } else {
            Some(self.reader.into_source())
        }
    }

    async fn demux_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_initialized().await?;

        loop {
            // Innermost level first: a block with unread frames.
            if let Some(block) = &self.block {
                if self.frame_index < block.frame_count() {
                    let size = block.frame_size(self.frame_index) as usize;
                    if buf.len() < size {
                        return Err(MkvError::FrameBufferTooSmall {
                            needed: size,
                            capacity: buf.len(),
                        });
                    }
                    self.reader.read_exact(&mut buf[..size]).await?;
                    self.frame_index += 1;
                    return Ok(size);
                }
                self.block = None;
                self.frame_index = 0;
            }

            // A pending BlockGroup: scan its children for the Block.
            if let Some(group) = self.block_group {
                match self.reader.next_element(Some(&group)).await? {
                    Some(child) if child.element_type() == ElementType::Block => {
                        if self.try_read_block(&child).await? {
                            continue;
                        }
                        self.reader.seek_to(child.end_position()).await?;
                    }
                    Some(child) => self.reader.skip_element(&child).await?,
                    None => self.block_group = None,
                }
                continue;
            }

            // A pending Cluster: blocks may sit bare or inside groups.
            if let Some(cluster) = self.cluster {
                match self.reader.next_element(Some(&cluster)).await? {
                    Some(child) => match child.element_type() {
                        ElementType::SimpleBlock => {
                            if self.try_read_block(&child).await? {
                                continue;
                            }
                            self.reader.seek_to(child.end_position()).await?;
                        }
                        ElementType::BlockGroup => {
                            trace!(position = child.position(), "entering block group");
                            self.block_group = Some(child);
                        }
                        _ => self.reader.skip_element(&child).await?,
                    },
                    None => self.cluster = None,
                }
                continue;
            }

            // Top of the hierarchy: the next Cluster in the Segment.
            let Some(segment) = self.segment else {
                return Ok(0);
            };
            match self.reader.next_element(Some(&segment)).await? {
                Some(child) if child.element_type() == ElementType::Cluster => {
                    trace!(position = child.position(), "entering cluster");
                    self.cluster = Some(child);
                }
                Some(child) => self.reader.skip_element(&child).await?,
                None => return Ok(0),
            }
        }
    }

    /// Parse a Block/SimpleBlock child; `true` when it matched the
    /// selected track and became the pending block.
    async fn try_read_block(&mut self, child: &MatroskaElement) -> Result<bool> {
        let Some(selected) = self.selected.as_ref().map(|t| t.track_number) else {
            return Ok(false);
        };
        match MatroskaBlock::read(&mut self.reader, child, selected).await? {
            Some(block) => {
                trace!(
                    frames = block.frame_count(),
                    lacing = ?block.lacing(),
                    "block matched selected track"
                );
                self.block = Some(block);
                self.frame_index = 0;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// First-pull initialization: EBML header, Segment, track table, and
    /// the first Cluster.
    async fn ensure_initialized(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let header = self
            .reader
            .next_element(None)
            .await?
            .filter(|el| el.element_type() == ElementType::Ebml)
            .ok_or(MkvError::MissingEbmlHeader)?;
        self.reader.skip_element(&header).await?;

        let segment = self
            .reader
            .next_element(None)
            .await?
            .filter(|el| el.element_type() == ElementType::Segment)
            .ok_or(MkvError::MissingSegment)?;
        debug!(
            position = segment.position(),
            size = segment.data_size(),
            "segment found"
        );

        // Walk the segment's direct children up to the first cluster,
        // parsing the track table on the way.
        loop {
            match self.reader.next_element(Some(&segment)).await? {
                Some(child) if child.element_type() == ElementType::Tracks => {
                    self.parse_tracks(&child).await?;
                }
                Some(child) if child.element_type() == ElementType::Cluster => {
                    self.cluster = Some(child);
                    break;
                }
                Some(child) => {
                    trace!(element = ?child.element_type(), "skipping segment child");
                    self.reader.skip_element(&child).await?;
                }
                None => break,
            }
        }

        self.segment = Some(segment);
        self.initialized = true;
        Ok(())
    }

    /// Parse the Tracks table and run track selection.
    async fn parse_tracks(&mut self, tracks_element: &MatroskaElement) -> Result<()> {
        let mut tracks = Vec::new();
        loop {
            match self.reader.next_element(Some(tracks_element)).await? {
                Some(child) if child.element_type() == ElementType::TrackEntry => {
                    tracks.push(self.parse_track_entry(&child).await?);
                }
                Some(child) => self.reader.skip_element(&child).await?,
                None => break,
            }
        }
        debug!(count = tracks.len(), "parsed track table");

        let chosen = (self.options.track_selector)(&tracks);
        let selected = tracks
            .into_iter()
            .find(|track| track.track_number == chosen)
            .ok_or(MkvError::TrackSelectionFailed {
                track_number: chosen,
            })?;
        debug!(
            track = selected.track_number,
            codec = %selected.codec_id,
            "selected track"
        );
        self.selected = Some(selected);
        Ok(())
    }

    async fn parse_track_entry(&mut self, entry: &MatroskaElement) -> Result<MatroskaTrack> {
        let mut track = MatroskaTrack::default();
        loop {
            match self.reader.next_element(Some(entry)).await? {
                Some(child) => match child.element_type() {
                    ElementType::TrackNumber => {
                        track.track_number = self.reader.read_unsigned_value(&child).await?;
                    }
                    ElementType::TrackUid => {
                        track.track_uid = self.reader.read_unsigned_value(&child).await?;
                    }
                    ElementType::Name => {
                        track.name = Some(self.reader.read_string_value(&child).await?);
                    }
                    ElementType::CodecId => {
                        track.codec_id = self.reader.read_ascii_value(&child).await?;
                    }
                    ElementType::TrackType => {
                        let id = self.reader.read_unsigned_value(&child).await?;
                        track.track_type = TrackType::from_id(id);
                    }
                    ElementType::CodecPrivate => {
                        track.codec_private =
                            Some(self.reader.read_binary_value(&child).await?);
                    }
                    ElementType::Audio => {
                        track.audio = Some(self.parse_audio_settings(&child).await?);
                    }
                    _ => self.reader.skip_element(&child).await?,
                },
                None => break,
            }
        }
        Ok(track)
    }

    async fn parse_audio_settings(
        &mut self,
        audio: &MatroskaElement,
    ) -> Result<MatroskaAudioSettings> {
        let mut settings = MatroskaAudioSettings::default();
        loop {
            match self.reader.next_element(Some(audio)).await? {
                Some(child) => match child.element_type() {
                    ElementType::SamplingFrequency => {
                        settings.sampling_frequency =
                            self.reader.read_float_value(&child).await?;
                    }
                    ElementType::OutputSamplingFrequency => {
                        settings.output_sampling_frequency =
                            Some(self.reader.read_float_value(&child).await?);
                    }
                    ElementType::Channels => {
                        settings.channels =
                            self.reader.read_unsigned_value(&child).await? as u32;
                    }
                    ElementType::BitDepth => {
                        settings.bit_depth =
                            Some(self.reader.read_unsigned_value(&child).await? as u32);
                    }
                    _ => self.reader.skip_element(&child).await?,
                },
                None => break,
            }
        }
        Ok(settings)
    }
}
