//! Element descriptors, IDs and type classification.

// =============================================================================
// Element IDs (raw encoded VINT patterns, marker bits included)
// =============================================================================

/// EBML header element.
pub const EBML: u32 = 0x1A45DFA3;
/// Segment, the root container for all Matroska data.
pub const SEGMENT: u32 = 0x18538067;
/// SeekHead, the index of top-level elements.
pub const SEEK_HEAD: u32 = 0x114D9B74;
/// Segment Info.
pub const INFO: u32 = 0x1549A966;
/// Cluster, the container for block data.
pub const CLUSTER: u32 = 0x1F43B675;
/// Cluster timestamp.
pub const TIMECODE: u32 = 0xE7;
/// SimpleBlock, a block without surrounding group metadata.
pub const SIMPLE_BLOCK: u32 = 0xA3;
/// BlockGroup, a block plus additional info.
pub const BLOCK_GROUP: u32 = 0xA0;
/// Block.
pub const BLOCK: u32 = 0xA1;
/// Block duration.
pub const BLOCK_DURATION: u32 = 0x9B;
/// Reference block.
pub const REFERENCE_BLOCK: u32 = 0xFB;
/// Tracks, the track table.
pub const TRACKS: u32 = 0x1654AE6B;
/// One track entry.
pub const TRACK_ENTRY: u32 = 0xAE;
/// Track number.
pub const TRACK_NUMBER: u32 = 0xD7;
/// Track UID.
pub const TRACK_UID: u32 = 0x73C5;
/// Track type.
pub const TRACK_TYPE: u32 = 0x83;
/// Track name.
pub const NAME: u32 = 0x536E;
/// Codec ID.
pub const CODEC_ID: u32 = 0x86;
/// Codec private data.
pub const CODEC_PRIVATE: u32 = 0x63A2;
/// Audio settings.
pub const AUDIO: u32 = 0xE1;
/// Sampling frequency.
pub const SAMPLING_FREQUENCY: u32 = 0xB5;
/// Output sampling frequency (implicit-rate codecs like SBR AAC).
pub const OUTPUT_SAMPLING_FREQUENCY: u32 = 0x78B5;
/// Channel count.
pub const CHANNELS: u32 = 0x9F;
/// Bits per sample.
pub const BIT_DEPTH: u32 = 0x6264;
/// Production date, inside Segment Info.
pub const DATE_UTC: u32 = 0x4461;
/// Cues (seek index).
pub const CUES: u32 = 0x1C53BB6B;
/// Chapters.
pub const CHAPTERS: u32 = 0x1043A770;
/// Tags.
pub const TAGS: u32 = 0x1254C367;
/// Attachments.
pub const ATTACHMENTS: u32 = 0x1941A469;
/// Void filler element.
pub const VOID: u32 = 0xEC;
/// CRC-32 element.
pub const CRC32: u32 = 0xBF;

/// Semantic identity of an element, derived from its ID.
///
/// IDs the demuxer has no mapping for become [`ElementType::Unknown`] and
/// are skipped by their size, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Ebml,
    Segment,
    SeekHead,
    Info,
    Cluster,
    Timecode,
    SimpleBlock,
    BlockGroup,
    Block,
    BlockDuration,
    ReferenceBlock,
    Tracks,
    TrackEntry,
    TrackNumber,
    TrackUid,
    TrackType,
    Name,
    CodecId,
    CodecPrivate,
    Audio,
    SamplingFrequency,
    OutputSamplingFrequency,
    Channels,
    BitDepth,
    DateUtc,
    Cues,
    Chapters,
    Tags,
    Attachments,
    Void,
    Crc32,
    Unknown,
}

impl ElementType {
    /// Map a raw element ID to its type.
    pub fn from_id(id: u32) -> ElementType {
        match id {
            EBML => ElementType::Ebml,
            SEGMENT => ElementType::Segment,
            SEEK_HEAD => ElementType::SeekHead,
            INFO => ElementType::Info,
            CLUSTER => ElementType::Cluster,
            TIMECODE => ElementType::Timecode,
            SIMPLE_BLOCK => ElementType::SimpleBlock,
            BLOCK_GROUP => ElementType::BlockGroup,
            BLOCK => ElementType::Block,
            BLOCK_DURATION => ElementType::BlockDuration,
            REFERENCE_BLOCK => ElementType::ReferenceBlock,
            TRACKS => ElementType::Tracks,
            TRACK_ENTRY => ElementType::TrackEntry,
            TRACK_NUMBER => ElementType::TrackNumber,
            TRACK_UID => ElementType::TrackUid,
            TRACK_TYPE => ElementType::TrackType,
            NAME => ElementType::Name,
            CODEC_ID => ElementType::CodecId,
            CODEC_PRIVATE => ElementType::CodecPrivate,
            AUDIO => ElementType::Audio,
            SAMPLING_FREQUENCY => ElementType::SamplingFrequency,
            OUTPUT_SAMPLING_FREQUENCY => ElementType::OutputSamplingFrequency,
            CHANNELS => ElementType::Channels,
            BIT_DEPTH => ElementType::BitDepth,
            DATE_UTC => ElementType::DateUtc,
            CUES => ElementType::Cues,
            CHAPTERS => ElementType::Chapters,
            TAGS => ElementType::Tags,
            ATTACHMENTS => ElementType::Attachments,
            VOID => ElementType::Void,
            CRC32 => ElementType::Crc32,
            _ => ElementType::Unknown,
        }
    }

    /// Structural classification of this element's payload.
    pub fn value_type(&self) -> ValueType {
        match self {
            ElementType::Ebml
            | ElementType::Segment
            | ElementType::SeekHead
            | ElementType::Info
            | ElementType::Cluster
            | ElementType::BlockGroup
            | ElementType::Tracks
            | ElementType::TrackEntry
            | ElementType::Audio
            | ElementType::Cues
            | ElementType::Chapters
            | ElementType::Tags
            | ElementType::Attachments => ValueType::Master,
            ElementType::Timecode
            | ElementType::BlockDuration
            | ElementType::TrackNumber
            | ElementType::TrackUid
            | ElementType::TrackType
            | ElementType::Channels
            | ElementType::BitDepth => ValueType::UnsignedInteger,
            ElementType::ReferenceBlock => ValueType::SignedInteger,
            ElementType::SamplingFrequency | ElementType::OutputSamplingFrequency => {
                ValueType::Float
            }
            ElementType::DateUtc => ValueType::Date,
            ElementType::CodecId => ValueType::AsciiString,
            ElementType::Name => ValueType::Utf8String,
            ElementType::SimpleBlock
            | ElementType::Block
            | ElementType::CodecPrivate
            | ElementType::Void
            | ElementType::Crc32 => ValueType::Binary,
            ElementType::Unknown => ValueType::None,
        }
    }
}

/// How an element's payload bytes are to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Container of child elements.
    Master,
    UnsignedInteger,
    SignedInteger,
    Float,
    AsciiString,
    Utf8String,
    Date,
    Binary,
    /// Unmapped element, payload semantics unknown.
    None,
}

/// One EBML element occurrence in the stream.
///
/// Cheap value type, built fresh on every [`EbmlReader::next_element`]
/// call and never mutated.
///
/// [`EbmlReader::next_element`]: crate::ebml::EbmlReader::next_element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatroskaElement {
    id: u32,
    element_type: ElementType,
    depth: u32,
    position: u64,
    header_size: u32,
    data_size: u64,
}

impl MatroskaElement {
    pub(crate) fn new(
        id: u32,
        depth: u32,
        position: u64,
        header_size: u32,
        data_size: u64,
    ) -> MatroskaElement {
        MatroskaElement {
            id,
            element_type: ElementType::from_id(id),
            depth,
            position,
            header_size,
            data_size,
        }
    }

    /// Raw element ID, marker bits included.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Semantic type mapped from the ID.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Payload classification of this element.
    pub fn value_type(&self) -> ValueType {
        self.element_type.value_type()
    }

    /// Nesting level, 0 for top-level elements.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Byte offset of the element's first header byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Size of the ID + size header in bytes.
    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    /// Payload size in bytes.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// Byte offset where the payload starts.
    pub fn data_position(&self) -> u64 {
        self.position.saturating_add(self.header_size as u64)
    }

    /// Byte offset just past the payload, saturating on corrupt sizes so
    /// offsets never wrap.
    pub fn end_position(&self) -> u64 {
        self.data_position().saturating_add(self.data_size)
    }

    /// Bytes of payload left when standing at `position`.
    ///
    /// Zero or negative means the element is exhausted; used both to end
    /// child iteration and to size the trailing frame of a laced block.
    pub fn remaining(&self, position: u64) -> i64 {
        self.end_position() as i64 - position as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_never_panic() {
        assert_eq!(ElementType::from_id(0xDEAD), ElementType::Unknown);
        assert_eq!(ElementType::from_id(0xDEAD).value_type(), ValueType::None);
    }

    #[test]
    fn derived_positions() {
        // Element at offset 100 with a 5-byte header and 672-byte payload.
        let el = MatroskaElement::new(SIMPLE_BLOCK, 2, 100, 5, 672);
        assert_eq!(el.data_position(), 105);
        assert_eq!(el.end_position(), 777);
        assert_eq!(el.remaining(105), 672);
        assert_eq!(el.remaining(777), 0);
        assert_eq!(el.remaining(780), -3);
        assert_eq!(el.element_type(), ElementType::SimpleBlock);
        assert_eq!(el.value_type(), ValueType::Binary);
    }

    #[test]
    fn corrupt_size_saturates_instead_of_wrapping() {
        let el = MatroskaElement::new(SIMPLE_BLOCK, 2, u64::MAX - 10, 5, u64::MAX);
        assert_eq!(el.end_position(), u64::MAX);
        assert!(el.remaining(el.end_position()) <= 0);
    }
}
