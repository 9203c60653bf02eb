//! End-to-end demuxing over in-memory Matroska fixtures.

use std::io::Cursor;

use mkvstream::ebml::element::{
    AUDIO, BLOCK, BLOCK_GROUP, CHANNELS, CLUSTER, CODEC_ID, EBML, SAMPLING_FREQUENCY, SEGMENT,
    SIMPLE_BLOCK, TIMECODE, TRACKS, TRACK_ENTRY, TRACK_NUMBER, TRACK_TYPE, TRACK_UID,
};
use mkvstream::ebml::vint;
use mkvstream::{
    DemuxerOptions, MatroskaDemuxer, MkvError, ReadOnlySource, SeekableSource, SharedSource,
    TrackType,
};

/// RUST_LOG-controlled tracing for test runs, e.g. `RUST_LOG=mkvstream=trace`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ─── fixture writer ──────────────────────────────────────────────────────────

fn id_bytes(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(3);
    bytes[start..].to_vec()
}

fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = id_bytes(id);
    let (size, len) = vint::encode(payload.len() as u64);
    out.extend_from_slice(&size[..len as usize]);
    out.extend_from_slice(payload);
    out
}

fn uint_element(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    element(id, &bytes[start..])
}

fn float_element(id: u32, value: f32) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

fn string_element(id: u32, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}

fn audio_track_entry(number: u64, codec: &str) -> Vec<u8> {
    let mut audio = Vec::new();
    audio.extend(float_element(SAMPLING_FREQUENCY, 48000.0));
    audio.extend(uint_element(CHANNELS, 2));

    let mut entry = Vec::new();
    entry.extend(uint_element(TRACK_NUMBER, number));
    entry.extend(uint_element(TRACK_UID, number * 1000));
    entry.extend(uint_element(TRACK_TYPE, 2));
    entry.extend(string_element(CODEC_ID, codec));
    entry.extend(element(AUDIO, &audio));
    element(TRACK_ENTRY, &entry)
}

fn video_track_entry(number: u64) -> Vec<u8> {
    let mut entry = Vec::new();
    entry.extend(uint_element(TRACK_NUMBER, number));
    entry.extend(uint_element(TRACK_UID, number * 1000));
    entry.extend(uint_element(TRACK_TYPE, 1));
    entry.extend(string_element(CODEC_ID, "V_VP9"));
    element(TRACK_ENTRY, &entry)
}

/// SimpleBlock payload with no lacing: one frame for `track`.
fn simple_block(track: u64, frame: &[u8]) -> Vec<u8> {
    let mut payload = vec![0x80 | track as u8, 0x00, 0x00, 0x00];
    payload.extend_from_slice(frame);
    element(SIMPLE_BLOCK, &payload)
}

/// SimpleBlock payload with EBML lacing packing all `frames`.
fn ebml_laced_block(track: u64, frames: &[&[u8]]) -> Vec<u8> {
    let mut payload = vec![0x80 | track as u8, 0x00, 0x00, 0b0000_0110];
    payload.push((frames.len() - 1) as u8);

    // First size as a 2-byte VINT, then biased deltas, last size implied.
    let (first, len) = vint::encode_with_length(frames[0].len() as u64, 2);
    payload.extend_from_slice(&first[..len as usize]);
    for pair in frames.windows(2).take(frames.len() - 2) {
        let delta = pair[1].len() as i64 - pair[0].len() as i64;
        let (bytes, len) = vint::encode_with_length((delta + 8191) as u64, 2);
        payload.extend_from_slice(&bytes[..len as usize]);
    }
    for frame in frames {
        payload.extend_from_slice(frame);
    }
    element(SIMPLE_BLOCK, &payload)
}

fn cluster(timecode: u64, blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = uint_element(TIMECODE, timecode);
    for block in blocks {
        payload.extend_from_slice(block);
    }
    element(CLUSTER, &payload)
}

fn webm_file(track_entries: &[Vec<u8>], clusters: &[Vec<u8>]) -> Vec<u8> {
    let mut tracks = Vec::new();
    for entry in track_entries {
        tracks.extend_from_slice(entry);
    }

    let mut segment = element(TRACKS, &tracks);
    for cl in clusters {
        segment.extend_from_slice(cl);
    }

    let mut file = element(EBML, &string_element(0x4282, "webm"));
    file.extend(element(SEGMENT, &segment));
    file
}

fn test_frame(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn demuxer_over(data: Vec<u8>) -> MatroskaDemuxer<SeekableSource<Cursor<Vec<u8>>>> {
    init_tracing();
    MatroskaDemuxer::new(SeekableSource::new(Cursor::new(data)).unwrap())
}

/// Pull every frame until the stream ends cleanly.
fn drain(demuxer: &mut MatroskaDemuxer<impl mkvstream::ByteSource>) -> Vec<Vec<u8>> {
    let mut buf = vec![0u8; 16 * 1024];
    let mut frames = Vec::new();
    loop {
        let n = demuxer.demux_blocking(&mut buf).unwrap();
        if n == 0 {
            return frames;
        }
        frames.push(buf[..n].to_vec());
    }
}

// ─── scenarios ───────────────────────────────────────────────────────────────

#[test]
fn single_simple_block_no_lacing() {
    let frame = test_frame(672, 7);
    let file = webm_file(
        &[audio_track_entry(1, "A_OPUS")],
        &[cluster(0, &[simple_block(1, &frame)])],
    );

    let mut demuxer = demuxer_over(file);
    let mut buf = vec![0u8; 4096];
    assert_eq!(demuxer.demux_blocking(&mut buf).unwrap(), 672);
    assert_eq!(&buf[..672], &frame[..]);
    assert_eq!(demuxer.demux_blocking(&mut buf).unwrap(), 0);
}

#[test]
fn selected_track_metadata_is_populated() {
    let file = webm_file(
        &[audio_track_entry(1, "A_OPUS")],
        &[cluster(0, &[simple_block(1, &test_frame(64, 0))])],
    );

    let mut demuxer = demuxer_over(file);
    assert!(demuxer.selected_track().is_none());
    let mut buf = vec![0u8; 4096];
    demuxer.demux_blocking(&mut buf).unwrap();

    let track = demuxer.selected_track().unwrap();
    assert_eq!(track.track_number, 1);
    assert_eq!(track.codec_id, "A_OPUS");
    assert_eq!(track.track_type, TrackType::Audio);
    let audio = track.audio.as_ref().unwrap();
    assert_eq!(audio.sampling_frequency, 48000.0);
    assert_eq!(audio.channels, 2);
}

#[test]
fn ebml_lacing_reproduces_frame_sequence() {
    let frames: Vec<Vec<u8>> = [672, 672, 768, 672]
        .iter()
        .enumerate()
        .map(|(i, &len)| test_frame(len, i as u8))
        .collect();
    let frame_refs: Vec<&[u8]> = frames.iter().map(|f| f.as_slice()).collect();

    let file = webm_file(
        &[audio_track_entry(1, "A_OPUS")],
        &[cluster(0, &[ebml_laced_block(1, &frame_refs)])],
    );

    let mut demuxer = demuxer_over(file);
    let produced = drain(&mut demuxer);
    assert_eq!(
        produced.iter().map(|f| f.len()).collect::<Vec<_>>(),
        vec![672, 672, 768, 672]
    );
    assert_eq!(produced, frames);
}

#[test]
fn other_tracks_are_skipped() {
    let audio_frames = [test_frame(100, 1), test_frame(200, 2)];
    let file = webm_file(
        &[video_track_entry(1), audio_track_entry(2, "A_VORBIS")],
        &[cluster(
            0,
            &[
                simple_block(1, &test_frame(4000, 9)),
                simple_block(2, &audio_frames[0]),
                simple_block(1, &test_frame(4000, 10)),
                simple_block(2, &audio_frames[1]),
            ],
        )],
    );

    let mut demuxer = demuxer_over(file);
    let produced = drain(&mut demuxer);
    assert_eq!(produced, audio_frames);
    assert_eq!(demuxer.selected_track().unwrap().track_number, 2);
}

#[test]
fn block_groups_and_multiple_clusters() {
    let frames: Vec<Vec<u8>> = (0..5).map(|i| test_frame(50 + i * 13, i as u8)).collect();

    let group_payload = {
        let mut block = vec![0x81, 0x00, 0x00, 0x00];
        block.extend_from_slice(&frames[1]);
        element(BLOCK, &block)
    };
    let file = webm_file(
        &[audio_track_entry(1, "A_OPUS")],
        &[
            cluster(
                0,
                &[
                    simple_block(1, &frames[0]),
                    element(BLOCK_GROUP, &group_payload),
                    simple_block(1, &frames[2]),
                ],
            ),
            cluster(1000, &[simple_block(1, &frames[3])]),
            cluster(2000, &[simple_block(1, &frames[4])]),
        ],
    );

    let mut demuxer = demuxer_over(file);
    assert_eq!(drain(&mut demuxer), frames);
}

#[test]
fn end_of_stream_repeats_forever() {
    let file = webm_file(
        &[audio_track_entry(1, "A_OPUS")],
        &[cluster(0, &[simple_block(1, &test_frame(32, 0))])],
    );

    let mut demuxer = demuxer_over(file);
    let mut buf = vec![0u8; 4096];
    assert_eq!(demuxer.demux_blocking(&mut buf).unwrap(), 32);
    for _ in 0..5 {
        assert_eq!(demuxer.demux_blocking(&mut buf).unwrap(), 0);
    }
}

#[test]
fn non_seekable_source_produces_identical_frames() {
    let frames: Vec<Vec<u8>> = (0..4).map(|i| test_frame(300 + i * 7, i as u8)).collect();
    let blocks: Vec<Vec<u8>> = frames.iter().map(|f| simple_block(1, f)).collect();
    let file = webm_file(&[audio_track_entry(1, "A_OPUS")], &[cluster(0, &blocks)]);

    let mut seekable = demuxer_over(file.clone());
    let mut forward_only =
        MatroskaDemuxer::new(ReadOnlySource::new(Cursor::new(file)));

    assert_eq!(drain(&mut seekable), drain(&mut forward_only));
}

#[test]
fn short_buffer_fails_loudly_and_is_retryable() {
    let frame = test_frame(672, 3);
    let file = webm_file(
        &[audio_track_entry(1, "A_OPUS")],
        &[cluster(0, &[simple_block(1, &frame)])],
    );

    let mut demuxer = demuxer_over(file);
    let mut small = vec![0u8; 100];
    let err = demuxer.demux_blocking(&mut small).unwrap_err();
    assert!(matches!(
        err,
        MkvError::FrameBufferTooSmall {
            needed: 672,
            capacity: 100
        }
    ));

    // Usage errors do not poison: the same pull succeeds with a real buffer.
    let mut buf = vec![0u8; 4096];
    assert_eq!(demuxer.demux_blocking(&mut buf).unwrap(), 672);
    assert_eq!(&buf[..672], &frame[..]);
}

#[test]
fn missing_ebml_header_is_structural() {
    let mut demuxer = demuxer_over(element(SEGMENT, &[]));
    let mut buf = vec![0u8; 64];
    assert!(matches!(
        demuxer.demux_blocking(&mut buf).unwrap_err(),
        MkvError::MissingEbmlHeader
    ));

    // Structural errors poison the instance.
    assert!(matches!(
        demuxer.demux_blocking(&mut buf).unwrap_err(),
        MkvError::Poisoned
    ));
}

#[test]
fn missing_segment_is_structural() {
    let mut file = element(EBML, &[]);
    file.extend(element(CLUSTER, &[]));
    let mut demuxer = demuxer_over(file);
    let mut buf = vec![0u8; 64];
    assert!(matches!(
        demuxer.demux_blocking(&mut buf).unwrap_err(),
        MkvError::MissingSegment
    ));
}

#[test]
fn selector_miss_fails_track_selection() {
    let file = webm_file(
        &[audio_track_entry(1, "A_OPUS")],
        &[cluster(0, &[simple_block(1, &test_frame(16, 0))])],
    );

    let options = DemuxerOptions::default().with_track_selector(|_| 42);
    let mut demuxer = MatroskaDemuxer::with_options(
        SeekableSource::new(Cursor::new(file)).unwrap(),
        options,
    );
    let mut buf = vec![0u8; 64];
    assert!(matches!(
        demuxer.demux_blocking(&mut buf).unwrap_err(),
        MkvError::TrackSelectionFailed { track_number: 42 }
    ));
}

#[test]
fn demuxer_refuses_to_seek() {
    let file = webm_file(&[audio_track_entry(1, "A_OPUS")], &[]);
    let mut demuxer = demuxer_over(file);
    assert!(!demuxer.can_seek());
    assert!(matches!(
        demuxer.seek(0).unwrap_err(),
        MkvError::Unsupported(_)
    ));
}

#[test]
fn close_returns_source_when_kept() {
    let file = webm_file(&[audio_track_entry(1, "A_OPUS")], &[]);
    let options = DemuxerOptions::default().keep_source_on_close();
    let demuxer = MatroskaDemuxer::with_options(
        SeekableSource::new(Cursor::new(file.clone())).unwrap(),
        options,
    );
    assert!(demuxer.close().is_some());

    let disposing = MatroskaDemuxer::new(SeekableSource::new(Cursor::new(file)).unwrap());
    assert!(disposing.close().is_none());
}

#[test]
fn try_clone_shares_the_source_and_hands_off_disposal() {
    init_tracing();
    let frames: Vec<Vec<u8>> = (0..2).map(|i| test_frame(96 + i * 5, i as u8)).collect();
    let blocks: Vec<Vec<u8>> = frames.iter().map(|f| simple_block(1, f)).collect();
    let file = webm_file(&[audio_track_entry(1, "A_OPUS")], &[cluster(0, &blocks)]);

    let source = SharedSource::new(SeekableSource::new(Cursor::new(file)).unwrap());
    let mut original = MatroskaDemuxer::new(source);
    let mut buf = vec![0u8; 4096];
    assert_eq!(original.demux_blocking(&mut buf).unwrap(), frames[0].len());

    // The clone resumes from the same parse state over the same bytes.
    let mut clone = original.try_clone();
    assert_eq!(clone.demux_blocking(&mut buf).unwrap(), frames[1].len());
    assert_eq!(&buf[..frames[1].len()], &frames[1][..]);
    assert_eq!(original.demux_blocking(&mut buf).unwrap(), frames[1].len());
    assert_eq!(&buf[..frames[1].len()], &frames[1][..]);

    // The original gave up disposal; only the clone swallows the source.
    assert!(original.close().is_some());
    assert!(clone.close().is_none());
}

#[tokio::test]
async fn async_pull_matches_blocking_pull() {
    init_tracing();
    let frames: Vec<Vec<u8>> = (0..3).map(|i| test_frame(128 + i * 17, i as u8)).collect();
    let blocks: Vec<Vec<u8>> = frames.iter().map(|f| simple_block(1, f)).collect();
    let file = webm_file(&[audio_track_entry(1, "A_OPUS")], &[cluster(0, &blocks)]);

    let source = mkvstream::AsyncSource::new(Cursor::new(file.clone())).await.unwrap();
    let mut demuxer = MatroskaDemuxer::new(source);

    let mut buf = vec![0u8; 4096];
    let mut produced = Vec::new();
    loop {
        let n = demuxer.demux(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        produced.push(buf[..n].to_vec());
    }
    assert_eq!(produced, frames);
}
