//! End-to-end rejection scenarios, a handcrafted lacing decode, and the quantified invariants
//! around mux/parse timestamp fidelity, cluster delta bounds, duration, and size-field patching.

use std::io::Cursor;
use std::io::Read;

use webm_codec::io::{ReadFrom, WriteTo};
use webm_codec::prelude::*;
use webm_codec::Error;

#[test]
fn rejects_all_zero_buffer() {
    let err = ParseSession::parse(&[0x00, 0x00, 0x00, 0x00]).unwrap_err();
    assert!(matches!(err, Error::InvalidHeader));
}

#[test]
fn rejects_non_webm_doctype() {
    let ebml = master::Ebml {
        doc_type: Some(DocType::new("matroska")),
        doc_type_read_version: Some(DocTypeReadVersion::new(2)),
        ..Default::default()
    };
    let mut buf = Vec::new();
    ebml.write_to(&mut buf).unwrap();
    let err = ParseSession::parse(&buf).unwrap_err();
    assert!(matches!(err, Error::InvalidHeader));
}

#[test]
fn rejects_unknown_track_handle() {
    // A handle minted by one session is meaningless to another: `other` never registered it.
    let mut source = MuxSession::default();
    let foreign_handle = source.add_video_track(640, 480, "V_VP8").unwrap();

    let mut other = MuxSession::default();
    let err = other
        .write_video_frame(foreign_handle, &[1, 2, 3], 0, true)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn rejects_out_of_order_frame() {
    let mut mux = MuxSession::default();
    let track = mux.add_video_track(640, 480, "V_VP8").unwrap();
    mux.write_video_frame(track, &[1], 100, true).unwrap();
    let err = mux.write_video_frame(track, &[2], 50, true).unwrap_err();
    assert!(matches!(err, Error::OutOfOrderFrame { .. }));
}

#[test]
fn rejects_zero_dimension_video_track() {
    let mut mux = MuxSession::default();
    let err = mux.add_video_track(0, 480, "V_VP8").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn s5_handcrafted_fixed_size_lacing_yields_three_frames() {
    // SimpleBlock body: track number VINT, i16 relative timecode, flags (keyframe + fixed
    // lacing), then a fixed-size lace of 3 frames of 4 bytes each (1 count byte + 12 bytes).
    let mut block = Vec::new();
    VInt64::new(1).write_to(&mut block).unwrap();
    block.extend_from_slice(&0i16.to_be_bytes());
    block.push(0x80 | 0x04); // keyframe, lacing bits 10 = fixed-size
    block.push(2); // 3 frames - 1
    block.extend_from_slice(&[1, 1, 1, 1]);
    block.extend_from_slice(&[2, 2, 2, 2]);
    block.extend_from_slice(&[3, 3, 3, 3]);

    let cluster = master::Cluster {
        timecode: Timecode::new(10),
        blocks: vec![ClusterBlock::from(SimpleBlock::new(block))],
    };

    let frames: Vec<_> = cluster
        .frames(1_000_000)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].payload, &[1, 1, 1, 1]);
    assert_eq!(frames[1].payload, &[2, 2, 2, 2]);
    assert_eq!(frames[2].payload, &[3, 3, 3, 3]);
    for f in &frames {
        assert_eq!(f.track_number, 1);
        assert_eq!(f.timestamp_ns, 10_000_000);
        assert!(f.is_keyframe);
    }
}

#[test]
fn quantified_invariant_mux_parse_timestamp_set_equality() {
    let mut mux = MuxSession::new(Some(1), None);
    let track = mux.add_video_track(320, 240, "V_VP8").unwrap();
    let inputs: Vec<u64> = vec![0, 7, 1_000, 1_000_000, 2_000_000_000];
    for &ts in &inputs {
        mux.write_video_frame(track, &[0xAB], ts, true).unwrap();
    }
    let bytes = mux.finalize().unwrap();

    let parsed = ParseSession::parse(&bytes).unwrap();
    let mut got: Vec<u64> = parsed
        .frame_iterator()
        .unwrap()
        .map(|f| f.unwrap().timestamp_ns)
        .collect();
    got.sort_unstable();
    let mut want = inputs.clone();
    want.sort_unstable();
    assert_eq!(got, want);
}

#[test]
fn quantified_invariant_cluster_delta_bound_and_duration() {
    let mut mux = MuxSession::default(); // 1ms TimecodeScale, 5s soft cap
    let track = mux.add_video_track(640, 480, "V_VP8").unwrap();
    let timestamps_ms: Vec<u64> = vec![0, 1_000, 6_000, 6_500, 40_000];
    for &ms in &timestamps_ms {
        mux.write_video_frame(track, &[0xCD], ms * 1_000_000, true).unwrap();
    }
    let bytes = mux.finalize().unwrap();

    let mut cursor = Cursor::new(&bytes[..]);
    let _ = master::Ebml::read_from(&mut cursor).unwrap();
    let segment = master::Segment::read_from(&mut cursor).unwrap();
    assert!(segment.cluster.len() > 1);

    let scale = segment.info.unwrap().timecode_scale.unwrap().get();
    let mut recovered = Vec::new();
    for cluster in &segment.cluster {
        let base_ticks = cluster.timecode.get();
        for block in &cluster.blocks {
            let ClusterBlock::Simple(simple) = block else {
                panic!("expected only SimpleBlocks");
            };
            let mut body = &simple[..];
            let _track = VInt64::read_from(&mut body).unwrap();
            let mut delta_bytes = [0u8; 2];
            std::io::Read::read_exact(&mut body, &mut delta_bytes).unwrap();
            let delta = i16::from_be_bytes(delta_bytes);
            assert!((-32768..=32767).contains(&delta));
            let ticks = (base_ticks as i64 + delta as i64).max(0) as u64;
            recovered.push(ticks * scale);
        }
    }
    recovered.sort_unstable();
    let mut expected: Vec<u64> = timestamps_ms.iter().map(|ms| ms * 1_000_000).collect();
    expected.sort_unstable();
    assert_eq!(recovered, expected);

    let parsed = ParseSession::parse(&bytes).unwrap();
    let max_expected = *expected.iter().max().unwrap();
    assert_eq!(parsed.duration_ns(), Some(max_expected));
}

#[test]
fn quantified_invariant_size_fields_match_payload_length() {
    let mut mux = MuxSession::default();
    let track = mux.add_audio_track(48_000.0, 2, "A_OPUS").unwrap();
    mux.write_audio_frame(track, &[1, 2, 3, 4], 0).unwrap();
    let bytes = mux.finalize().unwrap();

    let mut cursor = Cursor::new(&bytes[..]);
    let ebml_header = Header::read_from(&mut cursor).unwrap();
    let consumed = std::io::Read::bytes(&mut (&mut cursor).take(*ebml_header.size))
        .count();
    assert_eq!(consumed as u64, *ebml_header.size);

    let segment_header = Header::read_from(&mut cursor).unwrap();
    assert!(!segment_header.size.is_unknown);
    let remaining = bytes.len() as u64 - cursor.position();
    assert_eq!(*segment_header.size, remaining);
}
