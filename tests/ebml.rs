//! VINT and Element round-trip checks, plus VINT width boundaries.
//!
//! These exercise the wire-level building blocks directly through the public `io::{ReadFrom,
//! WriteTo}` traits rather than through `ParseSession`/`MuxSession`.

use webm_codec::io::{ReadFrom, WriteTo};
use webm_codec::prelude::*;

#[test]
fn vint_round_trips_every_width() {
    // One representative value per natural encoded width, 1 through 8 bytes.
    let values: &[u64] = &[
        0,
        1,
        0xFF,
        0b1_1111_1111,
        0b11_1111_1111_1111,
        0b111_1111_1111_1111,
        0xFFFF,
        0b1_1111_1111_1111_1111_1111,
        0xFF_FFFF_FFFF_FFFF,
    ];
    for &value in values {
        let vint = VInt64::new(value);
        let mut buf = Vec::new();
        vint.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), VInt64::encode_size(value));

        let decoded = VInt64::read_from(&mut &buf[..]).unwrap();
        assert_eq!(*decoded, value);
        assert!(!decoded.is_unknown);
    }
}

#[test]
fn vint_min_and_max_at_each_width() {
    for width in 1u32..=8 {
        let min = if width == 1 { 0 } else { 1u64 << (7 * (width - 1)) };
        let max = (1u64 << (7 * width)) - 1;
        for value in [min, max] {
            let mut buf = Vec::new();
            VInt64::new(value).write_to(&mut buf).unwrap();
            assert_eq!(buf.len(), width as usize, "value {value} expected width {width}");
            let decoded = VInt64::read_from(&mut &buf[..]).unwrap();
            assert_eq!(*decoded, value);
        }
    }
}

#[test]
fn vint_unknown_round_trips() {
    let vint = VInt64::new_unknown();
    let mut buf = Vec::new();
    vint.write_to(&mut buf).unwrap();
    assert_eq!(buf, vec![0xFF]);

    let decoded = VInt64::read_from(&mut &buf[..]).unwrap();
    assert!(decoded.is_unknown);
}

#[test]
fn header_round_trips() {
    let header = Header {
        id: VInt64::new(0x1234),
        size: VInt64::new(42),
    };
    let mut buf = Vec::new();
    header.write_to(&mut buf).unwrap();
    let decoded = Header::read_from(&mut &buf[..]).unwrap();
    assert_eq!(decoded, header);
}

#[test]
fn element_round_trips_unsigned_leaf() {
    let track_number = TrackNumber::new(7);
    let mut buf = Vec::new();
    track_number.write_to(&mut buf).unwrap();

    let header = Header::read_from(&mut &buf[..]).unwrap();
    assert_eq!(header.id, TrackNumber::ID);
    assert_eq!(*header.size, 1);

    let decoded = TrackNumber::read_from(&mut &buf[..]).unwrap();
    assert_eq!(decoded.get(), 7);
}

#[test]
fn element_round_trips_text_leaf() {
    let codec = CodecId::new("V_VP9");
    let mut buf = Vec::new();
    codec.write_to(&mut buf).unwrap();
    let decoded = CodecId::read_from(&mut &buf[..]).unwrap();
    assert_eq!(&*decoded, "V_VP9");
}

#[test]
fn element_round_trips_binary_payload() {
    let block = SimpleBlock::new(vec![1, 2, 3, 4, 5]);
    let mut buf = Vec::new();
    block.write_to(&mut buf).unwrap();
    let decoded = SimpleBlock::read_from(&mut &buf[..]).unwrap();
    assert_eq!(&decoded[..], &[1, 2, 3, 4, 5]);
}

#[test]
fn element_round_trips_master_container() {
    let ebml = master::Ebml {
        doc_type: Some(DocType::new("webm")),
        doc_type_version: Some(DocTypeVersion::new(2)),
        doc_type_read_version: Some(DocTypeReadVersion::new(2)),
        ..Default::default()
    };
    let mut buf = Vec::new();
    ebml.write_to(&mut buf).unwrap();
    let decoded = master::Ebml::read_from(&mut &buf[..]).unwrap();
    assert_eq!(decoded.doc_type, ebml.doc_type);
    assert_eq!(decoded.doc_type_read_version, ebml.doc_type_read_version);
}
