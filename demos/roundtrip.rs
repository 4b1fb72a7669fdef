//! Mux a tiny two-track WebM document in memory, then parse it back and print what
//! `ParseSession` sees. Run with `cargo run --example roundtrip`.

use webm_codec::prelude::*;

fn main() {
    let mut mux = MuxSession::new(None, None);

    let video = mux.add_video_track(640, 480, "V_VP8").unwrap();
    let audio = mux.add_audio_track(48_000.0, 2, "A_OPUS").unwrap();

    // A keyframe, then a delta frame 33ms later, interleaved with one audio frame.
    mux.write_video_frame(video, &[0x30, 0x00, 0x00], 0, true)
        .unwrap();
    mux.write_audio_frame(audio, &[0xFC, 0xFF, 0xFE], 0)
        .unwrap();
    mux.write_video_frame(video, &[0x31, 0x00, 0x01], 33_000_000, false)
        .unwrap();

    let bytes = mux.finalize().unwrap();
    println!("muxed {} bytes", bytes.len());

    let parsed = ParseSession::parse(&bytes).unwrap();
    println!(
        "doc_type={} tracks={} duration_ns={:?}",
        parsed.ebml_header().doc_type,
        parsed.track_count(),
        parsed.duration_ns()
    );

    for track in parsed.tracks() {
        println!(
            "  track {} codec={} kind={:?}",
            track.track_number, track.codec_id, track.kind
        );
    }

    for frame in parsed.frame_iterator().unwrap() {
        let frame = frame.unwrap();
        println!(
            "frame: track={} ts_ns={} keyframe={} bytes={}",
            frame.track_number,
            frame.timestamp_ns,
            frame.is_keyframe,
            frame.payload.len()
        );
    }
}
