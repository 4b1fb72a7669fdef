//! Assembles a WebM byte buffer from caller-supplied track declarations and frames.

use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::base::{Header, VInt64};
use crate::element::Element;
use crate::functional::*;
use crate::leaf::*;
use crate::master;
use crate::registry::{AudioCodec, VideoCodec};
use crate::{Error, Result};

const MAX_CLUSTER_DELTA_TICKS: i64 = 32_767;
const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;
const DEFAULT_SOFT_CAP: StdDuration = StdDuration::from_secs(5);
const APP_NAME: &str = "webm-codec";

/// Opaque handle to a track registered with a [`MuxSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MuxTrackHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    TracksOpen,
    FramesAccepted,
    Finalized,
}

struct TrackRegistration {
    handle: MuxTrackHandle,
    track_number: u64,
    last_timestamp_ns: Option<u64>,
    wire: master::TrackEntry,
}

struct ClusterInFlight {
    size_patch_offset: usize,
    payload_start: usize,
    base_ticks: u64,
}

/// Accepts track declarations and frames, emitting a spec-compliant WebM byte stream.
///
/// Follows `Idle -> TracksOpen -> FramesAccepted -> Finalized`: tracks may only be added in
/// `Idle`/`TracksOpen`, the first frame write moves the session to `FramesAccepted`, and
/// `finalize` is valid from `TracksOpen` or `FramesAccepted` onward.
pub struct MuxSession {
    state: State,
    timecode_scale: u64,
    cluster_soft_cap_ticks: u64,
    output: Vec<u8>,
    header_written: bool,
    segment_size_patch: (usize, usize),
    duration_patch_offset: usize,
    tracks: Vec<TrackRegistration>,
    next_handle: u32,
    current_cluster: Option<ClusterInFlight>,
    max_timestamp_ns: u64,
    finalized: Option<Vec<u8>>,
}

impl Default for MuxSession {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl MuxSession {
    /// Creates a new session. `timecode_scale` defaults to 1,000,000 (1ms/tick) and
    /// `cluster_soft_cap` defaults to 5 seconds of media per cluster.
    pub fn new(timecode_scale: Option<u64>, cluster_soft_cap: Option<StdDuration>) -> Self {
        let timecode_scale = timecode_scale.filter(|&t| t > 0).unwrap_or(DEFAULT_TIMECODE_SCALE);
        let soft_cap_ns = cluster_soft_cap.unwrap_or(DEFAULT_SOFT_CAP).as_nanos() as u64;
        let cluster_soft_cap_ticks = ((soft_cap_ns / timecode_scale) as i64)
            .clamp(1, MAX_CLUSTER_DELTA_TICKS) as u64;

        Self {
            state: State::Idle,
            timecode_scale,
            cluster_soft_cap_ticks,
            output: Vec::new(),
            header_written: false,
            segment_size_patch: (0, 0),
            duration_patch_offset: 0,
            tracks: Vec::new(),
            next_handle: 1,
            current_cluster: None,
            max_timestamp_ns: 0,
            finalized: None,
        }
    }

    /// Registers a video track. Fails if dimensions are zero, `codec_id` is not a registered
    /// video codec, or a frame has already been written.
    pub fn add_video_track(
        &mut self,
        pixel_width: u32,
        pixel_height: u32,
        codec_id: &str,
    ) -> Result<MuxTrackHandle> {
        self.ensure_can_add_track()?;
        if pixel_width == 0 || pixel_height == 0 {
            return Err(Error::InvalidArgument("video track dimensions must be non-zero"));
        }
        let codec = VideoCodec::from_str(codec_id)
            .map_err(|_| Error::UnsupportedCodec(codec_id.to_string()))?;

        let track_number = self.tracks.len() as u64 + 1;
        let handle = self.allocate_handle();
        let wire = master::TrackEntry {
            track_number: TrackNumber::new(track_number),
            track_type: TrackType::new(1),
            codec_id: CodecId::new(codec.as_str()),
            video: Some(master::Video {
                pixel_width: PixelWidth::new(pixel_width as u64),
                pixel_height: PixelHeight::new(pixel_height as u64),
            }),
            ..Default::default()
        };

        self.tracks.push(TrackRegistration {
            handle,
            track_number,
            last_timestamp_ns: None,
            wire,
        });
        self.state = State::TracksOpen;
        Ok(handle)
    }

    /// Registers an audio track. Fails if `sampling_frequency` or `channels` is zero,
    /// `codec_id` is not a registered audio codec, or a frame has already been written.
    pub fn add_audio_track(
        &mut self,
        sampling_frequency: f64,
        channels: u32,
        codec_id: &str,
    ) -> Result<MuxTrackHandle> {
        self.ensure_can_add_track()?;
        if sampling_frequency <= 0.0 || channels == 0 {
            return Err(Error::InvalidArgument(
                "audio sampling frequency and channel count must be non-zero",
            ));
        }
        let codec = AudioCodec::from_str(codec_id)
            .map_err(|_| Error::UnsupportedCodec(codec_id.to_string()))?;

        let track_number = self.tracks.len() as u64 + 1;
        let handle = self.allocate_handle();
        let wire = master::TrackEntry {
            track_number: TrackNumber::new(track_number),
            track_type: TrackType::new(2),
            codec_id: CodecId::new(codec.as_str()),
            audio: Some(master::Audio {
                sampling_frequency: SamplingFrequency::new(sampling_frequency),
                channels: Channels::new(channels as u64),
                bit_depth: None,
            }),
            ..Default::default()
        };

        self.tracks.push(TrackRegistration {
            handle,
            track_number,
            last_timestamp_ns: None,
            wire,
        });
        self.state = State::TracksOpen;
        Ok(handle)
    }

    /// Writes a video frame. Fails if the payload is empty, the handle is unknown, or
    /// `timestamp_ns` is strictly less than the last timestamp written to this track.
    pub fn write_video_frame(
        &mut self,
        handle: MuxTrackHandle,
        payload: &[u8],
        timestamp_ns: u64,
        is_keyframe: bool,
    ) -> Result<()> {
        self.write_frame(handle, payload, timestamp_ns, is_keyframe)
    }

    /// Writes an audio frame. `is_keyframe` is implicitly true.
    pub fn write_audio_frame(
        &mut self,
        handle: MuxTrackHandle,
        payload: &[u8],
        timestamp_ns: u64,
    ) -> Result<()> {
        self.write_frame(handle, payload, timestamp_ns, true)
    }

    fn write_frame(
        &mut self,
        handle: MuxTrackHandle,
        payload: &[u8],
        timestamp_ns: u64,
        is_keyframe: bool,
    ) -> Result<()> {
        if self.state == State::Finalized {
            return Err(Error::InvalidArgument("session already finalized"));
        }
        if payload.is_empty() {
            return Err(Error::InvalidArgument("frame payload must not be empty"));
        }
        let track_idx = self
            .tracks
            .iter()
            .position(|t| t.handle == handle)
            .ok_or(Error::InvalidArgument("unknown track handle"))?;

        if let Some(last) = self.tracks[track_idx].last_timestamp_ns {
            if timestamp_ns < last {
                return Err(Error::OutOfOrderFrame {
                    track: self.tracks[track_idx].track_number,
                    timestamp_ns,
                    last_ns: last,
                });
            }
        }

        self.ensure_header_written()?;
        self.state = State::FramesAccepted;

        let ticks = timestamp_ns / self.timecode_scale;
        self.open_or_continue_cluster(ticks)?;

        let track_number = self.tracks[track_idx].track_number;
        let base_ticks = self.current_cluster.as_ref().unwrap().base_ticks;
        let delta = (ticks as i64 - base_ticks as i64) as i16;

        let mut block = Vec::new();
        VInt64::new(track_number).encode(&mut block)?;
        block.extend_from_slice(&delta.to_be_bytes());
        block.push(if is_keyframe { 0x80 } else { 0x00 });
        block.extend_from_slice(payload);

        let header = Header {
            id: SimpleBlock::ID,
            size: VInt64::new(block.len() as u64),
        };
        header.encode(&mut self.output)?;
        self.output.append_slice(&block);

        self.tracks[track_idx].last_timestamp_ns = Some(timestamp_ns);
        self.max_timestamp_ns = self.max_timestamp_ns.max(timestamp_ns);
        Ok(())
    }

    /// Closes the current cluster, patches every reserved size field, and returns the complete
    /// WebM byte stream. Safe to call more than once; later calls return the same bytes.
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        if let Some(bytes) = &self.finalized {
            return Ok(bytes.clone());
        }
        if self.state == State::Idle {
            return Err(Error::InvalidArgument(
                "cannot finalize a session with no tracks",
            ));
        }

        self.ensure_header_written()?;
        self.close_current_cluster()?;

        let segment_actual = self.output.len() - self.segment_size_patch.1;
        let segment_size = encode_reserved_vint(segment_actual as u64, self.segment_size_patch.1 - self.segment_size_patch.0)?;
        self.output.set_slice(self.segment_size_patch.0, &segment_size);

        let duration_ticks = self.max_timestamp_ns as f64 / self.timecode_scale as f64;
        self.output
            .set_slice(self.duration_patch_offset, &duration_ticks.to_be_bytes());

        self.state = State::Finalized;
        let bytes = std::mem::take(&mut self.output);
        self.finalized = Some(bytes.clone());
        Ok(bytes)
    }

    fn ensure_can_add_track(&self) -> Result<()> {
        match self.state {
            State::Idle | State::TracksOpen => Ok(()),
            State::FramesAccepted | State::Finalized => Err(Error::InvalidArgument(
                "cannot add a track after frames have been written",
            )),
        }
    }

    fn allocate_handle(&mut self) -> MuxTrackHandle {
        let handle = MuxTrackHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn ensure_header_written(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }

        let ebml = master::Ebml {
            ebml_version: Some(EbmlVersion::new(1)),
            ebml_read_version: Some(EbmlReadVersion::new(1)),
            ebml_max_id_length: Some(EbmlMaxIdLength::new(4)),
            ebml_max_size_length: Some(EbmlMaxSizeLength::new(8)),
            doc_type: Some(DocType::new("webm")),
            doc_type_version: Some(DocTypeVersion::new(2)),
            doc_type_read_version: Some(DocTypeReadVersion::new(2)),
        };
        ebml.encode(&mut self.output)?;

        master::Segment::ID.encode(&mut self.output)?;
        let size_offset = self.output.len();
        self.output.append_slice(&[0u8; 8]);
        let payload_start = self.output.len();
        self.segment_size_patch = (size_offset, payload_start);

        self.write_segment_info()?;
        self.write_tracks_element()?;

        self.header_written = true;
        log::debug!("muxer header written: {} track(s)", self.tracks.len());
        Ok(())
    }

    fn write_segment_info(&mut self) -> Result<()> {
        let mut body = Vec::new();
        TimecodeScale::new(self.timecode_scale).encode(&mut body)?;
        MuxingApp::new(APP_NAME).encode(&mut body)?;
        WritingApp::new(APP_NAME).encode(&mut body)?;

        Duration::ID.encode(&mut body)?;
        VInt64::new(8).encode(&mut body)?;
        let duration_offset_in_body = body.len();
        body.extend_from_slice(&0.0f64.to_be_bytes());

        let header = Header {
            id: master::SegmentInfo::ID,
            size: VInt64::new(body.len() as u64),
        };
        header.encode(&mut self.output)?;
        let payload_start = self.output.len();
        self.output.append_slice(&body);
        self.duration_patch_offset = payload_start + duration_offset_in_body;
        Ok(())
    }

    fn write_tracks_element(&mut self) -> Result<()> {
        let mut body = Vec::new();
        for track in &self.tracks {
            track.wire.encode(&mut body)?;
        }
        let header = Header {
            id: master::Tracks::ID,
            size: VInt64::new(body.len() as u64),
        };
        header.encode(&mut self.output)?;
        self.output.append_slice(&body);
        Ok(())
    }

    fn open_or_continue_cluster(&mut self, ticks: u64) -> Result<()> {
        let need_new = match &self.current_cluster {
            None => true,
            Some(c) => {
                let delta = ticks as i64 - c.base_ticks as i64;
                delta > MAX_CLUSTER_DELTA_TICKS || delta as u64 >= self.cluster_soft_cap_ticks
            }
        };
        if need_new {
            self.close_current_cluster()?;

            master::Cluster::ID.encode(&mut self.output)?;
            let size_offset = self.output.len();
            self.output.append_slice(&[0u8; 4]);
            let payload_start = self.output.len();

            Timecode::new(ticks).encode(&mut self.output)?;

            self.current_cluster = Some(ClusterInFlight {
                size_patch_offset: size_offset,
                payload_start,
                base_ticks: ticks,
            });
        }
        Ok(())
    }

    fn close_current_cluster(&mut self) -> Result<()> {
        if let Some(cluster) = self.current_cluster.take() {
            let actual = self.output.len() - cluster.payload_start;
            let bytes = encode_reserved_vint(actual as u64, cluster.payload_start - cluster.size_patch_offset)?;
            self.output.set_slice(cluster.size_patch_offset, &bytes);
        }
        Ok(())
    }
}

/// Encodes `value` as a VINT of exactly `width` bytes (the length marker bit set at position
/// `width` from the MSB). Used for back-patching size fields whose width was reserved ahead of
/// the value being known.
fn encode_reserved_vint(value: u64, width: usize) -> Result<Vec<u8>> {
    let needed = VInt64::encode_size(value);
    if needed > width {
        return Err(Error::SizeFieldOverflow {
            reserved: width,
            actual: needed,
        });
    }
    let marker = 1u64 << (7 * width);
    let encoded = marker | value;
    let bytes = encoded.to_be_bytes();
    Ok(bytes[8 - width..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ParseSession, TrackKind};

    #[test]
    fn rejects_zero_dimension_track() {
        let mut mux = MuxSession::default();
        let err = mux.add_video_track(0, 480, "V_VP8").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn rejects_unknown_handle() {
        let mut mux = MuxSession::default();
        let bogus = MuxTrackHandle(99);
        let err = mux.write_video_frame(bogus, &[1, 2, 3], 0, true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn rejects_out_of_order_frame() {
        let mut mux = MuxSession::default();
        let track = mux.add_video_track(640, 480, "V_VP8").unwrap();
        mux.write_video_frame(track, &[1], 100_000_000, true).unwrap();
        let err = mux
            .write_video_frame(track, &[2], 50_000_000, true)
            .unwrap_err();
        assert!(matches!(err, Error::OutOfOrderFrame { .. }));
    }

    #[test]
    fn round_trips_minimal_vp8() {
        let mut mux = MuxSession::default();
        let track = mux.add_video_track(640, 480, "V_VP8").unwrap();
        mux.write_video_frame(track, &[0x30, 0x00, 0x00], 0, true)
            .unwrap();
        let bytes = mux.finalize().unwrap();

        let parsed = ParseSession::parse(&bytes).unwrap();
        assert_eq!(parsed.track_count(), 1);
        let info = parsed.track_info(0).unwrap();
        assert_eq!(info.codec_id, "V_VP8");
        assert!(matches!(
            info.kind,
            TrackKind::Video { pixel_width: 640, pixel_height: 480, .. }
        ));

        let frames: Vec<_> = parsed.frame_iterator().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, &[0x30, 0x00, 0x00]);
        assert_eq!(frames[0].timestamp_ns, 0);
        assert!(frames[0].is_keyframe);
    }
}
