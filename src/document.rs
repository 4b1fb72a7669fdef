//! Parses a WebM byte buffer into metadata and a lazy frame iterator.

use std::collections::HashSet;

use crate::base::Header;
use crate::element::Element;
use crate::frame::Frame;
use crate::functional::*;
use crate::master;
use crate::{Error, Result};

/// The highest `DocTypeReadVersion` this implementation understands.
const SUPPORTED_DOC_TYPE_READ_VERSION: u64 = 2;

/// Parsed EBML header metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbmlHeader {
    /// Document type; always `"webm"` for a session that parsed successfully.
    pub doc_type: String,
    /// DocTypeVersion.
    pub doc_type_version: u64,
    /// DocTypeReadVersion.
    pub doc_type_read_version: u64,
    /// EBMLMaxIDLength.
    pub ebml_max_id_length: u64,
    /// EBMLMaxSizeLength.
    pub ebml_max_size_length: u64,
}

/// Segment-level metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentInfo {
    /// Nanoseconds per tick. Always non-zero; defaults to 1,000,000 (1ms) when absent.
    pub timecode_scale: u64,
    /// Segment duration, in TimecodeScale units.
    pub duration: Option<f64>,
}

/// Which kind of media a [`Track`] carries, with its codec-specific sidecar fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackKind {
    /// A video track.
    Video {
        /// Encoded pixel width.
        pixel_width: u64,
        /// Encoded pixel height.
        pixel_height: u64,
        /// Default frame duration, in nanoseconds.
        default_duration: Option<u64>,
    },
    /// An audio track.
    Audio {
        /// Sample rate, in Hz.
        sampling_frequency: f64,
        /// Channel count.
        channels: u64,
        /// Bit depth, when declared.
        bit_depth: Option<u64>,
    },
}

/// A parsed track.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Unique track number, referenced from block payloads.
    pub track_number: u64,
    /// Codec identifier string, as found on the wire (not validated against the registry).
    pub codec_id: String,
    /// Human-readable name, if present.
    pub name: Option<String>,
    /// Language tag, if present.
    pub language: Option<String>,
    /// Codec-specific fields.
    pub kind: TrackKind,
}

/// A parsed WebM buffer: metadata plus a lazy frame iterator.
///
/// Cluster *structure* is discovered eagerly during construction (the element tree is walked
/// once, as a single forward pass); per-block lacing decode and timestamp resolution are
/// deferred until [`ParseSession::frame_iterator`] is pulled.
#[derive(Debug)]
pub struct ParseSession {
    header: EbmlHeader,
    info: SegmentInfo,
    tracks: Vec<Track>,
    tracks_present: bool,
    clusters: Vec<master::Cluster>,
}

impl ParseSession {
    /// Parses `input` as a WebM byte buffer.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut buf = input;

        let header = parse_ebml_header(&mut buf)?;

        let segment_header = Header::decode(&mut buf).map_err(|_| Error::InvalidHeader)?;
        if segment_header.id != master::Segment::ID {
            return Err(Error::InvalidHeader);
        }

        let segment = if segment_header.size.is_unknown {
            master::Segment::decode_body(&mut buf)?
        } else {
            let size = *segment_header.size as usize;
            if size > buf.remaining() {
                return Err(Error::OutOfBounds);
            }
            let mut body = buf.slice(size);
            let segment = master::Segment::decode_body(&mut body)?;
            if body.has_remaining() {
                return Err(Error::InvalidStructure(master::Segment::ID));
            }
            buf.advance(size);
            segment
        };

        let wire_info = segment
            .info
            .ok_or(Error::InvalidStructure(master::Segment::ID))?;
        let timecode_scale = wire_info
            .timecode_scale
            .map(|t| t.get())
            .filter(|&t| t > 0)
            .unwrap_or(1_000_000);
        let info = SegmentInfo {
            timecode_scale,
            duration: wire_info.duration.map(|d| d.get()),
        };

        let tracks_present = segment.tracks.is_some();
        let tracks = parse_tracks(segment.tracks)?;

        log::debug!(
            "parsed WebM document: {} track(s), {} cluster(s)",
            tracks.len(),
            segment.cluster.len()
        );

        Ok(Self {
            header,
            info,
            tracks,
            tracks_present,
            clusters: segment.cluster,
        })
    }

    /// The parsed EBML header.
    pub fn ebml_header(&self) -> &EbmlHeader {
        &self.header
    }

    /// The parsed SegmentInfo.
    pub fn segment_info(&self) -> &SegmentInfo {
        &self.info
    }

    /// Segment duration in nanoseconds, if the file declared one.
    pub fn duration_ns(&self) -> Option<u64> {
        self.info
            .duration
            .map(|d| (d * self.info.timecode_scale as f64).round() as u64)
    }

    /// Number of parsed tracks.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// The track at `index`, in file order.
    pub fn track_info(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// All parsed tracks, in file order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// A lazy iterator over every frame in the document, in file order.
    ///
    /// Fails with [`Error::MissingTracks`] if the Segment has no Tracks element at all.
    pub fn frame_iterator(&self) -> Result<impl Iterator<Item = Result<Frame<'_>>> + '_> {
        if !self.tracks_present {
            return Err(Error::MissingTracks);
        }
        let scale = self.info.timecode_scale;
        Ok(self.clusters.iter().flat_map(move |c| c.frames(scale)))
    }
}

fn parse_ebml_header(buf: &mut &[u8]) -> Result<EbmlHeader> {
    let header = Header::decode(buf).map_err(|_| Error::InvalidHeader)?;
    if header.id != master::Ebml::ID {
        return Err(Error::InvalidHeader);
    }
    let ebml = master::Ebml::decode_element(&header, buf).map_err(|_| Error::InvalidHeader)?;

    let doc_type = ebml.doc_type.ok_or(Error::InvalidHeader)?.to_string();
    if doc_type != "webm" {
        return Err(Error::InvalidHeader);
    }
    let doc_type_read_version = ebml.doc_type_read_version.map(|v| v.get()).unwrap_or(1);
    if doc_type_read_version > SUPPORTED_DOC_TYPE_READ_VERSION {
        return Err(Error::InvalidHeader);
    }

    Ok(EbmlHeader {
        doc_type,
        doc_type_version: ebml.doc_type_version.map(|v| v.get()).unwrap_or(1),
        doc_type_read_version,
        ebml_max_id_length: ebml.ebml_max_id_length.map(|v| v.get()).unwrap_or(4),
        ebml_max_size_length: ebml.ebml_max_size_length.map(|v| v.get()).unwrap_or(8),
    })
}

fn parse_tracks(tracks: Option<master::Tracks>) -> Result<Vec<Track>> {
    let Some(tracks) = tracks else {
        return Ok(Vec::new());
    };
    if tracks.track_entry.is_empty() {
        return Err(Error::InvalidStructure(master::Tracks::ID));
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(tracks.track_entry.len());
    for entry in tracks.track_entry {
        let track_number = entry.track_number.get();
        if !seen.insert(track_number) {
            return Err(Error::DuplicateTrackNumber(track_number));
        }

        let kind = match entry.track_type.get() {
            1 => {
                let video = entry
                    .video
                    .ok_or(Error::InvalidStructure(master::TrackEntry::ID))?;
                TrackKind::Video {
                    pixel_width: video.pixel_width.get(),
                    pixel_height: video.pixel_height.get(),
                    default_duration: entry.default_duration.map(|d| d.get()),
                }
            }
            2 => {
                let audio = entry
                    .audio
                    .ok_or(Error::InvalidStructure(master::TrackEntry::ID))?;
                TrackKind::Audio {
                    sampling_frequency: audio.sampling_frequency.get(),
                    channels: audio.channels.get(),
                    bit_depth: audio.bit_depth.map(|b| b.get()),
                }
            }
            _ => return Err(Error::InvalidStructure(master::TrackEntry::ID)),
        };

        out.push(Track {
            track_number,
            codec_id: entry.codec_id.to_string(),
            name: entry.name.map(|n| n.to_string()),
            language: entry.language.map(|l| l.to_string()),
            kind,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_all_zero_buffer() {
        let err = ParseSession::parse(&[0x00, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader));
    }

    #[test]
    fn rejects_non_webm_doctype() {
        // EBML header with DocType "matroska" instead of "webm".
        let ebml = master::Ebml {
            doc_type: Some(crate::leaf::DocType::new("matroska")),
            doc_type_read_version: Some(crate::leaf::DocTypeReadVersion::new(2)),
            ..Default::default()
        };
        let mut buf = Vec::new();
        ebml.encode(&mut buf).unwrap();
        let err = ParseSession::parse(&buf).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader));
    }
}
