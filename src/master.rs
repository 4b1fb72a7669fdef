//! Master (container) elements in the WebM profile.

use crate::Error;
use crate::base::*;
use crate::element::*;
use crate::frame::ClusterBlock;
use crate::functional::*;
use crate::leaf::*;
use crate::supplement::Void;

// A helper for generating container elements whose children are each permitted once
// (required/optional) or any number of times (multiple). Children of a type not listed here
// are skipped (Void is always recognized; anything else is logged and skipped too).
macro_rules! nested {
    (required: [$($required:ident),*$(,)?], optional: [$($optional:ident),*$(,)?], multiple: [$($multiple:ident),*$(,)?],) => {
        paste::paste! {
            fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
                $( let mut [<$required:snake>] = None;)*
                $( let mut [<$optional:snake>] = None;)*
                $( let mut [<$multiple:snake>] = Vec::new();)*

                while let Ok(Some(header)) = Option::<Header>::decode(buf) {
                    match header.id {
                        $( $required::ID => {
                            if [<$required:snake>].is_some() {
                                return Err(Error::InvalidStructure(Self::ID));
                            }
                            [<$required:snake>] = Some($required::decode_element(&header, buf)?);
                        } )*
                        $( $optional::ID => {
                            if [<$optional:snake>].is_some() {
                                return Err(Error::InvalidStructure(Self::ID));
                            }
                            [<$optional:snake>] = Some($optional::decode_element(&header, buf)?);
                        } )*
                        $( $multiple::ID => {
                            [<$multiple:snake>].push($multiple::decode_element(&header, buf)?);
                        } )*
                        Void::ID => {
                            let v = Void::decode_element(&header, buf)?;
                            log::debug!("skipping Void ({}B) inside {}", v.size, Self::ID);
                        }
                        _ => {
                            buf.advance(*header.size as usize);
                            log::warn!("skipping unknown element {}({}B) inside {}", header.id, *header.size, Self::ID);
                        }
                    }
                }

                if buf.has_remaining() {
                    return Err(Error::ShortRead);
                }

                Ok(Self {
                    $( [<$required:snake>]: [<$required:snake>].ok_or(Error::InvalidStructure(Self::ID))?, )*
                    $( [<$optional:snake>], )*
                    $( [<$multiple:snake>], )*
                })
            }
            fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
                $( self.[<$required:snake>].encode(buf)?; )*
                $( self.[<$optional:snake>].encode(buf)?; )*
                $( self.[<$multiple:snake>].encode(buf)?; )*
                Ok(())
            }
        }
    };
}

/// EBML element (0x1A45DFA3): the first top-level element of a WebM stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ebml {
    /// EBMLVersion child.
    pub ebml_version: Option<EbmlVersion>,
    /// EBMLReadVersion child.
    pub ebml_read_version: Option<EbmlReadVersion>,
    /// EBMLMaxIDLength child.
    pub ebml_max_id_length: Option<EbmlMaxIdLength>,
    /// EBMLMaxSizeLength child.
    pub ebml_max_size_length: Option<EbmlMaxSizeLength>,
    /// DocType child; must be `"webm"` for this profile.
    pub doc_type: Option<DocType>,
    /// DocTypeVersion child.
    pub doc_type_version: Option<DocTypeVersion>,
    /// DocTypeReadVersion child.
    pub doc_type_read_version: Option<DocTypeReadVersion>,
}

impl Element for Ebml {
    const ID: VInt64 = VInt64::from_encoded(0x1A45_DFA3);
    nested! {
        required: [],
        optional: [ EbmlVersion, EbmlReadVersion, EbmlMaxIdLength, EbmlMaxSizeLength, DocType, DocTypeVersion, DocTypeReadVersion ],
        multiple: [],
    }
}

/// Segment element (0x18538067): the logical root of the media content.
///
/// Parsed by hand rather than through `nested!`, because an unknown-length Segment (resolved
/// by extending to the end of the input) and an unknown-length Cluster inside it (resolved by
/// scanning for the next sibling) both need access to the raw header before its body can be
/// sliced — something the generic `Element::decode_body` call signature cannot express.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    /// SegmentInfo child, if present in the stream.
    pub info: Option<SegmentInfo>,
    /// Tracks child, if present in the stream.
    pub tracks: Option<Tracks>,
    /// Clusters, in file order.
    pub cluster: Vec<Cluster>,
}

impl Element for Segment {
    const ID: VInt64 = VInt64::from_encoded(0x18538067);

    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        let mut info = None;
        let mut tracks = None;
        let mut cluster = Vec::new();

        while let Ok(Some(header)) = Option::<Header>::decode(buf) {
            match header.id {
                id if id == SegmentInfo::ID => {
                    if info.is_some() {
                        return Err(Error::InvalidStructure(Self::ID));
                    }
                    info = Some(SegmentInfo::decode_element(&header, buf)?);
                }
                id if id == Tracks::ID => {
                    if tracks.is_some() {
                        return Err(Error::InvalidStructure(Self::ID));
                    }
                    tracks = Some(Tracks::decode_element(&header, buf)?);
                }
                id if id == Cluster::ID && header.size.is_unknown => {
                    let end = scan_for_segment_sibling(*buf);
                    let body = buf.slice(end).to_vec();
                    buf.advance(end);
                    cluster.push(Cluster::decode_body(&mut &body[..])?);
                }
                id if id == Cluster::ID => {
                    cluster.push(Cluster::decode_element(&header, buf)?);
                }
                Void::ID => {
                    let v = Void::decode_element(&header, buf)?;
                    log::debug!("skipping Void ({}B) inside Segment", v.size);
                }
                _ if header.size.is_unknown => {
                    log::warn!("skipping unrecognized unknown-length element {} inside Segment", header.id);
                    buf.advance(buf.remaining());
                }
                _ => {
                    buf.advance(*header.size as usize);
                    log::warn!("skipping unknown element {}({}B) inside Segment", header.id, *header.size);
                }
            }
        }

        Ok(Self { info, tracks, cluster })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        self.info.encode(buf)?;
        self.tracks.encode(buf)?;
        self.cluster.encode(buf)?;
        Ok(())
    }
}

/// Scans `data` for the next offset at which a structurally valid Segment-level sibling
/// (SegmentInfo or Cluster) begins, used to bound an unknown-length Cluster. Returns
/// `data.len()` if none is found (the Cluster runs to the end of the Segment).
fn scan_for_segment_sibling(data: &[u8]) -> usize {
    for i in 0..data.len() {
        let mut probe = &data[i..];
        let before = probe.len();
        if let Ok(header) = Header::decode(&mut probe) {
            if header.id == SegmentInfo::ID || header.id == Cluster::ID {
                if header.size.is_unknown {
                    return i;
                }
                let header_len = before - probe.len();
                let body_len = *header.size as usize;
                if header_len + body_len <= data.len() - i {
                    return i;
                }
            }
        }
    }
    data.len()
}

/// SegmentInfo element (0x1549A966): general information about the Segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentInfo {
    /// TimecodeScale child; defaults to 1,000,000 (1ms per tick) when absent.
    pub timecode_scale: Option<TimecodeScale>,
    /// Duration child, in TimecodeScale units.
    pub duration: Option<Duration>,
    /// MuxingApp child.
    pub muxing_app: Option<MuxingApp>,
    /// WritingApp child.
    pub writing_app: Option<WritingApp>,
}

impl Element for SegmentInfo {
    const ID: VInt64 = VInt64::from_encoded(0x1549A966);
    nested! {
        required: [],
        optional: [ TimecodeScale, Duration, MuxingApp, WritingApp ],
        multiple: [],
    }
}

/// Tracks element (0x1654AE6B): the list of TrackEntry records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tracks {
    /// TrackEntry children.
    pub track_entry: Vec<TrackEntry>,
}

impl Element for Tracks {
    const ID: VInt64 = VInt64::from_encoded(0x1654AE6B);
    nested! {
        required: [],
        optional: [],
        multiple: [ TrackEntry ],
    }
}

/// TrackEntry element (0xAE): describes a single track.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackEntry {
    /// TrackNumber, referenced from block payloads.
    pub track_number: TrackNumber,
    /// TrackType: 1 = video, 2 = audio.
    pub track_type: TrackType,
    /// CodecID, a string from the Codec Registry.
    pub codec_id: CodecId,
    /// Optional human-readable name.
    pub name: Option<Name>,
    /// Optional language tag.
    pub language: Option<Language>,
    /// Video sidecar, present for video tracks.
    pub video: Option<Video>,
    /// Audio sidecar, present for audio tracks.
    pub audio: Option<Audio>,
    /// Default frame duration, in nanoseconds (video only).
    pub default_duration: Option<DefaultDuration>,
}

impl Element for TrackEntry {
    const ID: VInt64 = VInt64::from_encoded(0xAE);
    nested! {
        required: [ TrackNumber, TrackType, CodecId ],
        optional: [ Name, Language, Video, Audio, DefaultDuration ],
        multiple: [],
    }
}

/// Video element (0xE0): video-specific TrackEntry sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Video {
    /// PixelWidth child.
    pub pixel_width: PixelWidth,
    /// PixelHeight child.
    pub pixel_height: PixelHeight,
}

impl Element for Video {
    const ID: VInt64 = VInt64::from_encoded(0xE0);
    nested! {
        required: [ PixelWidth, PixelHeight ],
        optional: [],
        multiple: [],
    }
}

/// Audio element (0xE1): audio-specific TrackEntry sidecar.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Audio {
    /// SamplingFrequency child, in Hz.
    pub sampling_frequency: SamplingFrequency,
    /// Channels child.
    pub channels: Channels,
    /// Optional BitDepth child.
    pub bit_depth: Option<BitDepth>,
}

impl Element for Audio {
    const ID: VInt64 = VInt64::from_encoded(0xE1);
    nested! {
        required: [ SamplingFrequency, Channels ],
        optional: [ BitDepth ],
        multiple: [],
    }
}

/// Cluster element (0x1F43B675): a time-contiguous group of blocks.
///
/// Parsed by hand rather than through `nested!`: SimpleBlock and BlockGroup are distinct wire
/// types but must be yielded to the Frame Iterator in strict encounter order, which a
/// per-type grouping into separate `Vec`s would lose.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cluster {
    /// Cluster-base timestamp, in TimecodeScale units.
    pub timecode: Timecode,
    /// Blocks in encounter order.
    pub blocks: Vec<ClusterBlock>,
}

impl Element for Cluster {
    const ID: VInt64 = VInt64::from_encoded(0x1F43B675);

    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        let mut timecode = None;
        let mut blocks = Vec::new();

        while let Ok(Some(header)) = Option::<Header>::decode(buf) {
            match header.id {
                id if id == Timecode::ID => {
                    if timecode.is_some() {
                        return Err(Error::InvalidStructure(Self::ID));
                    }
                    timecode = Some(Timecode::decode_element(&header, buf)?);
                }
                id if id == SimpleBlock::ID => {
                    let b = SimpleBlock::decode_element(&header, buf)?;
                    blocks.push(ClusterBlock::Simple(b));
                }
                id if id == BlockGroup::ID => {
                    let b = BlockGroup::decode_element(&header, buf)?;
                    blocks.push(ClusterBlock::Group(b));
                }
                Void::ID => {
                    let v = Void::decode_element(&header, buf)?;
                    log::debug!("skipping Void ({}B) inside Cluster", v.size);
                }
                _ => {
                    buf.advance(*header.size as usize);
                    log::warn!("skipping unknown element {}({}B) inside Cluster", header.id, *header.size);
                }
            }
        }

        if buf.has_remaining() {
            return Err(Error::ShortRead);
        }

        Ok(Self {
            timecode: timecode.ok_or(Error::InvalidStructure(Self::ID))?,
            blocks,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        self.timecode.encode(buf)?;
        for block in &self.blocks {
            block.encode(buf)?;
        }
        Ok(())
    }
}

/// BlockGroup element (0xA0): wraps a Block with reference metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockGroup {
    /// The wrapped Block.
    pub block: Block,
    /// ReferenceBlock children; an empty list means this Block is a keyframe.
    pub reference_block: Vec<ReferenceBlock>,
}

impl Element for BlockGroup {
    const ID: VInt64 = VInt64::from_encoded(0xA0);
    nested! {
        required: [ Block ],
        optional: [ ],
        multiple: [ ReferenceBlock ],
    }
}
