//! Leaf (non-container) elements in the WebM profile.
//!
//! Each leaf type is a thin wrapper over one of five bottom types, parameterized by its
//! element ID as a const generic. This mirrors the teacher's bottom-type pattern, but the
//! concrete WebM element list is hand-specified here (spec §6) rather than generated from an
//! external Matroska schema.

use std::ops::Deref;

use crate::base::VInt64;
use crate::element::Element;
use crate::functional::*;

/// Bottom type for *unsigned integers*, stored big-endian with leading zero bytes stripped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UnsignedInteger<const ID: u64>(u64);

/// Bottom type for *signed integers*, stored big-endian two's complement, minimally sized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SignedInteger<const ID: u64>(i64);

/// Bottom type for *floating point numbers* (4 or 8 byte IEEE 754, read; always written as 8).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Float<const ID: u64>(f64);

/// Bottom type for *UTF-8 text*, NUL-padded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Text<const ID: u64>(String);

/// Bottom type for opaque *binary data*.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Bin<const ID: u64>(Vec<u8>);

impl<const ID: u64> UnsignedInteger<ID> {
    /// Build from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }
    /// The raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}
impl<const ID: u64> SignedInteger<ID> {
    /// Build from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }
    /// The raw value.
    pub fn get(&self) -> i64 {
        self.0
    }
}
impl<const ID: u64> Float<ID> {
    /// Build from a raw value.
    pub fn new(value: f64) -> Self {
        Self(value)
    }
    /// The raw value.
    pub fn get(&self) -> f64 {
        self.0
    }
}
impl<const ID: u64> Text<ID> {
    /// Build from a string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}
impl<const ID: u64> Bin<ID> {
    /// Build from raw bytes.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self(value.into())
    }
    /// Consume self, returning the owned bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl<const ID: u64> Deref for UnsignedInteger<ID> {
    type Target = u64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<const ID: u64> Deref for SignedInteger<ID> {
    type Target = i64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<const ID: u64> Deref for Float<ID> {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<const ID: u64> Deref for Text<ID> {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<const ID: u64> Deref for Bin<ID> {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const ID: u64> Element for UnsignedInteger<ID> {
    const ID: VInt64 = VInt64::from_encoded(ID);
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        if buf.is_empty() {
            return Ok(Self(0));
        }
        if buf.len() > 8 {
            return Err(crate::Error::UnderDecode(Self::ID));
        }
        let len = buf.len();
        let mut value = [0u8; 8];
        value[8 - len..].copy_from_slice(buf);
        buf.advance(len);
        Ok(Self(u64::from_be_bytes(value)))
    }
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        let bytes = self.0.to_be_bytes();
        let first_non_zero = bytes
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(bytes.len() - 1);
        buf.append_slice(&bytes[first_non_zero..]);
        Ok(())
    }
}

impl<const ID: u64> Element for SignedInteger<ID> {
    const ID: VInt64 = VInt64::from_encoded(ID);
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        if buf.is_empty() {
            return Ok(Self(0));
        }
        if buf.len() > 8 {
            return Err(crate::Error::UnderDecode(Self::ID));
        }
        let len = buf.len();
        let negative = buf[0] & 0x80 != 0;
        let mut value = [if negative { 0xFFu8 } else { 0u8 }; 8];
        value[8 - len..].copy_from_slice(buf);
        buf.advance(len);
        Ok(Self(i64::from_be_bytes(value)))
    }
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        let bytes = self.0.to_be_bytes();
        let mut start = 0;
        while start < 7 {
            let keep_sign = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
            if !keep_sign {
                break;
            }
            start += 1;
        }
        buf.append_slice(&bytes[start..]);
        Ok(())
    }
}

impl<const ID: u64> Element for Float<ID> {
    const ID: VInt64 = VInt64::from_encoded(ID);
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        match buf.len() {
            0 => Ok(Self(0.0)),
            4 => {
                let bytes = <[u8; 4]>::decode(buf)?;
                Ok(Self(f32::from_be_bytes(bytes) as f64))
            }
            8 => {
                let bytes = <[u8; 8]>::decode(buf)?;
                Ok(Self(f64::from_be_bytes(bytes)))
            }
            _ => Err(crate::Error::UnderDecode(Self::ID)),
        }
    }
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        self.0.to_be_bytes().encode(buf)
    }
}

impl<const ID: u64> Element for Text<ID> {
    const ID: VInt64 = VInt64::from_encoded(ID);
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        let bytes = *buf;
        buf.advance(bytes.len());
        let trimmed = bytes.split(|&b| b == 0).next().unwrap_or(bytes);
        let s = std::str::from_utf8(trimmed).map_err(|_| crate::Error::InvalidStructure(Self::ID))?;
        Ok(Self(s.to_string()))
    }
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        buf.append_slice(self.0.as_bytes());
        Ok(())
    }
}

impl<const ID: u64> Element for Bin<ID> {
    const ID: VInt64 = VInt64::from_encoded(ID);
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        let bytes = buf.to_vec();
        buf.advance(buf.len());
        Ok(Self(bytes))
    }
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        buf.append_slice(&self.0);
        Ok(())
    }
}

/// EBMLVersion (0x4286): version of EBML used.
pub type EbmlVersion = UnsignedInteger<0x4286>;
/// EBMLReadVersion (0x42F7): minimum EBML version required to read.
pub type EbmlReadVersion = UnsignedInteger<0x42F7>;
/// EBMLMaxIDLength (0x42F2): maximum length of an element ID in bytes.
pub type EbmlMaxIdLength = UnsignedInteger<0x42F2>;
/// EBMLMaxSizeLength (0x42F3): maximum length of a size field in bytes.
pub type EbmlMaxSizeLength = UnsignedInteger<0x42F3>;
/// DocType (0x4282): document type, must be `"webm"` in this profile.
pub type DocType = Text<0x4282>;
/// DocTypeVersion (0x4287): version of the document type.
pub type DocTypeVersion = UnsignedInteger<0x4287>;
/// DocTypeReadVersion (0x4285): minimum document type version required to read.
pub type DocTypeReadVersion = UnsignedInteger<0x4285>;

/// TimecodeScale (0x2AD7B1): nanoseconds per tick for the Segment.
pub type TimecodeScale = UnsignedInteger<0x2AD7B1>;
/// Duration (0x4489): Segment duration in TimecodeScale units.
pub type Duration = Float<0x4489>;
/// MuxingApp (0x4D80): muxing application or library.
pub type MuxingApp = Text<0x4D80>;
/// WritingApp (0x5741): writing application.
pub type WritingApp = Text<0x5741>;

/// TrackNumber (0xD7): unique track number, referenced from block payloads.
pub type TrackNumber = UnsignedInteger<0xD7>;
/// TrackType (0x83): 1 = video, 2 = audio.
pub type TrackType = UnsignedInteger<0x83>;
/// CodecID (0x86): codec identifier string, from the Codec Registry.
pub type CodecId = Text<0x86>;
/// Name (0x536E): human-readable track name.
pub type Name = Text<0x536E>;
/// Language (0x22B59C): track language.
pub type Language = Text<0x22B59C>;

/// PixelWidth (0xB0): encoded video width.
pub type PixelWidth = UnsignedInteger<0xB0>;
/// PixelHeight (0xBA): encoded video height.
pub type PixelHeight = UnsignedInteger<0xBA>;
/// DefaultDuration (0x23E383): default frame duration, in nanoseconds.
pub type DefaultDuration = UnsignedInteger<0x23E383>;

/// SamplingFrequency (0xB5): audio sample rate in Hz.
pub type SamplingFrequency = Float<0xB5>;
/// Channels (0x9F): audio channel count.
pub type Channels = UnsignedInteger<0x9F>;
/// BitDepth (0x6264): audio bit depth.
pub type BitDepth = UnsignedInteger<0x6264>;

/// Timecode (0xE7): Cluster base timestamp, in TimecodeScale units.
pub type Timecode = UnsignedInteger<0xE7>;
/// ReferenceBlock (0xFB): relative timecode of a referenced frame.
pub type ReferenceBlock = SignedInteger<0xFB>;
/// SimpleBlock (0xA3): track number, relative timecode, flags, and laced frame payload(s).
pub type SimpleBlock = Bin<0xA3>;
/// Block (0xA1): identical wire layout to SimpleBlock, nested inside a BlockGroup.
pub type Block = Bin<0xA1>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_integer_round_trips() {
        let pairs = [
            (vec![1u8], 1u64),
            (vec![0u8], 0u64),
            (vec![0xFFu8], 255u64),
            (vec![0x01u8, 0], 256u64),
            (vec![0xFFu8; 8], u64::MAX),
        ];
        for (encoded, decoded) in pairs {
            let v = TrackNumber::decode_body(&mut &*encoded).unwrap();
            assert_eq!(v.get(), decoded);
            let mut buf = vec![];
            TrackNumber::new(decoded).encode_body(&mut buf).unwrap();
            assert_eq!(buf, encoded);
        }
    }

    #[test]
    fn signed_integer_round_trips() {
        for value in [0i64, 1, -1, 127, -128, 32767, -32768] {
            let mut buf = vec![];
            ReferenceBlock::new(value).encode_body(&mut buf).unwrap();
            let decoded = ReferenceBlock::decode_body(&mut &buf[..]).unwrap();
            assert_eq!(decoded.get(), value);
        }
    }

    #[test]
    fn float_accepts_f32_and_f64_width() {
        let v = SamplingFrequency::decode_body(&mut &48000.0f32.to_be_bytes()[..]).unwrap();
        assert_eq!(v.get(), 48000.0);
        let v = SamplingFrequency::decode_body(&mut &48000.0f64.to_be_bytes()[..]).unwrap();
        assert_eq!(v.get(), 48000.0);
    }

    #[test]
    fn text_trims_nul_padding() {
        let v = DocType::decode_body(&mut &b"webm\0\0"[..]).unwrap();
        assert_eq!(&*v, "webm");
    }
}
