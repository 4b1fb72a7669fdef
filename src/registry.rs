//! The closed set of video/audio codec identifiers this profile allows.

use std::fmt;
use std::str::FromStr;

/// A video codec from the closed set this profile allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    /// VP8.
    Vp8,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
}

impl VideoCodec {
    /// The wire-format CodecID string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vp8 => "V_VP8",
            Self::Vp9 => "V_VP9",
            Self::Av1 => "V_AV1",
        }
    }
}

impl FromStr for VideoCodec {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V_VP8" => Ok(Self::Vp8),
            "V_VP9" => Ok(Self::Vp9),
            "V_AV1" => Ok(Self::Av1),
            _ => Err(()),
        }
    }
}

impl AsRef<str> for VideoCodec {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audio codec from the closed set this profile allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCodec {
    /// Opus.
    Opus,
    /// Vorbis.
    Vorbis,
}

impl AudioCodec {
    /// The wire-format CodecID string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Opus => "A_OPUS",
            Self::Vorbis => "A_VORBIS",
        }
    }
}

impl FromStr for AudioCodec {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A_OPUS" => Ok(Self::Opus),
            "A_VORBIS" => Ok(Self::Vorbis),
            _ => Err(()),
        }
    }
}

impl AsRef<str> for AudioCodec {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_codec_round_trips() {
        for codec in [VideoCodec::Vp8, VideoCodec::Vp9, VideoCodec::Av1] {
            assert_eq!(VideoCodec::from_str(codec.as_str()), Ok(codec));
        }
        assert!(VideoCodec::from_str("V_H264").is_err());
    }

    #[test]
    fn audio_codec_round_trips() {
        for codec in [AudioCodec::Opus, AudioCodec::Vorbis] {
            assert_eq!(AudioCodec::from_str(codec.as_str()), Ok(codec));
        }
        assert!(AudioCodec::from_str("A_MP3").is_err());
    }
}
