use crate::error::{Result, ViError};
use std::fmt;
use std::os::raw::c_int;

/// Number of device slots the engine manages.
pub const MAX_DEVICES: usize = 20;

/// Number of analog video standards understood by `set_format`.
pub const NUM_VIDEO_FORMATS: usize = 18;

/// Number of output encodings understood by `set_media_subtype`.
pub const NUM_MEDIA_SUBTYPES: usize = 19;

/// Settings flag: `width` and `height` are set.
pub const DS_RESOLUTION: c_int = 0x01;

/// Settings flag: `connection` is set.
pub const DS_CONNECTION: c_int = 0x20;

/// Identifier of a device slot, always in `0..MAX_DEVICES`.
///
/// Identifiers are positions in the engine's last enumeration and are not
/// stable across re-enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(u8);

impl DeviceId {
    /// Validate a raw identifier.
    pub fn new(raw: i32) -> Result<Self> {
        if raw >= 0 && (raw as usize) < MAX_DEVICES {
            Ok(DeviceId(raw as u8))
        } else {
            Err(ViError::InvalidDevice(raw))
        }
    }

    /// Identifier as passed across the C boundary.
    pub fn raw(self) -> i32 {
        self.0 as i32
    }

    /// Identifier as a slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical connection a capture card should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Composite,
    SVideo,
    Tuner,
    Usb,
    Ieee1394,
}

impl Connection {
    /// Value of the `connection` field.
    pub fn as_raw(self) -> c_int {
        match self {
            Connection::Composite => 0,
            Connection::SVideo => 1,
            Connection::Tuner => 2,
            Connection::Usb => 3,
            Connection::Ieee1394 => 4,
        }
    }

    /// `None` for values the engine does not know.
    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            0 => Some(Connection::Composite),
            1 => Some(Connection::SVideo),
            2 => Some(Connection::Tuner),
            3 => Some(Connection::Usb),
            4 => Some(Connection::Ieee1394),
            _ => None,
        }
    }
}

/// Analog video standard, see `set_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    NtscM,
    PalB,
    PalD,
    PalG,
    PalH,
    PalI,
    PalM,
    PalN,
    PalNc,
    SecamB,
    SecamD,
    SecamG,
    SecamH,
    SecamK,
    SecamK1,
    SecamL,
    NtscMJ,
    Ntsc433,
}

impl VideoFormat {
    const ALL: [VideoFormat; NUM_VIDEO_FORMATS] = [
        VideoFormat::NtscM,
        VideoFormat::PalB,
        VideoFormat::PalD,
        VideoFormat::PalG,
        VideoFormat::PalH,
        VideoFormat::PalI,
        VideoFormat::PalM,
        VideoFormat::PalN,
        VideoFormat::PalNc,
        VideoFormat::SecamB,
        VideoFormat::SecamD,
        VideoFormat::SecamG,
        VideoFormat::SecamH,
        VideoFormat::SecamK,
        VideoFormat::SecamK1,
        VideoFormat::SecamL,
        VideoFormat::NtscMJ,
        VideoFormat::Ntsc433,
    ];

    /// Value passed to `VI_SetFormat`.
    pub fn as_raw(self) -> c_int {
        self as c_int
    }

    /// `None` outside `0..NUM_VIDEO_FORMATS`.
    pub fn from_raw(raw: c_int) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Pixel encoding requested from the capture graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSubtype {
    Rgb24,
    Rgb32,
    Rgb555,
    Rgb565,
    Yuy2,
    Yvyu,
    Yuyv,
    Iyuv,
    Uyvy,
    Yv12,
    Yvu9,
    Y411,
    Y41p,
    Y211,
    Ayuv,
    Y800,
    Y8,
    Grey,
    Mjpg,
}

impl MediaSubtype {
    const ALL: [MediaSubtype; NUM_MEDIA_SUBTYPES] = [
        MediaSubtype::Rgb24,
        MediaSubtype::Rgb32,
        MediaSubtype::Rgb555,
        MediaSubtype::Rgb565,
        MediaSubtype::Yuy2,
        MediaSubtype::Yvyu,
        MediaSubtype::Yuyv,
        MediaSubtype::Iyuv,
        MediaSubtype::Uyvy,
        MediaSubtype::Yv12,
        MediaSubtype::Yvu9,
        MediaSubtype::Y411,
        MediaSubtype::Y41p,
        MediaSubtype::Y211,
        MediaSubtype::Ayuv,
        MediaSubtype::Y800,
        MediaSubtype::Y8,
        MediaSubtype::Grey,
        MediaSubtype::Mjpg,
    ];

    /// Value passed to `VI_SetMediaSubType`.
    pub fn as_raw(self) -> c_int {
        self as c_int
    }

    /// `None` outside `0..NUM_MEDIA_SUBTYPES`.
    pub fn from_raw(raw: c_int) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Optional device configuration passed to `VI_InitDevice`.
///
/// Only the fields selected by `flags` are used; the rest fall back to the
/// device defaults.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSettings {
    /// `DS_RESOLUTION` and/or `DS_CONNECTION`.
    pub flags: c_int,
    /// Requested frame width.
    pub width: c_int,
    /// Requested frame height.
    pub height: c_int,
    /// Raw [`Connection`] value.
    pub connection: c_int,
}

impl DeviceSettings {
    /// Request a frame size.
    pub fn with_resolution(mut self, width: c_int, height: c_int) -> Self {
        self.flags |= DS_RESOLUTION;
        self.width = width;
        self.height = height;
        self
    }

    /// Request a physical connection.
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.flags |= DS_CONNECTION;
        self.connection = connection.as_raw();
        self
    }
}

/// Which of the engine's four setup entry points a settings record selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SetupRequest {
    /// Device defaults.
    Default,
    /// `DS_RESOLUTION` only.
    Resolution { width: c_int, height: c_int },
    /// `DS_CONNECTION` only.
    Connection(c_int),
    /// Both flags.
    ResolutionAndConnection {
        width: c_int,
        height: c_int,
        connection: c_int,
    },
}

impl SetupRequest {
    /// Pick the entry point from the flags of `settings`; no settings or no
    /// flags mean defaults.
    pub fn from_settings(settings: Option<&DeviceSettings>) -> Self {
        let Some(s) = settings else {
            return SetupRequest::Default;
        };
        let size = s.flags & DS_RESOLUTION != 0;
        let conn = s.flags & DS_CONNECTION != 0;

        match (size, conn) {
            (true, true) => SetupRequest::ResolutionAndConnection {
                width: s.width,
                height: s.height,
                connection: s.connection,
            },
            (true, false) => SetupRequest::Resolution {
                width: s.width,
                height: s.height,
            },
            (false, true) => SetupRequest::Connection(s.connection),
            (false, false) => SetupRequest::Default,
        }
    }
}
