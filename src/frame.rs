use std::os::raw::c_int;

/// Pixel flag: the buffer wants the engine's native channel order, do not
/// swap red and blue.
///
/// Earlier headers called this bit `VI_BGR` or `VI_RGB`; both names meant
/// this same bit.
pub const VI_NO_CHANNEL_SWAP: c_int = 0x01;

/// Pixel flag: reverse the order of scan lines.
pub const VI_VERTICAL_FLIP: c_int = 0x02;

/// How `get_pixels` should lay out the copied frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelOptions {
    /// Exchange the first and third byte of every pixel.
    pub swap_red_blue: bool,
    /// Copy scan lines bottom to top.
    pub flip_vertical: bool,
}

impl Default for PixelOptions {
    fn default() -> Self {
        PixelOptions {
            swap_red_blue: true,
            flip_vertical: false,
        }
    }
}

impl PixelOptions {
    /// Parse the C flags word. Unknown bits are ignored.
    pub fn from_flags(flags: c_int) -> Self {
        PixelOptions {
            swap_red_blue: flags & VI_NO_CHANNEL_SWAP == 0,
            flip_vertical: flags & VI_VERTICAL_FLIP != 0,
        }
    }

    /// The C flags word selecting these options.
    pub fn to_flags(self) -> c_int {
        let mut flags = 0;
        if !self.swap_red_blue {
            flags |= VI_NO_CHANNEL_SWAP;
        }
        if self.flip_vertical {
            flags |= VI_VERTICAL_FLIP;
        }
        flags
    }
}

/// Size of the frames a device currently delivers.
///
/// All fields are zero while the device is not initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes `get_pixels` writes.
    pub buffer_size: usize,
}

impl FrameGeometry {
    /// True while the device delivers nothing.
    pub fn is_empty(&self) -> bool {
        self.buffer_size == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_swap_without_flip() {
        let opts = PixelOptions::from_flags(0);
        assert!(opts.swap_red_blue);
        assert!(!opts.flip_vertical);
        assert_eq!(opts, PixelOptions::default());
    }

    #[test]
    fn bit0_disables_swap() {
        let opts = PixelOptions::from_flags(VI_NO_CHANNEL_SWAP);
        assert!(!opts.swap_red_blue);
        assert!(!opts.flip_vertical);
    }

    #[test]
    fn bit1_adds_flip() {
        let opts = PixelOptions::from_flags(VI_VERTICAL_FLIP);
        assert!(opts.swap_red_blue);
        assert!(opts.flip_vertical);
    }

    #[test]
    fn both_bits() {
        let opts = PixelOptions::from_flags(VI_NO_CHANNEL_SWAP | VI_VERTICAL_FLIP);
        assert!(!opts.swap_red_blue);
        assert!(opts.flip_vertical);
        assert_eq!(opts.to_flags(), 0x03);
    }

    #[test]
    fn unknown_bits_ignored() {
        assert_eq!(PixelOptions::from_flags(0x7c), PixelOptions::default());
    }
}
