//! PNG export of a rendered frame.

use std::path::Path;

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::vdp::{self, HEIGHT, PIXELS, WIDTH};

/// Encode a full 320x224 frame as RGBA.
pub fn frame_image(frame: &[u32]) -> Result<RgbaImage> {
    if frame.len() != PIXELS {
        return Err(Error::FrameSize {
            got: frame.len(),
            expected: PIXELS,
        });
    }
    let mut rgba = vec![0u8; PIXELS * 4];
    vdp::to_rgba(frame, &mut rgba);
    RgbaImage::from_raw(WIDTH as u32, HEIGHT as u32, rgba).ok_or(Error::FrameSize {
        got: frame.len(),
        expected: PIXELS,
    })
}

/// Save `frame` as a PNG at `path`.
pub fn save_png(path: impl AsRef<Path>, frame: &[u32]) -> Result<()> {
    let img = frame_image(frame)?;
    img.save(path.as_ref())?;
    log::info!("screenshot saved to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_size_is_rejected() {
        let err = frame_image(&[0; 10]).unwrap_err();
        assert!(matches!(err, Error::FrameSize { got: 10, expected: PIXELS }));
    }

    #[test]
    fn pixels_keep_their_channels() {
        let mut frame = vec![0u32; PIXELS];
        frame[WIDTH + 2] = 0x00_10_20_30;
        let img = frame_image(&frame).unwrap();
        assert_eq!(img.get_pixel(2, 1).0, [0x10, 0x20, 0x30, 0xFF]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0xFF]);
    }
}
