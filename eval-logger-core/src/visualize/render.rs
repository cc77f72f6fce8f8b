//! Image layout and encoding helpers.
use crate::episode::Frame;
use anyhow::Result;
use image::{
    codecs::{gif::GifEncoder, png::PngEncoder},
    imageops::{resize, FilterType::Triangle},
    ColorType, Delay, Frame as GifFrame, GenericImage, ImageEncoder, Rgb, Rgba, RgbaImage,
};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const BAR: Rgb<u8> = Rgb([31, 119, 180]);
const AXIS: Rgb<u8> = Rgb([160, 160, 160]);

/// Resizes a frame to `(width, height)`.
pub fn resize_frame(frame: &Frame, size: (u32, u32)) -> Frame {
    if frame.dimensions() == size {
        return frame.clone();
    }
    resize(frame, size.0, size.1, Triangle)
}

/// Places frames side by side, top-aligned.
pub fn hconcat(frames: &[Frame]) -> Result<Frame> {
    let width = frames.iter().map(|f| f.width()).sum();
    let height = frames.iter().map(|f| f.height()).max().unwrap_or(0);
    let mut out = Frame::from_pixel(width, height, BACKGROUND);
    let mut x = 0;
    for f in frames.iter() {
        out.copy_from(f, x, 0)?;
        x += f.width();
    }
    Ok(out)
}

/// Stacks frames on top of each other, left-aligned.
pub fn vconcat(frames: &[Frame]) -> Result<Frame> {
    let width = frames.iter().map(|f| f.width()).max().unwrap_or(0);
    let height = frames.iter().map(|f| f.height()).sum();
    let mut out = Frame::from_pixel(width, height, BACKGROUND);
    let mut y = 0;
    for f in frames.iter() {
        out.copy_from(f, 0, y)?;
        y += f.height();
    }
    Ok(out)
}

/// Draws one bar per value in `[0, 1]`, each `bar_width` wide.
///
/// A grey baseline runs along the bottom row.
pub fn bar_strip(values: &[f32], bar_width: u32, height: u32) -> Frame {
    let width = bar_width * values.len() as u32;
    let mut out = Frame::from_pixel(width.max(1), height.max(1), BACKGROUND);
    if height < 2 {
        return out;
    }
    let usable = height - 1;
    let margin = bar_width / 8;
    for (i, v) in values.iter().enumerate() {
        let bar_height = (v.max(0.0).min(1.0) * usable as f32).round() as u32;
        let x0 = i as u32 * bar_width + margin;
        let x1 = (i as u32 + 1) * bar_width - margin;
        for x in x0..x1 {
            for y in (usable - bar_height)..usable {
                out.put_pixel(x, y, BAR);
            }
        }
    }
    for x in 0..width {
        out.put_pixel(x, usable, AXIS);
    }
    out
}

/// Encodes a frame as PNG.
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf)
}

/// Encodes frames as an animated GIF played at `fps`.
pub fn encode_gif(frames: &[Frame], fps: u32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        let delay = Delay::from_numer_denom_ms(1000, fps.max(1));
        for f in frames.iter() {
            let rgba = RgbaImage::from_fn(f.width(), f.height(), |x, y| {
                let p = f.get_pixel(x, y);
                Rgba([p[0], p[1], p[2], 255])
            });
            encoder.encode_frame(GifFrame::from_parts(rgba, 0, 0, delay))?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hconcat_and_vconcat_sizes() -> Result<()> {
        let a = Frame::from_pixel(4, 3, Rgb([1, 2, 3]));
        let b = Frame::from_pixel(5, 3, Rgb([4, 5, 6]));
        let h = hconcat(&[a.clone(), b.clone()])?;
        assert_eq!(h.dimensions(), (9, 3));
        assert_eq!(h.get_pixel(4, 0), &Rgb([4, 5, 6]));

        let v = vconcat(&[a, b])?;
        assert_eq!(v.dimensions(), (5, 6));
        assert_eq!(v.get_pixel(0, 0), &Rgb([1, 2, 3]));
        Ok(())
    }

    #[test]
    fn test_bar_strip_height_follows_value() {
        let strip = bar_strip(&[0.0, 1.0], 8, 11);
        assert_eq!(strip.dimensions(), (16, 11));
        // Full bar reaches the top row, empty bar leaves it blank.
        assert_eq!(strip.get_pixel(12, 0), &BAR);
        assert_eq!(strip.get_pixel(4, 0), &BACKGROUND);
        assert_eq!(strip.get_pixel(4, 10), &AXIS);
    }

    #[test]
    fn test_encoders_emit_signatures() -> Result<()> {
        let frames = vec![Frame::from_pixel(6, 4, Rgb([10, 20, 30])); 2];
        let png = encode_png(&frames[0])?;
        assert_eq!(&png[1..4], b"PNG");
        let gif = encode_gif(&frames, 10)?;
        assert_eq!(&gif[..3], b"GIF");
        Ok(())
    }
}
