use crate::app::assets::LoadedImage;

use super::draw_list::{PixelRect, Rgba};

pub(crate) fn clear(frame: &mut [u8], color: Rgba) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

fn pixel_byte_range(width: u32, height: u32, x: i32, y: i32) -> Option<std::ops::Range<usize>> {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return None;
    }
    let pixel_offset = (y as usize)
        .checked_mul(width as usize)
        .and_then(|row| row.checked_add(x as usize))?;
    let byte_offset = pixel_offset.checked_mul(4)?;
    let end = byte_offset.checked_add(4)?;
    Some(byte_offset..end)
}

pub(crate) fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    color: Rgba,
) {
    let Some(range) = pixel_byte_range(width, height, x, y) else {
        return;
    };
    if let Some(pixel) = frame.get_mut(range) {
        pixel.copy_from_slice(&color);
    }
}

/// Source-over blend with the frame treated as opaque.
fn blend_pixel_clipped(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: Rgba) {
    let alpha = u16::from(color[3]);
    if alpha == 255 {
        write_pixel_rgba_clipped(frame, width, height, x, y, color);
        return;
    }
    if alpha == 0 {
        return;
    }
    let Some(range) = pixel_byte_range(width, height, x, y) else {
        return;
    };
    let Some(pixel) = frame.get_mut(range) else {
        return;
    };
    for channel in 0..3 {
        let src = u16::from(color[channel]);
        let dst = u16::from(pixel[channel]);
        pixel[channel] = ((src * alpha + dst * (255 - alpha)) / 255) as u8;
    }
    pixel[3] = 255;
}

/// Intersection of `rect` with the frame as half-open pixel ranges.
fn clip_rect(width: u32, height: u32, rect: PixelRect) -> Option<(i32, i32, i32, i32)> {
    let left = rect.x.max(0);
    let top = rect.y.max(0);
    let right = rect.right().min(width as i32);
    let bottom = rect.bottom().min(height as i32);
    if left >= right || top >= bottom {
        return None;
    }
    Some((left, top, right, bottom))
}

pub(crate) fn fill_rect_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: PixelRect,
    color: Rgba,
) {
    let Some((left, top, right, bottom)) = clip_rect(width, height, rect) else {
        return;
    };
    for y in top..bottom {
        for x in left..right {
            blend_pixel_clipped(frame, width, height, x, y, color);
        }
    }
}

pub(crate) fn outline_rect_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: PixelRect,
    color: Rgba,
) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let left = rect.x;
    let top = rect.y;
    let right = rect.right() - 1;
    let bottom = rect.bottom() - 1;
    for x in left..=right {
        write_pixel_rgba_clipped(frame, width, height, x, top, color);
        write_pixel_rgba_clipped(frame, width, height, x, bottom, color);
    }
    for y in top..=bottom {
        write_pixel_rgba_clipped(frame, width, height, left, y, color);
        write_pixel_rgba_clipped(frame, width, height, right, y, color);
    }
}

/// Copies a sub-region of `image` into the frame. The source rect is clipped
/// to the image first, so an oversized source never reads out of bounds.
pub(crate) fn blit_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    image: &LoadedImage,
    source: PixelRect,
    (dest_x, dest_y): (i32, i32),
    flip_x: bool,
) {
    let expected_rgba_len = image.width as usize * image.height as usize * 4;
    if image.rgba.len() < expected_rgba_len {
        return;
    }
    let Some((src_left, src_top, src_right, src_bottom)) =
        clip_rect(image.width, image.height, source)
    else {
        return;
    };
    let src_w = src_right - src_left;
    let src_h = src_bottom - src_top;
    // Shift the destination by however much of the source was clipped away.
    let dest_left = dest_x + (src_left - source.x);
    let dest_top = dest_y + (src_top - source.y);
    let dest = PixelRect::new(dest_left, dest_top, src_w as u32, src_h as u32);
    let Some((draw_left, draw_top, draw_right, draw_bottom)) = clip_rect(width, height, dest)
    else {
        return;
    };

    let image_width = image.width as usize;
    for out_y in draw_top..draw_bottom {
        let src_y = (src_top + (out_y - dest_top)) as usize;
        for out_x in draw_left..draw_right {
            let dx = out_x - dest_left;
            let src_x = if flip_x {
                src_left + (src_w - 1 - dx)
            } else {
                src_left + dx
            };
            let src_offset = (src_y * image_width + src_x as usize) * 4;
            let alpha = image.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let dst_offset = (out_y as usize * width as usize + out_x as usize) * 4;
            frame[dst_offset..dst_offset + 3].copy_from_slice(&image.rgba[src_offset..src_offset + 3]);
            frame[dst_offset + 3] = alpha;
        }
    }
}
