use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use tracing::warn;
use winit::window::Window;

use crate::app::assets::AssetStore;

use super::draw_list::{DrawCommand, DrawList};
use super::raster::{blit_clipped, clear, fill_rect_clipped, outline_rect_clipped};
use super::text::draw_text_clipped;
use super::Viewport;

/// Owns the pixel buffer and presents scene draw lists. The buffer keeps the
/// size it was created with; window resizes only rescale the surface.
pub struct Renderer {
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>, buffer_width: u32, buffer_height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, window);
        let pixels = Pixels::new(buffer_width, buffer_height, surface)?;
        Ok(Self {
            pixels,
            viewport: Viewport {
                width: buffer_width,
                height: buffer_height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Executes the draw list into the frame buffer, then presents it.
    pub fn render(&mut self, draw_list: &DrawList, assets: &AssetStore) -> Result<(), Error> {
        execute_draw_list(
            self.pixels.frame_mut(),
            self.viewport,
            draw_list,
            assets,
        );
        self.pixels.render()
    }
}

pub(crate) fn execute_draw_list(
    frame: &mut [u8],
    viewport: Viewport,
    draw_list: &DrawList,
    assets: &AssetStore,
) {
    let Viewport { width, height } = viewport;
    if width == 0 || height == 0 {
        return;
    }
    clear(frame, draw_list.clear_color());
    for command in draw_list.commands() {
        match command {
            DrawCommand::Blit {
                image,
                source,
                dest_x,
                dest_y,
                flip_x,
            } => match assets.image(*image) {
                Some(loaded) => blit_clipped(
                    frame,
                    width,
                    height,
                    loaded,
                    *source,
                    (*dest_x, *dest_y),
                    *flip_x,
                ),
                None => warn!(handle = ?image, "renderer_unknown_image_handle"),
            },
            DrawCommand::FillRect { rect, color } => {
                fill_rect_clipped(frame, width, height, *rect, *color)
            }
            DrawCommand::OutlineRect { rect, color } => {
                outline_rect_clipped(frame, width, height, *rect, *color)
            }
            DrawCommand::Text {
                text,
                size,
                color,
                x,
                y,
            } => draw_text_clipped(frame, width, height, (*x, *y), text, *size, *color),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::app::rendering::{PixelRect, TextSize};

    const VIEWPORT: Viewport = Viewport {
        width: 8,
        height: 8,
    };

    fn frame() -> Vec<u8> {
        vec![0u8; (VIEWPORT.width * VIEWPORT.height * 4) as usize]
    }

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * VIEWPORT.width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn renderer_type_is_non_generic() {
        let _renderer: Option<Renderer> = None;
    }

    #[test]
    fn empty_list_clears_to_clear_color() {
        let mut frame = frame();
        let mut list = DrawList::new();
        list.set_clear_color([1, 2, 3, 255]);

        execute_draw_list(&mut frame, VIEWPORT, &list, &AssetStore::new(PathBuf::new()));

        assert!(frame.chunks_exact(4).all(|px| px == [1, 2, 3, 255]));
    }

    #[test]
    fn later_commands_draw_over_earlier_ones() {
        let mut frame = frame();
        let mut list = DrawList::new();
        list.fill_rect(PixelRect::new(0, 0, 8, 8), [255, 0, 0, 255]);
        list.fill_rect(PixelRect::new(0, 0, 2, 2), [0, 255, 0, 255]);

        execute_draw_list(&mut frame, VIEWPORT, &list, &AssetStore::new(PathBuf::new()));

        assert_eq!(pixel(&frame, 0, 0), [0, 255, 0, 255]);
        assert_eq!(pixel(&frame, 5, 5), [255, 0, 0, 255]);
    }

    #[test]
    fn blit_reads_from_asset_store() {
        let mut assets = AssetStore::new(PathBuf::new());
        let handle = assets
            .insert_rgba("knight", 1, 1, vec![7, 8, 9, 255])
            .expect("insert");
        let mut list = DrawList::new();
        list.blit(handle, PixelRect::new(0, 0, 1, 1), (3, 4), false);
        let mut frame = frame();

        execute_draw_list(&mut frame, VIEWPORT, &list, &assets);

        assert_eq!(pixel(&frame, 3, 4), [7, 8, 9, 255]);
    }

    #[test]
    fn text_command_draws_glyph_pixels() {
        let mut list = DrawList::new();
        list.set_clear_color([0, 0, 0, 255]);
        list.text("T", TextSize::Small, [255, 255, 255, 255], (0, 0));
        let mut frame = frame();

        execute_draw_list(&mut frame, VIEWPORT, &list, &AssetStore::new(PathBuf::new()));

        assert_eq!(pixel(&frame, 0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn zero_viewport_is_a_no_op() {
        let mut empty: Vec<u8> = Vec::new();
        let list = DrawList::new();
        execute_draw_list(
            &mut empty,
            Viewport {
                width: 0,
                height: 0,
            },
            &list,
            &AssetStore::new(PathBuf::new()),
        );
    }
}
