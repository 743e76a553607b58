mod draw_list;
mod raster;
mod renderer;
mod text;

pub use draw_list::{DrawCommand, DrawList, PixelRect, Rgba, TextSize};
pub use renderer::Renderer;
pub use text::text_width_px;

/// Size of the pixel buffer scenes draw into. Independent of the window's
/// surface size; pixels scales the buffer to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
