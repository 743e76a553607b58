use crate::app::assets::ImageHandle;

pub type Rgba = [u8; 4];

const DEFAULT_CLEAR_COLOR: Rgba = [20, 22, 28, 255];

/// Rectangle in buffer pixels. `x`/`y` may be negative; drawing clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Small,
    Large,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Copies `source` out of `image` with its top-left corner at
    /// `(dest_x, dest_y)`. Fully transparent source pixels are skipped.
    Blit {
        image: ImageHandle,
        source: PixelRect,
        dest_x: i32,
        dest_y: i32,
        flip_x: bool,
    },
    FillRect {
        rect: PixelRect,
        color: Rgba,
    },
    OutlineRect {
        rect: PixelRect,
        color: Rgba,
    },
    Text {
        text: String,
        size: TextSize,
        color: Rgba,
        x: i32,
        y: i32,
    },
}

/// Commands for one frame, executed in push order.
#[derive(Debug, Clone)]
pub struct DrawList {
    clear_color: Rgba,
    commands: Vec<DrawCommand>,
}

impl Default for DrawList {
    fn default() -> Self {
        Self {
            clear_color: DEFAULT_CLEAR_COLOR,
            commands: Vec::new(),
        }
    }
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.clear_color = DEFAULT_CLEAR_COLOR;
        self.commands.clear();
    }

    pub fn set_clear_color(&mut self, color: Rgba) {
        self.clear_color = color;
    }

    pub fn clear_color(&self) -> Rgba {
        self.clear_color
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn blit(&mut self, image: ImageHandle, source: PixelRect, dest: (i32, i32), flip_x: bool) {
        self.commands.push(DrawCommand::Blit {
            image,
            source,
            dest_x: dest.0,
            dest_y: dest.1,
            flip_x,
        });
    }

    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    pub fn outline_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.commands.push(DrawCommand::OutlineRect { rect, color });
    }

    pub fn text(&mut self, text: impl Into<String>, size: TextSize, color: Rgba, at: (i32, i32)) {
        self.commands.push(DrawCommand::Text {
            text: text.into(),
            size,
            color,
            x: at.0,
            y: at.1,
        });
    }
}
