mod assets;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use assets::{AssetError, AssetStore, ImageHandle};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use rendering::{text_width_px, DrawCommand, DrawList, PixelRect, Renderer, Rgba, TextSize, Viewport};
pub use scene::{InputSnapshot, Scene, SceneCommand, SceneLoadError};
