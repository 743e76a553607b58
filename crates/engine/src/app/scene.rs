use thiserror::Error;

use super::assets::{AssetError, AssetStore};
use super::input::{ActionStates, InputAction};
use super::rendering::{DrawList, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("invalid scene configuration: {0}")]
    Config(String),
}

/// Input as seen by a single simulation tick. Press edges and typed text are
/// delivered to exactly one tick and then cleared by the collector.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    typed_text: String,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, actions: ActionStates, typed_text: String) -> Self {
        Self {
            quit_requested,
            actions,
            typed_text,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn typed_text(&self) -> &str {
        &self.typed_text
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set_down(action, is_down);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction, pressed: bool) -> Self {
        self.actions.set_pressed(action, pressed);
        if pressed {
            self.actions.set_down(action, true);
        }
        self
    }

    pub fn with_typed_text(mut self, text: &str) -> Self {
        self.typed_text = text.to_string();
        self
    }
}

pub trait Scene {
    /// Loads assets and builds runtime state. Errors here are fatal and are
    /// reported before the event loop starts.
    fn load(&mut self, assets: &mut AssetStore, viewport: Viewport) -> Result<(), SceneLoadError>;
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render(&self, draw_list: &mut DrawList);
    fn unload(&mut self) {}
    fn debug_title(&self) -> Option<String> {
        None
    }
}
