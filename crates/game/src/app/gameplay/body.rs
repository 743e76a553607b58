use engine::DrawList;

use super::animation::{AnimationController, AnimationState, SpriteRig};

/// Screen-space rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rect {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Rect {
    pub(crate) fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub(crate) fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub(crate) fn set_bottom(&mut self, bottom: f32) {
        self.y = bottom - self.height;
    }
}

/// Data shared by every animated entity. Behaviour lives in the owner
/// (`PlayerController` or `PatrolAi`), which mutates `state` once per tick.
#[derive(Debug, Clone)]
pub(crate) struct AnimatedBody {
    pub(crate) world_x: f32,
    pub(crate) rect: Rect,
    pub(crate) facing_right: bool,
    pub(crate) state: AnimationState,
    pub(crate) animation: AnimationController,
    pub(crate) rig: SpriteRig,
}

impl AnimatedBody {
    /// Places the body with its horizontal center at `center_x` and its feet
    /// on `bottom`.
    pub(crate) fn new(
        rig: SpriteRig,
        center_x: f32,
        bottom: f32,
        state: AnimationState,
        animation_speed: f32,
    ) -> Self {
        let layout = rig.table.layout();
        let width = layout.frame_width as f32;
        let height = layout.frame_height as f32;
        let world_x = center_x - width / 2.0;
        Self {
            world_x,
            rect: Rect {
                x: world_x,
                y: bottom - height,
                width,
                height,
            },
            facing_right: true,
            state,
            animation: AnimationController::new(animation_speed),
            rig,
        }
    }

    pub(crate) fn center_x(&self) -> f32 {
        self.rect.center_x()
    }

    /// Re-derives the screen x from `world_x`.
    pub(crate) fn sync_rect(&mut self) {
        self.rect.x = self.world_x;
    }

    pub(crate) fn animate(&mut self) {
        self.animation.advance(&self.rig.table, self.state);
    }

    pub(crate) fn render(&self, draw_list: &mut DrawList) {
        let source = self.animation.frame_rect(&self.rig.table, self.state);
        draw_list.blit(
            self.rig.image,
            source,
            (self.rect.x.round() as i32, self.rect.y.round() as i32),
            !self.facing_right,
        );
    }
}
