use engine::{InputAction, InputSnapshot};

use super::animation::AnimationState;
use super::body::AnimatedBody;
use super::config::WorldSettings;
use super::physics::PhysicsBody;

/// Per-tick movement intent. Left wins when both directions are held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PlayerIntent {
    pub(crate) move_left: bool,
    pub(crate) move_right: bool,
    pub(crate) jump: bool,
    pub(crate) attack: bool,
}

impl PlayerIntent {
    /// While chatting the jump and attack keys are typing text, so only
    /// walking is read.
    pub(crate) fn from_input(input: &InputSnapshot, chatting: bool) -> Self {
        Self {
            move_left: input.is_down(InputAction::MoveLeft),
            move_right: input.is_down(InputAction::MoveRight),
            jump: !chatting && input.is_down(InputAction::Jump),
            attack: !chatting && input.is_down(InputAction::Attack),
        }
    }

    /// Signed horizontal direction: -1, 0 or 1.
    pub(crate) fn direction(&self) -> f32 {
        if self.move_left {
            -1.0
        } else if self.move_right {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PlayerController {
    pub(crate) physics: PhysicsBody,
}

impl PlayerController {
    /// Moves the player for one tick and returns the scroll delta implied by
    /// the intent, whether or not the player actually moved.
    pub(crate) fn update(
        &mut self,
        body: &mut AnimatedBody,
        intent: PlayerIntent,
        settings: &WorldSettings,
    ) -> f32 {
        let direction = intent.direction();
        let scroll_delta = direction * settings.player_speed;
        let moving = direction != 0.0;
        if moving {
            body.facing_right = direction > 0.0;
            let max_x = (settings.screen_width - body.rect.width).max(0.0);
            body.world_x = (body.world_x + scroll_delta).clamp(0.0, max_x);
        }
        if intent.jump {
            self.physics.jump(settings.jump_impulse);
        }

        body.state = if self.physics.is_jumping {
            AnimationState::Jump
        } else if intent.attack {
            AnimationState::Attack
        } else if moving {
            AnimationState::Walk
        } else {
            AnimationState::Idle
        };

        body.sync_rect();
        self.physics
            .step(&mut body.rect, settings.gravity, settings.ground_y());
        scroll_delta
    }
}
