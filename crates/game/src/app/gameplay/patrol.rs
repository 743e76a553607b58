use super::animation::AnimationState;
use super::body::AnimatedBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PatrolDirection {
    MovingRight,
    MovingLeft,
}

/// Back-and-forth patrol around the spawn point. The timer is the signed
/// distance walked since spawn, so scroll never skews the patrol bounds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PatrolAi {
    pub(crate) direction: PatrolDirection,
    pub(crate) patrol_timer: f32,
    pub(crate) engaged: bool,
    speed: f32,
    range: f32,
}

impl PatrolAi {
    pub(crate) fn new(speed: f32, range: f32) -> Self {
        Self {
            direction: PatrolDirection::MovingRight,
            patrol_timer: 0.0,
            engaged: false,
            speed,
            range,
        }
    }

    /// Runs after the scroll shift for the tick. While engaged the body holds
    /// still in `engaged_state`.
    pub(crate) fn update(&mut self, body: &mut AnimatedBody, engaged_state: AnimationState) {
        if self.engaged {
            body.state = engaged_state;
            return;
        }

        let step = match self.direction {
            PatrolDirection::MovingRight => self.speed,
            PatrolDirection::MovingLeft => -self.speed,
        };
        body.world_x += step;
        self.patrol_timer += step;
        if self.patrol_timer > self.range {
            self.direction = PatrolDirection::MovingLeft;
        } else if self.patrol_timer < -self.range {
            self.direction = PatrolDirection::MovingRight;
        }
        body.facing_right = self.direction == PatrolDirection::MovingRight;
        body.state = AnimationState::Walk;
    }
}
