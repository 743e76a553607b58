use super::body::Rect;

/// Vertical motion against a flat ground line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PhysicsBody {
    pub(crate) velocity_y: f32,
    pub(crate) is_jumping: bool,
}

impl PhysicsBody {
    /// Starts a jump when grounded. Returns whether the jump was accepted.
    pub(crate) fn jump(&mut self, impulse: f32) -> bool {
        if self.is_jumping {
            return false;
        }
        self.velocity_y = impulse;
        self.is_jumping = true;
        true
    }

    pub(crate) fn step(&mut self, rect: &mut Rect, gravity: f32, ground_y: f32) {
        self.velocity_y += gravity;
        rect.y += self.velocity_y;
        if rect.bottom() > ground_y {
            rect.set_bottom(ground_y);
            self.velocity_y = 0.0;
            self.is_jumping = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAVITY: f32 = 0.8;
    const GROUND: f32 = 810.0;

    fn grounded_rect() -> Rect {
        Rect {
            x: 0.0,
            y: GROUND - 155.0,
            width: 175.0,
            height: 155.0,
        }
    }

    #[test]
    fn resting_body_stays_on_ground() {
        let mut body = PhysicsBody::default();
        let mut rect = grounded_rect();
        for _ in 0..10 {
            body.step(&mut rect, GRAVITY, GROUND);
        }
        assert_eq!(rect.bottom(), GROUND);
        assert_eq!(body.velocity_y, 0.0);
        assert!(!body.is_jumping);
    }

    #[test]
    fn jump_rises_then_lands() {
        let mut body = PhysicsBody::default();
        let mut rect = grounded_rect();
        assert!(body.jump(-18.0));

        body.step(&mut rect, GRAVITY, GROUND);
        assert!(rect.bottom() < GROUND);
        assert!(body.is_jumping);

        for _ in 0..200 {
            body.step(&mut rect, GRAVITY, GROUND);
        }
        assert_eq!(rect.bottom(), GROUND);
        assert!(!body.is_jumping);
    }

    #[test]
    fn mid_air_jump_requests_do_not_change_trajectory() {
        let mut single = PhysicsBody::default();
        let mut spammed = PhysicsBody::default();
        let mut single_rect = grounded_rect();
        let mut spammed_rect = grounded_rect();
        single.jump(-18.0);
        spammed.jump(-18.0);

        let mut airborne_ticks = 0;
        while single.is_jumping {
            assert!(!spammed.jump(-18.0), "jump accepted mid-air");
            single.step(&mut single_rect, GRAVITY, GROUND);
            spammed.step(&mut spammed_rect, GRAVITY, GROUND);
            assert_eq!(single.velocity_y, spammed.velocity_y);
            assert_eq!(single_rect.y, spammed_rect.y);
            airborne_ticks += 1;
            assert!(airborne_ticks < 1_000);
        }
        assert!(!spammed.is_jumping);
    }
}
