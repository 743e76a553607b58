#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Attack,
    Talk,
    Cancel,
    Backspace,
}

const ACTION_COUNT: usize = 7;

/// Held state plus press edges for every action. An edge is raised only on
/// the transition from released to pressed, so OS key repeat never re-fires it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn press(&mut self, action: InputAction) {
        let index = action.index();
        if !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = true;
    }

    pub(crate) fn release(&mut self, action: InputAction) {
        self.down[action.index()] = false;
    }

    pub(crate) fn set_down(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn set_pressed(&mut self, action: InputAction, pressed: bool) {
        self.pressed[action.index()] = pressed;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_edges(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Attack => 3,
            InputAction::Talk => 4,
            InputAction::Cancel => 5,
            InputAction::Backspace => 6,
        }
    }
}
