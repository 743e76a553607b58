use engine::{ImageHandle, PixelRect};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AnimationState {
    Idle,
    Walk,
    Attack,
    Jump,
}

const STATE_COUNT: usize = 4;

impl AnimationState {
    const fn index(self) -> usize {
        match self {
            AnimationState::Idle => 0,
            AnimationState::Walk => 1,
            AnimationState::Attack => 2,
            AnimationState::Jump => 3,
        }
    }
}

/// One row of a sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AnimationClip {
    pub(crate) row: u32,
    pub(crate) frame_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SheetLayout {
    pub(crate) origin_x: u32,
    pub(crate) origin_y: u32,
    pub(crate) frame_width: u32,
    pub(crate) frame_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum AnimationConfigError {
    #[error("sprite sheet frames must have a non-zero size")]
    EmptyFrame,
    #[error("animation {state:?} has no frames")]
    NoFrames { state: AnimationState },
    #[error(
        "animation {state:?} needs {required_width}x{required_height} px but the sheet is {sheet_width}x{sheet_height}"
    )]
    FrameOutOfBounds {
        state: AnimationState,
        required_width: u64,
        required_height: u64,
        sheet_width: u32,
        sheet_height: u32,
    },
}

/// Fixed-size state lookup for one sprite sheet, validated against the sheet
/// size when built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnimationTable {
    layout: SheetLayout,
    clips: [Option<AnimationClip>; STATE_COUNT],
}

impl AnimationTable {
    pub(crate) fn new(
        layout: SheetLayout,
        clips: &[(AnimationState, AnimationClip)],
        (sheet_width, sheet_height): (u32, u32),
    ) -> Result<Self, AnimationConfigError> {
        if layout.frame_width == 0 || layout.frame_height == 0 {
            return Err(AnimationConfigError::EmptyFrame);
        }
        let mut table = [None; STATE_COUNT];
        for (state, clip) in clips {
            if clip.frame_count == 0 {
                return Err(AnimationConfigError::NoFrames { state: *state });
            }
            let required_width = u64::from(layout.origin_x)
                + u64::from(clip.frame_count) * u64::from(layout.frame_width);
            let required_height = u64::from(layout.origin_y)
                + (u64::from(clip.row) + 1) * u64::from(layout.frame_height);
            if required_width > u64::from(sheet_width) || required_height > u64::from(sheet_height)
            {
                return Err(AnimationConfigError::FrameOutOfBounds {
                    state: *state,
                    required_width,
                    required_height,
                    sheet_width,
                    sheet_height,
                });
            }
            table[state.index()] = Some(*clip);
        }
        Ok(Self {
            layout,
            clips: table,
        })
    }

    pub(crate) fn layout(&self) -> SheetLayout {
        self.layout
    }

    /// # Panics
    ///
    /// Panics when `state` is not part of this sheet. Behaviours only select
    /// states their sheet defines, so hitting this is a programming error.
    pub(crate) fn clip(&self, state: AnimationState) -> AnimationClip {
        self.clips[state.index()].unwrap_or_else(|| {
            panic!("animation state {state:?} is not defined for this sprite sheet")
        })
    }
}

/// Sprite sheet image plus the table describing its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpriteRig {
    pub(crate) image: ImageHandle,
    pub(crate) table: AnimationTable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AnimationController {
    frame_index: f32,
    speed: f32,
}

impl AnimationController {
    pub(crate) fn new(speed: f32) -> Self {
        Self {
            frame_index: 0.0,
            speed,
        }
    }

    #[cfg(test)]
    pub(crate) fn frame_index(&self) -> f32 {
        self.frame_index
    }

    /// Advances within `state`'s clip. The index is kept across state
    /// changes and simply wraps into the new clip's range.
    pub(crate) fn advance(&mut self, table: &AnimationTable, state: AnimationState) {
        let frame_count = table.clip(state).frame_count as f32;
        self.frame_index = (self.frame_index + self.speed).rem_euclid(frame_count);
    }

    pub(crate) fn frame_rect(&self, table: &AnimationTable, state: AnimationState) -> PixelRect {
        let clip = table.clip(state);
        let layout = table.layout();
        let column = (self.frame_index.max(0.0).floor() as u32).min(clip.frame_count - 1);
        PixelRect::new(
            (column * layout.frame_width + layout.origin_x) as i32,
            (clip.row * layout.frame_height + layout.origin_y) as i32,
            layout.frame_width,
            layout.frame_height,
        )
    }
}

pub(crate) const KNIGHT_LAYOUT: SheetLayout = SheetLayout {
    origin_x: 5,
    origin_y: 3,
    frame_width: 175,
    frame_height: 155,
};

pub(crate) const KNIGHT_CLIPS: [(AnimationState, AnimationClip); 4] = [
    (AnimationState::Idle, AnimationClip { row: 0, frame_count: 4 }),
    (AnimationState::Walk, AnimationClip { row: 1, frame_count: 8 }),
    (AnimationState::Attack, AnimationClip { row: 2, frame_count: 6 }),
    (AnimationState::Jump, AnimationClip { row: 3, frame_count: 5 }),
];

pub(crate) const MONSTER_LAYOUT: SheetLayout = SheetLayout {
    origin_x: 0,
    origin_y: 2,
    frame_width: 170,
    frame_height: 153,
};

pub(crate) const MONSTER_CLIPS: [(AnimationState, AnimationClip); 3] = [
    (AnimationState::Idle, AnimationClip { row: 0, frame_count: 4 }),
    (AnimationState::Walk, AnimationClip { row: 1, frame_count: 7 }),
    (AnimationState::Attack, AnimationClip { row: 2, frame_count: 5 }),
];
