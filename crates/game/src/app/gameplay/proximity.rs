#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialoguePhase {
    Idle,
    PromptVisible,
    Chatting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChatEndReason {
    OutOfRange,
    FacingAway,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogueTransition {
    None,
    PromptShown,
    PromptHidden,
    ChatStarted,
    ChatEnded(ChatEndReason),
}

/// Geometry between player and enemy for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ProximitySample {
    pub(crate) distance: f32,
    pub(crate) facing_matches: bool,
}

impl ProximitySample {
    pub(crate) fn measure(player_center_x: f32, player_facing_right: bool, enemy_center_x: f32) -> Self {
        Self {
            distance: (enemy_center_x - player_center_x).abs(),
            facing_matches: facing_matches(player_facing_right, player_center_x, enemy_center_x),
        }
    }
}

/// The player faces the enemy when looking right at an enemy to the right,
/// or left at an enemy that is not to the right.
pub(crate) fn facing_matches(player_facing_right: bool, player_center_x: f32, enemy_center_x: f32) -> bool {
    player_facing_right == (enemy_center_x > player_center_x)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DialogueEdges {
    pub(crate) talk: bool,
    pub(crate) cancel: bool,
}

/// Idle / PromptVisible / Chatting controller. Makes at most one transition
/// per tick; the caller applies the side effects of the returned transition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProximityDialogue {
    phase: DialoguePhase,
    prompt_range: f32,
    chat_range: f32,
}

impl ProximityDialogue {
    pub(crate) fn new(prompt_range: f32, chat_range: f32) -> Self {
        Self {
            phase: DialoguePhase::Idle,
            prompt_range,
            chat_range,
        }
    }

    pub(crate) fn phase(&self) -> DialoguePhase {
        self.phase
    }

    pub(crate) fn is_chatting(&self) -> bool {
        self.phase == DialoguePhase::Chatting
    }

    pub(crate) fn step(&mut self, sample: ProximitySample, edges: DialogueEdges) -> DialogueTransition {
        let (next, transition) = match self.phase {
            DialoguePhase::Idle => {
                if sample.distance < self.prompt_range && sample.facing_matches {
                    (DialoguePhase::PromptVisible, DialogueTransition::PromptShown)
                } else {
                    return DialogueTransition::None;
                }
            }
            DialoguePhase::PromptVisible => {
                // Leaving is checked first so a talk press never opens a chat
                // out of range.
                if sample.distance >= self.prompt_range || !sample.facing_matches {
                    (DialoguePhase::Idle, DialogueTransition::PromptHidden)
                } else if edges.talk {
                    (DialoguePhase::Chatting, DialogueTransition::ChatStarted)
                } else {
                    return DialogueTransition::None;
                }
            }
            DialoguePhase::Chatting => {
                let reason = if edges.cancel {
                    ChatEndReason::Cancelled
                } else if sample.distance >= self.chat_range {
                    ChatEndReason::OutOfRange
                } else if !sample.facing_matches {
                    ChatEndReason::FacingAway
                } else {
                    return DialogueTransition::None;
                };
                (DialoguePhase::Idle, DialogueTransition::ChatEnded(reason))
            }
        };
        self.phase = next;
        transition
    }
}
