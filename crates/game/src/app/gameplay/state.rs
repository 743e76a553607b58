use std::time::{Duration, Instant};

use engine::{InputAction, InputSnapshot};
use tracing::{debug, info};

use super::animation::{AnimationState, SpriteRig};
use super::body::AnimatedBody;
use super::config::WorldSettings;
use super::dialogue::{DialogueSession, PollOutcome};
use super::patrol::PatrolAi;
use super::player::{PlayerController, PlayerIntent};
use super::proximity::{
    DialogueEdges, DialoguePhase, DialogueTransition, ProximityDialogue, ProximitySample,
};
use super::reply::{ReplyChannel, ReplyEvent};
use super::scroll::{ParallaxLayer, ScrollWorld};

/// Edges and typed text for one tick, read out of the engine snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TickInput {
    talk_pressed: bool,
    cancel_pressed: bool,
    backspace_pressed: bool,
    typed_text: String,
}

impl TickInput {
    fn from_snapshot(input: &InputSnapshot) -> Self {
        Self {
            talk_pressed: input.was_pressed(InputAction::Talk),
            cancel_pressed: input.was_pressed(InputAction::Cancel),
            backspace_pressed: input.was_pressed(InputAction::Backspace),
            typed_text: input.typed_text().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    QuitRequested,
}

/// Everything the simulation owns. One `tick` runs input, movement, scroll,
/// patrol, animation, dialogue transitions and dialogue polling, in that order.
pub(crate) struct GameState {
    settings: WorldSettings,
    pub(crate) player: AnimatedBody,
    pub(crate) player_controller: PlayerController,
    pub(crate) enemy: AnimatedBody,
    pub(crate) patrol: PatrolAi,
    pub(crate) scroll: ScrollWorld,
    proximity: ProximityDialogue,
    session: Option<DialogueSession>,
    reply_timeout: Duration,
    tick_count: u64,
}

impl GameState {
    pub(crate) fn new(
        settings: WorldSettings,
        player_rig: SpriteRig,
        enemy_rig: SpriteRig,
        layers: Vec<ParallaxLayer>,
        reply_timeout: Duration,
    ) -> Self {
        let ground_y = settings.ground_y();
        let player = AnimatedBody::new(
            player_rig,
            settings.player_spawn_center_x,
            ground_y,
            AnimationState::Idle,
            settings.animation_speed,
        );
        let enemy = AnimatedBody::new(
            enemy_rig,
            settings.enemy_spawn_center_x,
            ground_y,
            AnimationState::Walk,
            settings.animation_speed,
        );
        Self {
            settings,
            player,
            player_controller: PlayerController::default(),
            enemy,
            patrol: PatrolAi::new(settings.enemy_speed, settings.patrol_range),
            scroll: ScrollWorld::new(layers),
            proximity: ProximityDialogue::new(settings.prompt_range, settings.chat_range),
            session: None,
            reply_timeout,
            tick_count: 0,
        }
    }

    pub(crate) fn phase(&self) -> DialoguePhase {
        self.proximity.phase()
    }

    pub(crate) fn session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    pub(crate) fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub(crate) fn tick(
        &mut self,
        snapshot: &InputSnapshot,
        channel: &mut dyn ReplyChannel,
        now: Instant,
    ) -> TickOutcome {
        let input = TickInput::from_snapshot(snapshot);
        let chatting = self.proximity.is_chatting();
        if input.cancel_pressed && !chatting {
            return TickOutcome::QuitRequested;
        }
        self.tick_count = self.tick_count.wrapping_add(1);

        if chatting {
            self.edit_draft(&input);
        }

        let intent = PlayerIntent::from_input(snapshot, chatting);
        self.advance_world(intent);

        let sample = ProximitySample::measure(
            self.player.center_x(),
            self.player.facing_right,
            self.enemy.center_x(),
        );
        let transition = self.proximity.step(
            sample,
            DialogueEdges {
                talk: input.talk_pressed,
                cancel: input.cancel_pressed,
            },
        );
        self.apply_transition(transition, sample);

        self.poll_dialogue(channel, now);
        TickOutcome::Continue
    }

    fn edit_draft(&mut self, input: &TickInput) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if input.backspace_pressed {
            session.pop_char();
        }
        for ch in input.typed_text.chars() {
            session.push_char(ch);
        }
        if input.talk_pressed && session.submit_draft() {
            debug!(transcript_len = session.transcript().len(), "dialogue_player_submitted");
        }
    }

    /// Player movement, scroll shift, patrol and animation for one tick.
    fn advance_world(&mut self, intent: PlayerIntent) {
        let scroll_delta =
            self.player_controller
                .update(&mut self.player, intent, &self.settings);
        self.scroll.begin_tick(scroll_delta);
        self.scroll.shift_tracked(&mut self.enemy);
        self.patrol.update(&mut self.enemy, AnimationState::Idle);
        self.enemy.sync_rect();

        self.player.animate();
        self.enemy.animate();
    }

    fn apply_transition(&mut self, transition: DialogueTransition, sample: ProximitySample) {
        match transition {
            DialogueTransition::None => {}
            DialogueTransition::PromptShown => {
                debug!(distance = sample.distance, "dialogue_prompt_shown");
            }
            DialogueTransition::PromptHidden => {
                debug!(distance = sample.distance, "dialogue_prompt_hidden");
            }
            DialogueTransition::ChatStarted => {
                self.session = Some(DialogueSession::new(self.reply_timeout));
                self.patrol.engaged = true;
                self.enemy.state = AnimationState::Idle;
                info!(distance = sample.distance, "dialogue_chat_started");
            }
            DialogueTransition::ChatEnded(reason) => {
                let transcript_len = self
                    .session
                    .take()
                    .map_or(0, |session| session.transcript().len());
                self.patrol.engaged = false;
                info!(
                    reason = ?reason,
                    distance = sample.distance,
                    transcript_len,
                    "dialogue_chat_ended"
                );
            }
        }
    }

    fn poll_dialogue(&mut self, channel: &mut dyn ReplyChannel, now: Instant) {
        match self.session.as_mut() {
            Some(session) => {
                if session.poll(channel, now) == PollOutcome::Issued {
                    debug!(tick = self.tick_count, "dialogue_waiting_for_reply");
                }
            }
            None => {
                // Replies for a discarded chat have nowhere to go.
                while let Some(event) = channel.try_recv() {
                    if let ReplyEvent::Finished(reply) = event {
                        debug!(request_id = reply.id.0, "dialogue_stale_reply_dropped");
                    }
                }
            }
        }
    }
}
