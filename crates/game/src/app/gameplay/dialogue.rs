use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::reply::{GeneratorError, GeneratorReply, ReplyChannel, ReplyEvent, RequestId};

pub(crate) const OPENING_LINE: &str = "Grrr... Who dares wander into my forest?";
pub(crate) const FALLBACK_LINE: &str = "The monster falls silent.";
pub(crate) const MAX_DRAFT_CHARS: usize = 120;
pub(crate) const CONTEXT_LINES: usize = 8;
pub(crate) const MAX_REPLY_LINES: usize = 2;

const PERSONA: &str = "You are a grumpy but curious forest monster in a side-scrolling \
game. A knight has walked up to you and is talking to you. Stay in character and answer \
in at most two short sentences.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Speaker {
    Player,
    Monster,
}

impl Speaker {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Speaker::Player => "Player",
            Speaker::Monster => "Monster",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TranscriptLine {
    pub(crate) speaker: Speaker,
    pub(crate) text: String,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: RequestId,
    issued_at: Instant,
    started_at: Option<Instant>,
}

impl InFlight {
    /// The reply timeout runs from the moment the generator starts. Until
    /// then the request may sit behind one abandoned call, which is itself
    /// bounded by the timeout.
    fn timed_out(&self, now: Instant, reply_timeout: Duration) -> bool {
        match self.started_at {
            Some(started_at) => now.saturating_duration_since(started_at) >= reply_timeout,
            None => {
                now.saturating_duration_since(self.issued_at) >= reply_timeout.saturating_mul(2)
            }
        }
    }
}

/// What a single `poll` changed, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    Idle,
    Waiting,
    Issued,
    Replied,
    Failed,
}

/// Transcript, draft and the single in-flight generator request of one chat.
/// `pending_request` is true from an accepted submit until a reply, failure
/// or timeout is recorded.
#[derive(Debug)]
pub(crate) struct DialogueSession {
    transcript: Vec<TranscriptLine>,
    pending_request: bool,
    draft_input: String,
    in_flight: Option<InFlight>,
    reply_timeout: Duration,
}

impl DialogueSession {
    pub(crate) fn new(reply_timeout: Duration) -> Self {
        Self {
            transcript: vec![TranscriptLine {
                speaker: Speaker::Monster,
                text: OPENING_LINE.to_string(),
            }],
            pending_request: false,
            draft_input: String::new(),
            in_flight: None,
            reply_timeout,
        }
    }

    pub(crate) fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending_request
    }

    pub(crate) fn draft(&self) -> &str {
        &self.draft_input
    }

    /// Appends a player line and marks a reply as pending. Blank text or a
    /// submit while a reply is pending is ignored.
    pub(crate) fn submit(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.pending_request {
            return false;
        }
        self.transcript.push(TranscriptLine {
            speaker: Speaker::Player,
            text: text.to_string(),
        });
        self.pending_request = true;
        true
    }

    /// Submits the draft. The draft is kept when the submit is rejected.
    pub(crate) fn submit_draft(&mut self) -> bool {
        let draft = std::mem::take(&mut self.draft_input);
        if self.submit(&draft) {
            true
        } else {
            self.draft_input = draft;
            false
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        if ch.is_control() || self.draft_input.chars().count() >= MAX_DRAFT_CHARS {
            return;
        }
        self.draft_input.push(ch);
    }

    pub(crate) fn pop_char(&mut self) {
        self.draft_input.pop();
    }

    /// Called once per tick: issues the pending request, drains replies and
    /// enforces the reply timeout.
    pub(crate) fn poll(&mut self, channel: &mut dyn ReplyChannel, now: Instant) -> PollOutcome {
        let mut outcome = PollOutcome::Idle;
        if self.pending_request && self.in_flight.is_none() {
            let prompt = build_prompt(&self.transcript);
            match channel.send(prompt) {
                Ok(id) => {
                    debug!(request_id = id.0, "dialogue_request_issued");
                    self.in_flight = Some(InFlight {
                        id,
                        issued_at: now,
                        started_at: None,
                    });
                    outcome = PollOutcome::Issued;
                }
                Err(error) => {
                    self.fail(&error);
                    return PollOutcome::Failed;
                }
            }
        }

        while let Some(event) = channel.try_recv() {
            let reply = match event {
                ReplyEvent::Started(id) => {
                    self.mark_started(id, now);
                    continue;
                }
                ReplyEvent::Finished(reply) => reply,
            };
            if let Some(outcome) = self.accept_reply(reply, now) {
                return outcome;
            }
        }

        if let Some(in_flight) = self.in_flight {
            if in_flight.timed_out(now, self.reply_timeout) {
                warn!(
                    request_id = in_flight.id.0,
                    timeout_ms = self.reply_timeout.as_millis() as u64,
                    started = in_flight.started_at.is_some(),
                    "dialogue_reply_timed_out"
                );
                self.push_monster_line(FALLBACK_LINE.to_string());
                return PollOutcome::Failed;
            }
            if outcome == PollOutcome::Idle {
                outcome = PollOutcome::Waiting;
            }
        }
        outcome
    }

    fn mark_started(&mut self, id: RequestId, now: Instant) {
        match self.in_flight.as_mut() {
            Some(in_flight) if in_flight.id == id => {
                debug!(
                    request_id = id.0,
                    queued_ms = now.saturating_duration_since(in_flight.issued_at).as_millis() as u64,
                    "dialogue_request_started"
                );
                in_flight.started_at = Some(now);
            }
            _ => debug!(request_id = id.0, "dialogue_stale_start_ignored"),
        }
    }

    /// `None` when the reply belongs to an older request.
    fn accept_reply(&mut self, reply: GeneratorReply, now: Instant) -> Option<PollOutcome> {
        let in_flight = match self.in_flight {
            Some(in_flight) if in_flight.id == reply.id => in_flight,
            _ => {
                debug!(request_id = reply.id.0, "dialogue_stale_reply_dropped");
                return None;
            }
        };
        let cleaned = reply
            .result
            .and_then(|raw| clean_reply(&raw).ok_or(GeneratorError::Empty));
        Some(match cleaned {
            Ok(text) => {
                info!(
                    request_id = in_flight.id.0,
                    elapsed_ms = now.saturating_duration_since(in_flight.issued_at).as_millis() as u64,
                    "dialogue_reply_received"
                );
                self.push_monster_line(text);
                PollOutcome::Replied
            }
            Err(error) => {
                self.fail(&error);
                PollOutcome::Failed
            }
        })
    }

    fn fail(&mut self, error: &GeneratorError) {
        warn!(error = %error, "dialogue_reply_failed");
        self.push_monster_line(FALLBACK_LINE.to_string());
    }

    fn push_monster_line(&mut self, text: String) {
        self.transcript.push(TranscriptLine {
            speaker: Speaker::Monster,
            text,
        });
        self.pending_request = false;
        self.in_flight = None;
    }
}

/// Persona, then up to `CONTEXT_LINES` earlier lines, then the player's last
/// utterance.
pub(crate) fn build_prompt(transcript: &[TranscriptLine]) -> String {
    let (utterance, history) = match transcript.split_last() {
        Some((last, history)) if last.speaker == Speaker::Player => (last.text.as_str(), history),
        _ => ("", transcript),
    };
    let context_start = history.len().saturating_sub(CONTEXT_LINES);

    let mut prompt = String::from(PERSONA);
    prompt.push_str("\n\nConversation so far:\n");
    for line in &history[context_start..] {
        prompt.push_str(line.speaker.label());
        prompt.push_str(": ");
        prompt.push_str(&line.text);
        prompt.push('\n');
    }
    prompt.push_str("\nPlayer says: ");
    prompt.push_str(utterance);
    prompt.push_str("\nMonster replies:");
    prompt
}

/// Trims the reply to its first `MAX_REPLY_LINES` non-empty lines. `None`
/// when nothing is left.
pub(crate) fn clean_reply(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_REPLY_LINES)
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::thread;

    use super::*;
    use crate::app::gameplay::reply::{
        InlineReplyChannel, ResponseGenerator, ThreadedReplyChannel,
    };

    const TIMEOUT: Duration = Duration::from_secs(22);

    struct Fixed(&'static str);

    impl ResponseGenerator for Fixed {
        fn generate(&self, _prompt: &str) -> Result<String, GeneratorError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl ResponseGenerator for Failing {
        fn generate(&self, _prompt: &str) -> Result<String, GeneratorError> {
            Err(GeneratorError::Api {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    /// Answers "first" and "second" differently after a fixed delay.
    struct Slow(Duration);

    impl ResponseGenerator for Slow {
        fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
            thread::sleep(self.0);
            if prompt.ends_with("Player says: second\nMonster replies:") {
                Ok("Second answer.".to_string())
            } else {
                Ok("First answer.".to_string())
            }
        }
    }

    /// Hands out ids but only delivers what the test queues by hand. Requests
    /// start as soon as they are sent unless `hold_start` is set.
    #[derive(Default)]
    struct Manual {
        next: u64,
        sent: Vec<String>,
        hold_start: bool,
        queued: VecDeque<ReplyEvent>,
    }

    impl ReplyChannel for Manual {
        fn send(&mut self, prompt: String) -> Result<RequestId, GeneratorError> {
            self.next += 1;
            self.sent.push(prompt);
            let id = RequestId(self.next);
            if !self.hold_start {
                self.queued.push_back(ReplyEvent::Started(id));
            }
            Ok(id)
        }

        fn try_recv(&mut self) -> Option<ReplyEvent> {
            self.queued.pop_front()
        }
    }

    fn reply(id: u64, text: &str) -> ReplyEvent {
        ReplyEvent::Finished(GeneratorReply {
            id: RequestId(id),
            result: Ok(text.to_string()),
        })
    }

    #[test]
    fn new_session_is_seeded_with_opening_line() {
        let session = DialogueSession::new(TIMEOUT);
        assert_eq!(
            session.transcript(),
            &[TranscriptLine {
                speaker: Speaker::Monster,
                text: OPENING_LINE.to_string(),
            }]
        );
        assert!(!session.is_pending());
    }

    #[test]
    fn submit_then_poll_appends_exactly_one_reply() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = InlineReplyChannel::new(Fixed("Begone, knight."));

        assert!(session.submit("hello"));
        assert_eq!(
            session.transcript().last(),
            Some(&TranscriptLine {
                speaker: Speaker::Player,
                text: "hello".to_string(),
            })
        );
        assert!(session.is_pending());

        assert_eq!(session.poll(&mut channel, Instant::now()), PollOutcome::Replied);

        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.transcript()[2].speaker, Speaker::Monster);
        assert_eq!(session.transcript()[2].text, "Begone, knight.");
        assert!(!session.is_pending());
    }

    #[test]
    fn submit_while_pending_is_a_no_op() {
        let mut session = DialogueSession::new(TIMEOUT);
        assert!(session.submit("first"));
        let before = session.transcript().to_vec();

        assert!(!session.submit("second"));

        assert_eq!(session.transcript(), before.as_slice());
        assert!(session.is_pending());
    }

    #[test]
    fn blank_submit_is_ignored() {
        let mut session = DialogueSession::new(TIMEOUT);
        assert!(!session.submit("   "));
        assert!(!session.is_pending());
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn draft_editing_caps_length_and_skips_control_chars() {
        let mut session = DialogueSession::new(TIMEOUT);
        for _ in 0..200 {
            session.push_char('x');
        }
        session.push_char('\n');
        assert_eq!(session.draft().chars().count(), MAX_DRAFT_CHARS);

        session.pop_char();
        assert_eq!(session.draft().chars().count(), MAX_DRAFT_CHARS - 1);
    }

    #[test]
    fn rejected_draft_is_kept() {
        let mut session = DialogueSession::new(TIMEOUT);
        session.submit("first");
        for ch in "again".chars() {
            session.push_char(ch);
        }

        assert!(!session.submit_draft());
        assert_eq!(session.draft(), "again");
    }

    #[test]
    fn accepted_draft_is_cleared() {
        let mut session = DialogueSession::new(TIMEOUT);
        for ch in "hi there".chars() {
            session.push_char(ch);
        }

        assert!(session.submit_draft());
        assert_eq!(session.draft(), "");
        assert_eq!(session.transcript()[1].text, "hi there");
    }

    #[test]
    fn generator_failure_appends_fallback() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = InlineReplyChannel::new(Failing);
        session.submit("hello");

        assert_eq!(session.poll(&mut channel, Instant::now()), PollOutcome::Failed);

        assert_eq!(session.transcript()[2].text, FALLBACK_LINE);
        assert!(!session.is_pending());
    }

    #[test]
    fn blank_reply_is_treated_as_failure() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = InlineReplyChannel::new(Fixed(" \n\n  "));
        session.submit("hello");

        session.poll(&mut channel, Instant::now());

        assert_eq!(session.transcript()[2].text, FALLBACK_LINE);
    }

    #[test]
    fn request_is_issued_once_and_waits() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = Manual::default();
        let start = Instant::now();
        session.submit("hello");

        assert_eq!(session.poll(&mut channel, start), PollOutcome::Issued);
        assert_eq!(
            session.poll(&mut channel, start + Duration::from_secs(1)),
            PollOutcome::Waiting
        );
        assert_eq!(channel.sent.len(), 1);
        assert!(session.is_pending());
    }

    #[test]
    fn stale_replies_are_dropped() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = Manual::default();
        let start = Instant::now();
        channel.next = 10;
        session.submit("hello");
        session.poll(&mut channel, start);

        channel.queued.push_back(reply(3, "from an old chat"));
        assert_eq!(session.poll(&mut channel, start), PollOutcome::Waiting);
        assert_eq!(session.transcript().len(), 2);

        channel.queued.push_back(reply(11, "Hmph."));
        assert_eq!(session.poll(&mut channel, start), PollOutcome::Replied);
        assert_eq!(session.transcript()[2].text, "Hmph.");
    }

    #[test]
    fn timeout_appends_fallback_and_late_reply_is_stale() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = Manual::default();
        let start = Instant::now();
        session.submit("hello");
        session.poll(&mut channel, start);

        assert_eq!(session.poll(&mut channel, start + TIMEOUT), PollOutcome::Failed);
        assert_eq!(session.transcript()[2].text, FALLBACK_LINE);
        assert!(!session.is_pending());

        channel.queued.push_back(reply(1, "too late"));
        assert_eq!(session.poll(&mut channel, start + TIMEOUT), PollOutcome::Idle);
        assert_eq!(session.transcript().len(), 3);
    }

    #[test]
    fn prompt_carries_persona_context_and_utterance() {
        let mut transcript = vec![TranscriptLine {
            speaker: Speaker::Monster,
            text: OPENING_LINE.to_string(),
        }];
        for index in 0..10 {
            transcript.push(TranscriptLine {
                speaker: if index % 2 == 0 {
                    Speaker::Player
                } else {
                    Speaker::Monster
                },
                text: format!("line {index}"),
            });
        }
        transcript.push(TranscriptLine {
            speaker: Speaker::Player,
            text: "what is your name?".to_string(),
        });

        let prompt = build_prompt(&transcript);

        assert!(prompt.starts_with(PERSONA));
        assert!(!prompt.contains(OPENING_LINE));
        assert!(!prompt.contains("line 1\n"));
        assert!(prompt.contains("Player: line 2\n"));
        assert!(prompt.contains("Monster: line 9\n"));
        assert!(prompt.ends_with("Player says: what is your name?\nMonster replies:"));
    }

    #[test]
    fn reply_is_trimmed_to_two_lines() {
        assert_eq!(
            clean_reply("  Hello.\n\n  Go away.\nThird line.\n").as_deref(),
            Some("Hello.\nGo away.")
        );
        assert_eq!(clean_reply("\n \n"), None);
    }

    #[test]
    fn queued_request_times_out_from_its_start() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = Manual {
            hold_start: true,
            ..Manual::default()
        };
        let start = Instant::now();
        session.submit("hello");
        session.poll(&mut channel, start);

        let started = start + TIMEOUT - Duration::from_secs(1);
        channel.queued.push_back(ReplyEvent::Started(RequestId(1)));
        assert_eq!(session.poll(&mut channel, started), PollOutcome::Waiting);
        assert_eq!(
            session.poll(&mut channel, start + TIMEOUT),
            PollOutcome::Waiting
        );

        channel.queued.push_back(reply(1, "Patience."));
        assert_eq!(
            session.poll(&mut channel, started + TIMEOUT - Duration::from_millis(1)),
            PollOutcome::Replied
        );
        assert_eq!(session.transcript()[2].text, "Patience.");
    }

    #[test]
    fn request_that_never_starts_still_times_out() {
        let mut session = DialogueSession::new(TIMEOUT);
        let mut channel = Manual {
            hold_start: true,
            ..Manual::default()
        };
        let start = Instant::now();
        session.submit("hello");
        session.poll(&mut channel, start);

        assert_eq!(
            session.poll(&mut channel, start + TIMEOUT),
            PollOutcome::Waiting
        );
        assert_eq!(
            session.poll(&mut channel, start + TIMEOUT * 2),
            PollOutcome::Failed
        );
        assert_eq!(session.transcript()[2].text, FALLBACK_LINE);
    }

    #[test]
    fn abandoned_chat_does_not_eat_into_next_reply_timeout() {
        let call = Duration::from_millis(300);
        let timeout = Duration::from_millis(400);
        let mut channel = ThreadedReplyChannel::spawn(Box::new(Slow(call))).expect("spawn");

        let mut abandoned = DialogueSession::new(timeout);
        abandoned.submit("first");
        assert_eq!(
            abandoned.poll(&mut channel, Instant::now()),
            PollOutcome::Issued
        );
        thread::sleep(Duration::from_millis(50));
        drop(abandoned);

        let mut session = DialogueSession::new(timeout);
        session.submit("second");
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut outcome = PollOutcome::Idle;
        while session.is_pending() {
            assert!(Instant::now() < deadline, "session never settled");
            outcome = session.poll(&mut channel, Instant::now());
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(outcome, PollOutcome::Replied);
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.transcript()[2].text, "Second answer.");
    }
}
