#[cfg(test)]
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub(crate) enum GeneratorError {
    #[error("generator request failed: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),
    #[error("generator returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to decode generator response at {path}: {message}")]
    Decode { path: String, message: String },
    #[error("generator returned an empty reply")]
    Empty,
    #[error("reply worker is no longer running")]
    WorkerGone,
}

impl GeneratorError {
    pub(crate) fn transport(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(error))
    }
}

/// Turns a prompt into monster dialogue. Called from the reply worker, so it
/// may block.
pub(crate) trait ResponseGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RequestId(pub(crate) u64);

#[derive(Debug)]
pub(crate) struct GeneratorReply {
    pub(crate) id: RequestId,
    pub(crate) result: Result<String, GeneratorError>,
}

/// Progress of one request as seen from the game loop.
#[derive(Debug)]
pub(crate) enum ReplyEvent {
    /// The generator began working on the request.
    Started(RequestId),
    Finished(GeneratorReply),
}

/// Request/response seam between the game loop and the generator.
///
/// A new `send` supersedes every request that has not started yet; those
/// never produce events.
pub(crate) trait ReplyChannel {
    fn send(&mut self, prompt: String) -> Result<RequestId, GeneratorError>;
    /// Never blocks.
    fn try_recv(&mut self) -> Option<ReplyEvent>;
}

#[derive(Debug, Default)]
struct RequestIds {
    next: u64,
}

impl RequestIds {
    fn allocate(&mut self) -> RequestId {
        self.next = self.next.wrapping_add(1);
        RequestId(self.next)
    }
}

/// Runs the generator synchronously inside `send`; both events are ready by
/// the next `try_recv`.
#[cfg(test)]
pub(crate) struct InlineReplyChannel<G> {
    generator: G,
    ids: RequestIds,
    ready: VecDeque<ReplyEvent>,
}

#[cfg(test)]
impl<G: ResponseGenerator> InlineReplyChannel<G> {
    pub(crate) fn new(generator: G) -> Self {
        Self {
            generator,
            ids: RequestIds::default(),
            ready: VecDeque::new(),
        }
    }
}

#[cfg(test)]
impl<G: ResponseGenerator> ReplyChannel for InlineReplyChannel<G> {
    fn send(&mut self, prompt: String) -> Result<RequestId, GeneratorError> {
        let id = self.ids.allocate();
        let result = self.generator.generate(&prompt);
        self.ready.push_back(ReplyEvent::Started(id));
        self.ready
            .push_back(ReplyEvent::Finished(GeneratorReply { id, result }));
        Ok(id)
    }

    fn try_recv(&mut self) -> Option<ReplyEvent> {
        self.ready.pop_front()
    }
}

const WORKER_THREAD_NAME: &str = "reply-worker";

/// Owns a `reply-worker` thread that runs one generator call at a time. The
/// worker only sees prompts and never touches game state. Requests that queue
/// up behind a running call are collapsed to the newest one.
pub(crate) struct ThreadedReplyChannel {
    requests: Sender<(RequestId, String)>,
    events: Receiver<ReplyEvent>,
    ids: RequestIds,
    worker_gone_logged: bool,
}

impl ThreadedReplyChannel {
    pub(crate) fn spawn(generator: Box<dyn ResponseGenerator + Send>) -> io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<(RequestId, String)>();
        let (event_tx, event_rx) = mpsc::channel::<ReplyEvent>();
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                info!("reply_worker_started");
                while let Some((id, prompt)) = next_request(&request_rx) {
                    debug!(request_id = id.0, prompt_chars = prompt.len(), "reply_worker_request");
                    if event_tx.send(ReplyEvent::Started(id)).is_err() {
                        break;
                    }
                    let result = generator.generate(&prompt);
                    if event_tx
                        .send(ReplyEvent::Finished(GeneratorReply { id, result }))
                        .is_err()
                    {
                        break;
                    }
                }
                info!("reply_worker_stopped");
            })?;
        Ok(Self {
            requests: request_tx,
            events: event_rx,
            ids: RequestIds::default(),
            worker_gone_logged: false,
        })
    }
}

/// Blocks for the next request, then skips to the newest one queued.
fn next_request(requests: &Receiver<(RequestId, String)>) -> Option<(RequestId, String)> {
    let mut request = requests.recv().ok()?;
    while let Ok(newer) = requests.try_recv() {
        debug!(
            request_id = request.0 .0,
            newer_id = newer.0 .0,
            "reply_worker_request_superseded"
        );
        request = newer;
    }
    Some(request)
}

impl ReplyChannel for ThreadedReplyChannel {
    fn send(&mut self, prompt: String) -> Result<RequestId, GeneratorError> {
        let id = self.ids.allocate();
        self.requests
            .send((id, prompt))
            .map_err(|_| GeneratorError::WorkerGone)?;
        Ok(id)
    }

    fn try_recv(&mut self) -> Option<ReplyEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.worker_gone_logged {
                    self.worker_gone_logged = true;
                    warn!("reply_worker_disconnected");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use super::*;

    struct Echo;

    impl ResponseGenerator for Echo {
        fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
            Ok(format!("echo: {prompt}"))
        }
    }

    struct Recording {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ResponseGenerator for Recording {
        fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            Err(GeneratorError::Empty)
        }
    }

    /// Records each prompt, then blocks until the test opens the gate once.
    struct Gated {
        prompts: Arc<Mutex<Vec<String>>>,
        gate: Mutex<Receiver<()>>,
    }

    impl ResponseGenerator for Gated {
        fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            self.gate
                .lock()
                .expect("lock")
                .recv()
                .map_err(|_| GeneratorError::WorkerGone)?;
            Ok(format!("echo: {prompt}"))
        }
    }

    fn recv_blocking(channel: &mut ThreadedReplyChannel) -> ReplyEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(event) = channel.try_recv() {
                return event;
            }
            assert!(Instant::now() < deadline, "worker did not reply");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn expect_started(event: ReplyEvent) -> RequestId {
        match event {
            ReplyEvent::Started(id) => id,
            other => panic!("expected a start event, got {other:?}"),
        }
    }

    fn expect_finished(event: ReplyEvent) -> GeneratorReply {
        match event {
            ReplyEvent::Finished(reply) => reply,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[test]
    fn inline_channel_replies_before_next_poll() {
        let mut channel = InlineReplyChannel::new(Echo);
        let id = channel.send("hi".to_string()).expect("send");

        assert_eq!(expect_started(channel.try_recv().expect("start")), id);
        let reply = expect_finished(channel.try_recv().expect("reply"));
        assert_eq!(reply.id, id);
        assert_eq!(reply.result.expect("ok"), "echo: hi");
        assert!(channel.try_recv().is_none());
    }

    #[test]
    fn request_ids_are_unique_per_channel() {
        let mut channel = InlineReplyChannel::new(Echo);
        let first = channel.send("a".to_string()).expect("first");
        let second = channel.send("b".to_string()).expect("second");
        assert_ne!(first, second);
    }

    #[test]
    fn threaded_channel_reports_start_then_reply() {
        let mut channel = ThreadedReplyChannel::spawn(Box::new(Echo)).expect("spawn");
        let id = channel.send("one".to_string()).expect("send");

        assert_eq!(expect_started(recv_blocking(&mut channel)), id);
        let reply = expect_finished(recv_blocking(&mut channel));

        assert_eq!(reply.id, id);
        assert_eq!(reply.result.expect("ok"), "echo: one");
    }

    #[test]
    fn requests_queued_behind_a_running_call_collapse_to_the_newest() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let (gate_tx, gate_rx) = mpsc::channel();
        let mut channel = ThreadedReplyChannel::spawn(Box::new(Gated {
            prompts: Arc::clone(&prompts),
            gate: Mutex::new(gate_rx),
        }))
        .expect("spawn");

        let running = channel.send("running".to_string()).expect("running");
        assert_eq!(expect_started(recv_blocking(&mut channel)), running);
        channel.send("superseded".to_string()).expect("superseded");
        let newest = channel.send("newest".to_string()).expect("newest");
        gate_tx.send(()).expect("open gate");
        gate_tx.send(()).expect("open gate");

        assert_eq!(expect_finished(recv_blocking(&mut channel)).id, running);
        assert_eq!(expect_started(recv_blocking(&mut channel)), newest);
        let reply = expect_finished(recv_blocking(&mut channel));
        assert_eq!(reply.id, newest);
        assert_eq!(reply.result.expect("ok"), "echo: newest");
        assert_eq!(
            *prompts.lock().expect("lock"),
            vec!["running".to_string(), "newest".to_string()]
        );
    }

    #[test]
    fn threaded_channel_forwards_generator_errors() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let mut channel = ThreadedReplyChannel::spawn(Box::new(Recording {
            prompts: Arc::clone(&prompts),
        }))
        .expect("spawn");
        channel.send("prompt".to_string()).expect("send");

        expect_started(recv_blocking(&mut channel));
        let reply = expect_finished(recv_blocking(&mut channel));

        assert!(matches!(reply.result, Err(GeneratorError::Empty)));
        assert_eq!(*prompts.lock().expect("lock"), vec!["prompt".to_string()]);
    }

    #[test]
    fn transport_error_keeps_its_source() {
        let error = GeneratorError::transport(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));

        assert_eq!(
            error.to_string(),
            "generator request failed: connection refused"
        );
        let source = error.source().expect("source");
        assert!(source.downcast_ref::<io::Error>().is_some());
    }
}
