use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{resolve_app_paths, StartupError};

use super::input::ActionStates;
use super::metrics::{is_slow_tick, MetricsAccumulator};
use super::{
    AssetStore, DrawList, InputAction, InputSnapshot, Renderer, Scene, SceneCommand,
    SceneLoadError, Viewport,
};

pub const SLOW_FRAME_ENV_VAR: &str = "ZEDLA_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Zedla".to_string(),
            window_width: 1000,
            window_height: 850,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: Some(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load scene: {0}")]
    SceneLoad(#[from] SceneLoadError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

impl AppError {
    /// True when the failure happened after the window was running rather
    /// than while starting up.
    pub fn is_runtime(&self) -> bool {
        matches!(self, AppError::EventLoopRun(_))
    }
}

/// Loads `scene`, opens the window and drives the fixed-step loop until the
/// window closes or the scene asks to quit. Scene load happens before any
/// window exists, so asset failures surface as an error with nothing on screen.
pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        "startup"
    );

    let viewport = Viewport {
        width: config.window_width.max(1),
        height: config.window_height.max(1),
    };
    let mut assets = AssetStore::new(app_paths.assets_dir.clone());
    scene.load(&mut assets, viewport)?;
    info!(
        viewport_width = viewport.width,
        viewport_height = viewport.height,
        "scene_ready"
    );

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                viewport.width as f64,
                viewport.height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), viewport.width, viewport.height)
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let timing = LoopTiming::resolve(&config, |name| env::var(name));
    let mut input_collector = InputCollector::default();
    info!(
        tick_ms = timing.fixed_dt.as_secs_f32() * 1000.0,
        max_frame_delta_ms = timing.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = timing.max_ticks_per_frame,
        metrics_interval_ms = timing.metrics_interval.as_millis() as u64,
        slow_frame_delay_ms = timing.slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(timing.render_fps_cap),
        "loop_config"
    );

    let mut clock = FrameClock::new(Instant::now());
    let mut metrics = MetricsAccumulator::new(timing.metrics_interval, Instant::now());
    let mut applied_title: Option<String> = None;
    let mut draw_list = DrawList::new();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(size) => {
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                }
                WindowEvent::RedrawRequested => {
                    if !timing.slow_frame_delay.is_zero() {
                        // Debug perturbation, separate from the render cap below.
                        thread::sleep(timing.slow_frame_delay);
                    }

                    let now = Instant::now();
                    let frame = clock.begin_frame(now, &timing);

                    for _ in 0..frame.plan.ticks_to_run {
                        let input = input_collector.snapshot_for_tick();
                        let tick_start = Instant::now();
                        let command = scene.update(timing.fixed_dt.as_secs_f32(), &input);
                        let tick_duration = tick_start.elapsed();
                        metrics.record_tick(tick_duration);
                        if is_slow_tick(tick_duration, timing.fixed_dt) {
                            warn!(
                                tick_ms = tick_duration.as_secs_f32() * 1000.0,
                                budget_ms = timing.fixed_dt.as_secs_f32() * 1000.0,
                                "slow_tick"
                            );
                        }
                        if command == SceneCommand::Quit {
                            info!(reason = "scene_quit", "shutdown_requested");
                            window_target.exit();
                            return;
                        }
                    }

                    if !frame.plan.dropped_backlog.is_zero() {
                        warn!(
                            dropped_backlog_ms = frame.plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame = timing.max_ticks_per_frame,
                            "sim_clamp_triggered"
                        );
                    }

                    let cap_sleep = clock.cap_sleep(Instant::now(), &timing);
                    if !cap_sleep.is_zero() {
                        thread::sleep(cap_sleep);
                    }

                    draw_list.reset();
                    scene.render(&mut draw_list);
                    if let Err(error) = renderer.render(&draw_list, &assets) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    clock.mark_presented(Instant::now());

                    let title = scene.debug_title();
                    if title != applied_title {
                        window.set_title(title.as_deref().unwrap_or(config.window_title.as_str()));
                        applied_title = title;
                    }

                    metrics.record_frame(frame.raw_dt);
                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            longest_tick_ms = snapshot.longest_tick_ms,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Accumulates keyboard state between ticks. Press edges and typed text are
/// handed to the next tick's snapshot and then cleared.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    typed_text: String,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        self.handle_physical_key(key_event.physical_key, key_event.state);
        if key_event.state == ElementState::Pressed {
            if let Some(text) = key_event.text.as_deref() {
                self.push_typed_text(text);
            }
        }
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        match state {
            ElementState::Pressed => self.action_states.press(action),
            ElementState::Released => self.action_states.release(action),
        }
    }

    /// Control characters (Enter, Backspace, Escape) arrive as text on most
    /// platforms; they are reported through actions instead.
    fn push_typed_text(&mut self, text: &str) {
        self.typed_text
            .extend(text.chars().filter(|ch| !ch.is_control()));
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            std::mem::take(&mut self.typed_text),
        );
        self.action_states.clear_edges();
        snapshot
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    match code {
        KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::Space => Some(InputAction::Jump),
        KeyCode::KeyA => Some(InputAction::Attack),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(InputAction::Talk),
        KeyCode::Escape => Some(InputAction::Cancel),
        KeyCode::Backspace => Some(InputAction::Backspace),
        _ => None,
    }
}

/// `LoopConfig` with zero values replaced and env overrides applied.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LoopTiming {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    metrics_interval: Duration,
    slow_frame_delay: Duration,
    render_fps_cap: Option<u32>,
}

impl LoopTiming {
    fn resolve(
        config: &LoopConfig,
        read_env: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Self {
        let defaults = LoopConfig::default();
        let non_zero = |value: Duration, fallback: Duration| {
            if value.is_zero() {
                fallback
            } else {
                value
            }
        };
        Self {
            fixed_dt: Duration::from_secs_f64(1.0 / f64::from(config.target_tps.max(1))),
            max_frame_delta: non_zero(config.max_frame_delta, defaults.max_frame_delta),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            metrics_interval: non_zero(config.metrics_log_interval, defaults.metrics_log_interval),
            slow_frame_delay: slow_frame_delay(config.simulated_slow_frame_ms, read_env),
            render_fps_cap: config.max_render_fps.filter(|fps| *fps > 0),
        }
    }

    fn frame_target(&self) -> Option<Duration> {
        self.render_fps_cap
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    dropped_backlog: Duration,
}

#[derive(Debug, Clone, Copy)]
struct FrameStart {
    raw_dt: Duration,
    plan: StepPlan,
}

/// Fixed-step accumulator plus the instants used for render pacing.
#[derive(Debug)]
struct FrameClock {
    accumulator: Duration,
    last_frame: Instant,
    last_present: Instant,
}

impl FrameClock {
    fn new(now: Instant) -> Self {
        Self {
            accumulator: Duration::ZERO,
            last_frame: now,
            last_present: now,
        }
    }

    /// Adds the clamped frame delta and plans this frame's ticks. Backlog
    /// past `max_ticks_per_frame` is dropped rather than carried over.
    fn begin_frame(&mut self, now: Instant, timing: &LoopTiming) -> FrameStart {
        let raw_dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.accumulator = self
            .accumulator
            .saturating_add(raw_dt.min(timing.max_frame_delta));

        let mut ticks_to_run = 0;
        while self.accumulator >= timing.fixed_dt && ticks_to_run < timing.max_ticks_per_frame {
            self.accumulator -= timing.fixed_dt;
            ticks_to_run += 1;
        }
        let dropped_backlog = if self.accumulator >= timing.fixed_dt {
            std::mem::take(&mut self.accumulator)
        } else {
            Duration::ZERO
        };
        FrameStart {
            raw_dt,
            plan: StepPlan {
                ticks_to_run,
                dropped_backlog,
            },
        }
    }

    fn cap_sleep(&self, now: Instant, timing: &LoopTiming) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_present);
        timing
            .frame_target()
            .map_or(Duration::ZERO, |target| target.saturating_sub(elapsed))
    }

    fn mark_presented(&mut self, now: Instant) {
        self.last_present = now;
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    cap.map_or_else(|| "off".to_string(), |fps| fps.to_string())
}

fn slow_frame_delay(
    config_ms: u64,
    read_env: impl Fn(&str) -> Result<String, env::VarError>,
) -> Duration {
    let fallback = Duration::from_millis(config_ms);
    match read_env(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "slow_frame_env_invalid"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(error) => {
            warn!(env_var = SLOW_FRAME_ENV_VAR, error = %error, "slow_frame_env_unreadable");
            fallback
        }
    }
}
