use std::time::{Duration, Instant};

use engine::{
    AssetStore, DrawList, ImageHandle, InputSnapshot, PixelRect, Rgba, Scene, SceneCommand,
    SceneLoadError, Viewport,
};
use tracing::info;

use super::animation::{
    AnimationClip, AnimationState, AnimationTable, SheetLayout, SpriteRig, KNIGHT_CLIPS,
    KNIGHT_LAYOUT, MONSTER_CLIPS, MONSTER_LAYOUT,
};
use super::config::WorldSettings;
use super::hud::render_hud;
use super::reply::ReplyChannel;
use super::scroll::ParallaxLayer;
use super::state::{GameState, TickOutcome};

pub(crate) const KNIGHT_KEY: &str = "knight";
pub(crate) const MONSTER_KEY: &str = "monster";
pub(crate) const BACKGROUND_KEY: &str = "background";
pub(crate) const GROUND_KEY: &str = "ground";

const BACKGROUND_SPEED_RATIO: f32 = 0.3;
const GROUND_SPEED_RATIO: f32 = 1.0;
const BACKGROUND_LAYER: usize = 0;
const GROUND_LAYER: usize = 1;
pub(crate) const CLEAR_COLOR: Rgba = [20, 20, 40, 255];
pub(crate) const GROUND_FALLBACK_COLOR: Rgba = [30, 50, 30, 255];

struct LayerImage {
    handle: ImageHandle,
    width: u32,
    height: u32,
}

impl LayerImage {
    fn source(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }
}

/// Scene state that only exists once assets are loaded.
struct LoadedWorld {
    state: GameState,
    background: LayerImage,
    ground: Option<LayerImage>,
    viewport: Viewport,
}

pub(crate) struct GameplayScene {
    settings: WorldSettings,
    reply_timeout: Duration,
    channel: Box<dyn ReplyChannel>,
    world: Option<LoadedWorld>,
}

impl GameplayScene {
    pub(crate) fn new(
        settings: WorldSettings,
        reply_timeout: Duration,
        channel: Box<dyn ReplyChannel>,
    ) -> Self {
        Self {
            settings,
            reply_timeout,
            channel,
            world: None,
        }
    }

    #[cfg(test)]
    fn state(&self) -> Option<&GameState> {
        self.world.as_ref().map(|world| &world.state)
    }

    fn render_world(&self, world: &LoadedWorld, draw_list: &mut DrawList) {
        let viewport_width = world.viewport.width as f32;
        let layers = world.state.scroll.layers();

        if let Some(layer) = layers.get(BACKGROUND_LAYER) {
            for x in layer.tile_xs(viewport_width) {
                draw_list.blit(
                    world.background.handle,
                    world.background.source(),
                    (x.round() as i32, 0),
                    false,
                );
            }
        }

        let ground_y = self.settings.ground_y();
        match (&world.ground, layers.get(GROUND_LAYER)) {
            (Some(ground), Some(layer)) => {
                for x in layer.tile_xs(viewport_width) {
                    draw_list.blit(
                        ground.handle,
                        ground.source(),
                        (x.round() as i32, ground_y.round() as i32),
                        false,
                    );
                }
            }
            _ => draw_list.fill_rect(ground_fallback_rect(&self.settings), GROUND_FALLBACK_COLOR),
        }

        world.state.player.render(draw_list);
        world.state.enemy.render(draw_list);
        render_hud(&world.state, world.viewport.width, draw_list);
    }
}

/// Flat strip covering the band between the ground line and the bottom of
/// the window.
pub(crate) fn ground_fallback_rect(settings: &WorldSettings) -> PixelRect {
    PixelRect::new(
        0,
        settings.ground_y().round() as i32,
        settings.screen_width.max(0.0) as u32,
        settings.ground_offset.max(0.0) as u32,
    )
}

fn load_rig(
    assets: &mut AssetStore,
    key: &str,
    layout: SheetLayout,
    clips: &[(AnimationState, AnimationClip)],
) -> Result<SpriteRig, SceneLoadError> {
    let image = assets.load_required(key)?;
    let sheet_size = assets.image_size(image).ok_or_else(|| {
        SceneLoadError::Config(format!("sprite sheet '{key}' has no image data"))
    })?;
    let table = AnimationTable::new(layout, clips, sheet_size)
        .map_err(|error| SceneLoadError::Config(format!("sprite sheet '{key}': {error}")))?;
    Ok(SpriteRig { image, table })
}

fn load_layer_image(assets: &AssetStore, handle: ImageHandle) -> Option<LayerImage> {
    assets.image_size(handle).map(|(width, height)| LayerImage {
        handle,
        width,
        height,
    })
}

impl Scene for GameplayScene {
    fn load(&mut self, assets: &mut AssetStore, viewport: Viewport) -> Result<(), SceneLoadError> {
        let player_rig = load_rig(assets, KNIGHT_KEY, KNIGHT_LAYOUT, &KNIGHT_CLIPS)?;
        let enemy_rig = load_rig(assets, MONSTER_KEY, MONSTER_LAYOUT, &MONSTER_CLIPS)?;

        let background_handle = assets.load_required(BACKGROUND_KEY)?;
        let background = load_layer_image(assets, background_handle).ok_or_else(|| {
            SceneLoadError::Config(format!("image '{BACKGROUND_KEY}' has no image data"))
        })?;
        let ground = assets
            .load_optional(GROUND_KEY)
            .and_then(|handle| load_layer_image(assets, handle));

        let ground_width = ground
            .as_ref()
            .map_or(self.settings.screen_width, |image| image.width as f32);
        let layers = vec![
            ParallaxLayer::new(background.width as f32, BACKGROUND_SPEED_RATIO),
            ParallaxLayer::new(ground_width, GROUND_SPEED_RATIO),
        ];

        let state = GameState::new(
            self.settings,
            player_rig,
            enemy_rig,
            layers,
            self.reply_timeout,
        );
        info!(
            background_width = background.width,
            ground_texture = ground.is_some(),
            player_center_x = state.player.center_x(),
            enemy_center_x = state.enemy.center_x(),
            "scene_loaded"
        );
        self.world = Some(LoadedWorld {
            state,
            background,
            ground,
            viewport,
        });
        Ok(())
    }

    fn update(&mut self, _fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        let Some(world) = self.world.as_mut() else {
            return SceneCommand::None;
        };
        match world
            .state
            .tick(input, self.channel.as_mut(), Instant::now())
        {
            TickOutcome::Continue => SceneCommand::None,
            TickOutcome::QuitRequested => SceneCommand::Quit,
        }
    }

    fn render(&self, draw_list: &mut DrawList) {
        draw_list.set_clear_color(CLEAR_COLOR);
        if let Some(world) = &self.world {
            self.render_world(world, draw_list);
        }
    }

    fn unload(&mut self) {
        if let Some(world) = self.world.take() {
            info!(ticks = world.state.tick_count(), "scene_unloaded");
        }
    }

    fn debug_title(&self) -> Option<String> {
        let world = self.world.as_ref()?;
        let thinking = world
            .state
            .session()
            .is_some_and(|session| session.is_pending());
        Some(if thinking {
            format!("Zedla | {:?} (thinking)", world.state.phase())
        } else {
            format!("Zedla | {:?}", world.state.phase())
        })
    }
}
