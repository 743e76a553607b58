mod animation;
mod body;
mod config;
mod dialogue;
mod hud;
mod ollama;
mod patrol;
mod physics;
mod player;
mod proximity;
mod reply;
mod scene_impl;
mod scroll;
mod state;

pub(crate) use config::{GeneratorConfig, WorldSettings};
pub(crate) use ollama::OllamaGenerator;
pub(crate) use reply::{GeneratorError, ThreadedReplyChannel};
pub(crate) use scene_impl::GameplayScene;
