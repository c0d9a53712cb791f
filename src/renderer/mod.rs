//! WebGPU rendering module
//!
//! Rendering is split in two: [`scene`] reads the game state and produces
//! draw commands, [`pipeline`] turns those into textured triangles on the GPU.

pub mod pipeline;
pub mod scene;
pub mod shapes;
pub mod sprite;
pub mod vertex;

pub use pipeline::{RenderError, SpriteRenderer};
pub use scene::{DrawCmd, Layer, LoadedAssets, Scene, TextureId, build_scene};
pub use sprite::{SpriteSheet, chroma_key};
