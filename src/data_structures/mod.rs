//! Scene data structures: models, textures, instances and the scene graph.
//!
//! - `instance` holds per-instance transformation data (models and sprites)
//! - `load_state` tracks assets that arrive asynchronously
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `scene_graph` holds the renderable nodes of the scene
//! - `texture` contains GPU texture wrapper and creation utilities

pub mod instance;
pub mod load_state;
pub mod model;
pub mod scene_graph;
pub mod texture;
