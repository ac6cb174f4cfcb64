//! Endless terrain library
//!
//! Seeded fractal height fields, LOD meshes with seam-safe normals and a chunk
//! streamer that generates terrain around a moving viewer on background workers.

pub mod compositor;
pub mod curve;
pub mod error;
pub mod export;
pub mod falloff;
pub mod generator;
pub mod heightfield;
pub mod lod;
pub mod mesh;
pub mod noise_field;
pub mod scheduler;
pub mod seeds;
pub mod settings;
pub mod streaming;

pub use compositor::{ColorMap, HeightFieldCompositor, MapData};
pub use curve::HeightCurve;
pub use error::{Result, TerrainError};
pub use falloff::FalloffCache;
pub use generator::TerrainGenerator;
pub use heightfield::HeightField;
pub use lod::{LodLevel, LodTable};
pub use mesh::{TerrainMesh, TerrainMeshBuilder};
pub use scheduler::GenerationScheduler;
pub use settings::{ChunkMetrics, NormalizeMode, TerrainSettings};
pub use streaming::{ChunkCoord, ChunkState, TerrainStreamer, TickReport};
