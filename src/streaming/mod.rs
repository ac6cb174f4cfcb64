//! Chunk streaming around a moving viewer
//!
//! The streamer tracks a window of chunks around the viewer, requests their
//! height fields and meshes from a [`GenerationScheduler`](crate::scheduler::GenerationScheduler)
//! and swaps LODs as distances change. Chunks that leave the view are hidden,
//! never dropped: memory grows with the explored area.

pub mod chunk;
pub mod manager;
pub mod viewer;

pub use chunk::{ChunkBounds, ChunkCoord, ChunkRecord, ChunkState};
pub use manager::{ChunkTable, TerrainStreamer, TickReport};
pub use viewer::ViewerState;
