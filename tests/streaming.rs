use std::time::Duration;

use endless_terrain::lod::LodLevel;
use endless_terrain::{ChunkCoord, ChunkState, LodTable, TerrainSettings, TerrainStreamer};

fn settings() -> TerrainSettings {
    let mut settings = TerrainSettings::default();
    settings.noise.octaves = 3;
    settings.streaming.vertices_per_line = 13;
    settings.streaming.worker_threads = Some(4);
    // One full chunk of travel before re-evaluation.
    settings.streaming.viewer_move_threshold = Some(12.0);
    settings.lod = LodTable::new(vec![
        LodLevel { stride: 1, visible_distance: 4.0, collision: false },
        LodLevel { stride: 2, visible_distance: 8.0, collision: false },
        LodLevel { stride: 4, visible_distance: 12.0, collision: false },
    ]);
    settings
}

/// Tick until nothing is running or queued; returns how many ticks recomputed.
fn settle(streamer: &mut TerrainStreamer) -> usize {
    let mut recomputed = 0;
    for _ in 0..100 {
        assert!(streamer.scheduler().wait_for_workers(Duration::from_secs(10)));
        if streamer.tick().recomputed {
            recomputed += 1;
        }
        if streamer.is_idle() {
            return recomputed;
        }
    }
    panic!("streamer did not settle");
}

#[test]
fn viewer_crossing_one_chunk_recomputes_once() {
    let mut streamer = TerrainStreamer::new(&settings()).unwrap();
    streamer.set_viewer_position((0.0, 0.0));
    assert!(streamer.tick().recomputed);
    assert_eq!(settle(&mut streamer), 0);
    assert_eq!(streamer.tracked_count(), 9);
    assert!(streamer.chunk(ChunkCoord::new(2, 0)).is_none());

    streamer.set_viewer_position((12.0, 0.0));
    let mut recomputed = usize::from(streamer.tick().recomputed);
    recomputed += settle(&mut streamer);
    assert_eq!(recomputed, 1);

    let newcomer = streamer.chunk(ChunkCoord::new(2, 0)).expect("chunk (2, 0) tracked");
    assert!(newcomer.is_visible());
    let left_behind = streamer.chunk(ChunkCoord::new(-1, 0)).expect("chunk (-1, 0) kept");
    assert_eq!(left_behind.state(), ChunkState::Hidden);
    assert!(left_behind.mesh().is_some());
    assert_eq!(streamer.tracked_count(), 12);
    assert_eq!(streamer.visible_chunks().count(), 9);
}

#[test]
fn returning_viewer_reuses_cached_meshes() {
    let mut streamer = TerrainStreamer::new(&settings()).unwrap();
    streamer.tick();
    settle(&mut streamer);
    streamer.set_viewer_position((12.0, 0.0));
    streamer.tick();
    settle(&mut streamer);
    let issued = streamer.scheduler().issued();

    streamer.set_viewer_position((0.0, 0.0));
    let report = streamer.tick();
    assert!(report.recomputed);
    assert_eq!(report.requests_issued, 0);
    settle(&mut streamer);
    assert_eq!(streamer.scheduler().issued(), issued);

    assert_eq!(streamer.chunk(ChunkCoord::new(0, 0)).unwrap().state(), ChunkState::Ready(0));
    assert_eq!(streamer.chunk(ChunkCoord::new(-1, 0)).unwrap().state(), ChunkState::Ready(1));
    assert_eq!(streamer.chunk(ChunkCoord::new(2, 0)).unwrap().state(), ChunkState::Hidden);
}

#[test]
fn stale_deliveries_are_kept() {
    let mut streamer = TerrainStreamer::new(&settings()).unwrap();
    streamer.tick();
    // Jump far away before anything is delivered.
    streamer.set_viewer_position((240.0, 0.0));
    streamer.tick();
    settle(&mut streamer);

    let origin = streamer.chunk(ChunkCoord::new(0, 0)).unwrap();
    assert_eq!(origin.state(), ChunkState::Hidden);
    assert!(origin.map_data().is_some());
    // Hidden chunks get their height field but no mesh.
    assert!(origin.mesh().is_none());
    assert_eq!(streamer.tracked_count(), 18);
}
