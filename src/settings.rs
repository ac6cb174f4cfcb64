//! Terrain generation settings
//!
//! Settings are supplied by a configuration collaborator (a JSON file, CLI
//! flags, or code). Numeric parameters are clamped into range by
//! [`TerrainSettings::validated`]; structural problems are reported by
//! [`TerrainSettings::validate`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::curve::HeightCurve;
use crate::error::{Result, TerrainError};
use crate::lod::LodTable;

/// Empirical divisor applied to the maximum possible noise amplitude in global
/// normalization. The theoretical maximum is almost never sampled, so dividing
/// it down spreads typical terrain over more of [0,1]. Larger values produce
/// plateaus where heights exceed 1.
pub const GLOBAL_NORMALIZE_CORRECTION: f32 = 1.1;

/// Smallest noise scale accepted; lower values are clamped to this.
pub const MIN_NOISE_SCALE: f32 = 0.0001;

/// Range the falloff transition and deadzone are clamped to.
pub const FALLOFF_SHAPE_RANGE: (f32, f32) = (1.0, 10.0);

/// Upper bound on octave count.
pub const MAX_OCTAVES: usize = 30;

/// How a generated noise field is mapped into [0,1].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Remap each field's own min/max. Seams between chunks.
    Local,
    /// Divide by the precomputed amplitude bound. Seamless across chunks.
    #[default]
    Global,
}

impl std::fmt::Display for NormalizeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Global => write!(f, "global"),
        }
    }
}

impl std::str::FromStr for NormalizeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "global" => Ok(Self::Global),
            other => Err(format!("unknown normalize mode '{}' (expected local or global)", other)),
        }
    }
}

/// Fractal noise parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: String,
    /// Sampling scale (larger = broader features)
    pub scale: f32,
    pub octaves: usize,
    /// Amplitude decay per octave (0.0-1.0)
    pub persistence: f32,
    /// Frequency multiplier per octave (>= 1.0)
    pub lacunarity: f32,
    /// Global offset added to every chunk's sampling position
    pub offset: (f32, f32),
    pub normalize_mode: NormalizeMode,
    pub global_correction: f32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: "terrain".to_string(),
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: (0.0, 0.0),
            normalize_mode: NormalizeMode::Global,
            global_correction: GLOBAL_NORMALIZE_CORRECTION,
        }
    }
}

/// Radial falloff shaping
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FalloffSettings {
    pub enabled: bool,
    /// Steepness of the land/ocean transition
    pub transition: f32,
    /// How much of the map stays at full height before the transition
    pub deadzone: f32,
}

impl Default for FalloffSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            transition: 3.0,
            deadzone: 2.2,
        }
    }
}

/// Mesh height shaping
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightSettings {
    pub multiplier: f32,
    pub curve: HeightCurve,
    pub flat_shading: bool,
    /// Uniform world scale applied to chunk placement and viewer input
    pub terrain_scale: f32,
    pub falloff: FalloffSettings,
}

impl Default for HeightSettings {
    fn default() -> Self {
        Self {
            multiplier: 30.0,
            curve: HeightCurve::flat_water(),
            flat_shading: false,
            terrain_scale: 1.0,
            falloff: FalloffSettings::default(),
        }
    }
}

impl HeightSettings {
    /// Lowest possible world height, for shader range setup.
    pub fn min_height(&self) -> f32 {
        self.terrain_scale * self.multiplier * self.curve.evaluate(0.0)
    }

    /// Highest possible world height, for shader range setup.
    pub fn max_height(&self) -> f32 {
        self.terrain_scale * self.multiplier * self.curve.evaluate(1.0)
    }
}

/// A terrain type: cells at or above `height` (and below the next band) get `color`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainBand {
    pub name: String,
    pub height: f32,
    pub color: [u8; 3],
}

impl TerrainBand {
    pub fn new(name: &str, height: f32, color: [u8; 3]) -> Self {
        Self { name: name.to_string(), height, color }
    }
}

/// Ordered colour bands, ascending by threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub bands: Vec<TerrainBand>,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            bands: vec![
                TerrainBand::new("deep water", 0.0, [50, 99, 195]),
                TerrainBand::new("shallow water", 0.3, [54, 103, 199]),
                TerrainBand::new("sand", 0.4, [210, 208, 125]),
                TerrainBand::new("grass", 0.45, [86, 152, 23]),
                TerrainBand::new("forest", 0.55, [62, 107, 18]),
                TerrainBand::new("rock", 0.6, [90, 69, 60]),
                TerrainBand::new("high rock", 0.7, [75, 60, 53]),
                TerrainBand::new("snow", 0.9, [255, 255, 255]),
            ],
        }
    }
}

impl TextureSettings {
    /// Whether band thresholds ascend. Out-of-order bands still classify, but
    /// some bands become unreachable.
    pub fn is_ordered(&self) -> bool {
        self.bands.windows(2).all(|w| w[0].height <= w[1].height)
    }
}

/// Chunk streaming parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Visible vertices per chunk edge at full resolution
    pub vertices_per_line: usize,
    /// Viewer travel (grid units) before chunks are re-evaluated. Defaults to a quarter chunk.
    pub viewer_move_threshold: Option<f32>,
    /// Background worker threads. Defaults to the runtime's choice.
    pub worker_threads: Option<usize>,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            vertices_per_line: 241,
            viewer_move_threshold: None,
            worker_threads: None,
        }
    }
}

/// Dimensions derived from the streaming settings and LOD table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkMetrics {
    /// Visible vertices per edge at stride 1
    pub vertices_per_line: usize,
    /// Chunk width in grid units
    pub chunk_size: usize,
    /// Border cells on each side; the largest LOD stride
    pub border: usize,
    /// Edge length of the bordered height field
    pub field_size: usize,
}

impl ChunkMetrics {
    pub fn new(vertices_per_line: usize, border: usize) -> Self {
        Self {
            vertices_per_line,
            chunk_size: vertices_per_line.saturating_sub(1),
            border,
            field_size: vertices_per_line + 2 * border,
        }
    }

    /// Vertices per edge of the visible mesh at `stride`.
    pub fn vertices_per_line_at(&self, stride: usize) -> usize {
        self.chunk_size / stride + 1
    }
}

/// Complete terrain configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub noise: NoiseSettings,
    pub height: HeightSettings,
    pub texture: TextureSettings,
    pub lod: LodTable,
    pub streaming: StreamingSettings,
}

impl TerrainSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn metrics(&self) -> ChunkMetrics {
        ChunkMetrics::new(self.streaming.vertices_per_line, self.lod.max_stride())
    }

    /// Copy with every numeric parameter clamped into its valid range.
    pub fn validated(&self) -> Self {
        let mut s = self.clone();

        if !(s.noise.scale > 0.0) {
            log::warn!("noise scale {} clamped to {}", s.noise.scale, MIN_NOISE_SCALE);
            s.noise.scale = MIN_NOISE_SCALE;
        }
        if s.noise.octaves < 1 || s.noise.octaves > MAX_OCTAVES {
            let clamped = s.noise.octaves.clamp(1, MAX_OCTAVES);
            log::warn!("octave count {} clamped to {}", s.noise.octaves, clamped);
            s.noise.octaves = clamped;
        }
        if !(0.0..=1.0).contains(&s.noise.persistence) {
            let clamped = if s.noise.persistence.is_nan() { 0.5 } else { s.noise.persistence.clamp(0.0, 1.0) };
            log::warn!("persistence {} clamped to {}", s.noise.persistence, clamped);
            s.noise.persistence = clamped;
        }
        if !(s.noise.lacunarity >= 1.0) {
            log::warn!("lacunarity {} clamped to 1", s.noise.lacunarity);
            s.noise.lacunarity = 1.0;
        }
        if !(s.noise.global_correction > 0.0) {
            log::warn!(
                "global normalize correction {} reset to {}",
                s.noise.global_correction,
                GLOBAL_NORMALIZE_CORRECTION
            );
            s.noise.global_correction = GLOBAL_NORMALIZE_CORRECTION;
        }
        let (lo, hi) = FALLOFF_SHAPE_RANGE;
        if !(lo..=hi).contains(&s.height.falloff.transition) {
            let clamped = if s.height.falloff.transition.is_nan() { 3.0 } else { s.height.falloff.transition.clamp(lo, hi) };
            log::warn!("falloff transition {} clamped to {}", s.height.falloff.transition, clamped);
            s.height.falloff.transition = clamped;
        }
        if !(lo..=hi).contains(&s.height.falloff.deadzone) {
            let clamped = if s.height.falloff.deadzone.is_nan() { 2.2 } else { s.height.falloff.deadzone.clamp(lo, hi) };
            log::warn!("falloff deadzone {} clamped to {}", s.height.falloff.deadzone, clamped);
            s.height.falloff.deadzone = clamped;
        }
        if !(s.height.terrain_scale > 0.0) {
            log::warn!("terrain scale {} reset to 1", s.height.terrain_scale);
            s.height.terrain_scale = 1.0;
        }
        if s.streaming.vertices_per_line < 3 {
            log::warn!("vertices per line {} clamped to 3", s.streaming.vertices_per_line);
            s.streaming.vertices_per_line = 3;
        }
        if let Some(threads) = s.streaming.worker_threads {
            s.streaming.worker_threads = Some(threads.max(1));
        }
        if let Some(threshold) = s.streaming.viewer_move_threshold {
            if !(threshold >= 0.0) {
                s.streaming.viewer_move_threshold = None;
            }
        }
        s
    }

    /// Structural checks that clamping cannot fix.
    pub fn validate(&self) -> Result<()> {
        let metrics = self.metrics();
        if metrics.chunk_size < 2 {
            return Err(TerrainError::InvalidSettings(format!(
                "vertices per line must be at least 3, got {}",
                self.streaming.vertices_per_line
            )));
        }
        self.lod.validate(metrics.chunk_size)?;
        if self.texture.bands.is_empty() {
            log::warn!("no terrain bands configured; colour buffers will be empty");
        } else if !self.texture.is_ordered() {
            log::warn!("terrain bands are not in ascending order; some bands are unreachable");
        }
        Ok(())
    }

    /// Viewer travel before chunk re-evaluation, in grid units.
    pub fn viewer_move_threshold(&self) -> f32 {
        self.streaming
            .viewer_move_threshold
            .unwrap_or(self.metrics().chunk_size as f32 / 4.0)
    }
}
