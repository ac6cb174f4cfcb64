//! Error type shared by the generation, streaming and export layers.

/// Errors surfaced by terrain generation and its collaborators.
#[derive(Debug)]
pub enum TerrainError {
    /// IO error (settings file, export target)
    Io(std::io::Error),
    /// Settings file could not be parsed or written
    Json(serde_json::Error),
    /// PNG encoding failed
    Image(image::ImageError),
    /// Settings are structurally unusable (empty LOD table, bad strides, ...)
    InvalidSettings(String),
    /// A height field did not have the dimensions the consumer expects
    FieldSize { expected: usize, actual: usize },
    /// The background runtime could not be started
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, TerrainError>;

impl std::fmt::Display for TerrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerrainError::Io(e) => write!(f, "IO error: {}", e),
            TerrainError::Json(e) => write!(f, "Settings error: {}", e),
            TerrainError::Image(e) => write!(f, "Image error: {}", e),
            TerrainError::InvalidSettings(msg) => write!(f, "Invalid settings: {}", msg),
            TerrainError::FieldSize { expected, actual } => write!(
                f,
                "Height field size mismatch: expected {}x{}, got {}x{}",
                expected, expected, actual, actual
            ),
            TerrainError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for TerrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TerrainError::Io(e) => Some(e),
            TerrainError::Json(e) => Some(e),
            TerrainError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TerrainError {
    fn from(e: std::io::Error) -> Self {
        TerrainError::Io(e)
    }
}

impl From<serde_json::Error> for TerrainError {
    fn from(e: serde_json::Error) -> Self {
        TerrainError::Json(e)
    }
}

impl From<image::ImageError> for TerrainError {
    fn from(e: image::ImageError) -> Self {
        TerrainError::Image(e)
    }
}
