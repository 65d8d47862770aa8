use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading an asset from disk.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed mesh file {path:?}: {reason}")]
    MeshParse { path: PathBuf, reason: String },

    #[error("Failed to decode image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to import glTF {path:?}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("Skinned model {path:?} is unusable: {reason}")]
    SkinnedModel { path: PathBuf, reason: String },
}

impl AssetError {
    /// True when the asset simply is not there, which callers treat as optional.
    pub fn is_missing_file(&self) -> bool {
        match self {
            AssetError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            AssetError::Gltf {
                source: gltf::Error::Io(err),
                ..
            } => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Malformed `#ifdef` structure in a shader template.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShaderError {
    #[error("{shader}: line {line}: `{directive}` without a matching #ifdef")]
    UnbalancedDirective {
        shader: String,
        line: usize,
        directive: String,
    },

    #[error("{shader}: {open} conditional block(s) never closed")]
    UnterminatedBlock { shader: String, open: usize },

    #[error("{shader}: line {line}: directive needs a name")]
    MissingDefineName { shader: String, line: usize },
}

/// Reasons the renderer can fail to start or to present a frame.
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("No compatible GPU adapter found: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("Failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Failed to acquire swap chain image: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("GPU flush failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("Shader '{0}' is not in the library")]
    MissingShader(String),

    #[error("Renderer used before initialize(): {0}")]
    NotInitialized(&'static str),

    #[error("Rejected command list: {0}")]
    InvalidCommand(String),
}
