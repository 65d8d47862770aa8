pub mod cache;
pub mod handle;
pub mod mesh;
pub mod skinned_model;
pub mod text_mesh;

pub use cache::AssetCache;
pub use handle::Handle;
pub use mesh::{IndexData, MeshData};
