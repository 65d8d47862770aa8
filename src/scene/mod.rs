pub mod animation;
pub mod camera;
pub mod demo;
pub mod geometry;
pub mod lights;
pub mod material;
pub mod render_item;
pub mod scene;
pub mod shadow;

pub use camera::Camera;
pub use geometry::{Geometry, GeometryHandle, GeometryRegistry, MeshBuffers, SubmeshRange};
pub use lights::SceneLighting;
pub use material::{
    Material, MaterialHandle, MaterialParams, MaterialTable, MaterialTextures, TextureKind,
    TextureSlot, TextureTable,
};
pub use render_item::{RenderItem, RenderItemCatalog, RenderLayer};
pub use scene::Scene;
pub use shadow::{LightSpace, SceneBounds, ShadowController};
