pub mod gltf;

pub use gltf::GltfSceneLoader;
