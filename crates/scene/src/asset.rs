//! JSON scene assets and their background loader.
//!
//! An asset is a tree of named objects. Loading happens on a worker thread;
//! the result is handed back over a channel and picked up by the frame loop.

use bloomwater_common::Transform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

use crate::geometry::{Geometry, GeometryError};
use crate::material::Material;

/// Errors from asset loading.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("object `{name}`: {source}")]
    Geometry {
        name: String,
        #[source]
        source: GeometryError,
    },
    #[error("object `{0}` uses the water material, which is reserved for the water surface")]
    ReservedMaterial(String),
    #[error("asset loader thread exited without a result")]
    LoaderVanished,
}

/// One node of an asset tree. Nodes without geometry only group their children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetObject {
    pub name: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub material: Option<Material>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub children: Vec<AssetObject>,
}

/// A serialized scene description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAsset {
    #[serde(default)]
    pub name: String,
    pub objects: Vec<AssetObject>,
}

impl SceneAsset {
    /// Parse and validate an asset document.
    pub fn from_json(data: &str) -> Result<Self, AssetError> {
        let asset: SceneAsset = serde_json::from_str(data)?;
        asset.validate()?;
        Ok(asset)
    }

    /// Read, parse and validate an asset file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "asset read");
        let mut asset = Self::from_json(&data)?;
        if asset.name.is_empty() {
            asset.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(asset)
    }

    pub fn validate(&self) -> Result<(), AssetError> {
        fn visit(obj: &AssetObject) -> Result<(), AssetError> {
            if let Some(geometry) = &obj.geometry {
                geometry.validate().map_err(|source| AssetError::Geometry {
                    name: obj.name.clone(),
                    source,
                })?;
            }
            if obj.material.as_ref().is_some_and(Material::is_water) {
                return Err(AssetError::ReservedMaterial(obj.name.clone()));
            }
            obj.children.iter().try_for_each(visit)
        }
        self.objects.iter().try_for_each(visit)
    }

    /// Every drawable node with its transform composed up to the asset root.
    pub fn flatten(&self) -> Vec<(String, Geometry, Material, Transform)> {
        fn visit(
            obj: &AssetObject,
            parent: &Transform,
            out: &mut Vec<(String, Geometry, Material, Transform)>,
        ) {
            let world = obj.transform.in_parent(parent);
            if let Some(geometry) = &obj.geometry {
                out.push((
                    obj.name.clone(),
                    geometry.clone(),
                    obj.material.clone().unwrap_or_default(),
                    world,
                ));
            }
            for child in &obj.children {
                visit(child, &world, out);
            }
        }

        let mut out = Vec::new();
        for obj in &self.objects {
            visit(obj, &Transform::default(), &mut out);
        }
        out
    }
}

/// Starts asset loads on a worker thread.
pub struct AssetLoader;

impl AssetLoader {
    pub fn spawn(path: impl Into<PathBuf>) -> PendingAsset {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();
        let handle = std::thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                let result = SceneAsset::load(&worker_path);
                // The receiver may already be gone if the app shut down.
                let _ = tx.send(result);
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("failed to start asset loader: {e}");
                None
            }
        };

        tracing::info!(path = %path.display(), "asset load started");
        PendingAsset { path, rx, handle }
    }
}

/// An asset load in flight.
pub struct PendingAsset {
    path: PathBuf,
    rx: Receiver<Result<SceneAsset, AssetError>>,
    handle: Option<JoinHandle<()>>,
}

impl PendingAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blocking. `None` while the load is still running.
    pub fn try_take(&mut self) -> Option<Result<SceneAsset, AssetError>> {
        match self.rx.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(AssetError::LoaderVanished))
            }
        }
    }

    /// Block until the load finishes.
    pub fn wait(mut self) -> Result<SceneAsset, AssetError> {
        let result = self.rx.recv().unwrap_or(Err(AssetError::LoaderVanished));
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(path = %self.path.display(), "asset loader panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::io::Write;

    const SET: &str = r#"{
        "name": "set",
        "objects": [
            {
                "name": "stage",
                "transform": { "position": [0.0, 2.0, 0.0] },
                "children": [
                    { "name": "ring", "geometry": { "type": "torus_knot", "radius": 2.0 },
                      "material": { "type": "basic", "color": [0.2, 0.8, 1.0] },
                      "transform": { "position": [1.0, 0.0, 0.0] } }
                ]
            },
            { "name": "pillar", "geometry": { "type": "box", "width": 1, "height": 4, "depth": 1 } }
        ]
    }"#;

    #[test]
    fn flatten_composes_parent_transforms() {
        let asset = SceneAsset::from_json(SET).unwrap();
        let flat = asset.flatten();
        assert_eq!(flat.len(), 2);
        let (name, _, material, transform) = &flat[0];
        assert_eq!(name, "ring");
        assert_eq!(material.label(), "basic");
        assert!((transform.position - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
        assert_eq!(flat[1].2, Material::default());
    }

    #[test]
    fn water_material_is_rejected() {
        let json = r#"{ "objects": [ { "name": "fake", "geometry": { "type": "plane", "width": 1, "height": 1 },
            "material": { "type": "water", "color": [1,1,1], "scale": 1, "flow_direction": [1,0],
            "flow_speed": 0.03, "cycle": 0.15, "offsets": [0, 0.075] } } ] }"#;
        assert!(matches!(
            SceneAsset::from_json(json),
            Err(AssetError::ReservedMaterial(name)) if name == "fake"
        ));
    }

    #[test]
    fn invalid_geometry_names_object() {
        let json = r#"{ "objects": [ { "name": "flat", "geometry": { "type": "plane", "width": 0, "height": 1 } } ] }"#;
        let err = SceneAsset::from_json(json).unwrap_err();
        assert!(err.to_string().contains("flat"));
    }

    #[test]
    fn mesh_without_triangles_is_rejected() {
        let json = r#"{ "objects": [ { "name": "speck",
            "geometry": { "type": "mesh", "positions": [[0, 0, 0]], "indices": [] } } ] }"#;
        assert!(matches!(
            SceneAsset::from_json(json),
            Err(AssetError::Geometry { name, source: GeometryError::EmptyMesh }) if name == "speck"
        ));
    }

    #[test]
    fn loader_reads_file_in_background() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SET.as_bytes()).unwrap();
        let asset = AssetLoader::spawn(file.path()).wait().unwrap();
        assert_eq!(asset.name, "set");
        assert_eq!(asset.objects.len(), 2);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let mut pending = AssetLoader::spawn("/definitely/not/here/set.json");
        let result = loop {
            if let Some(result) = pending.try_take() {
                break result;
            }
            std::thread::yield_now();
        };
        assert!(matches!(result, Err(AssetError::Io { .. })));
    }

    #[test]
    fn unnamed_asset_takes_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.json");
        std::fs::write(&path, r#"{ "objects": [] }"#).unwrap();
        assert_eq!(SceneAsset::load(&path).unwrap().name, "arena");
    }

    #[test]
    fn bundled_set_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/set.json");
        let asset = SceneAsset::load(path).unwrap();
        assert_eq!(asset.name, "set");
        assert_eq!(asset.flatten().len(), 7);
    }
}
