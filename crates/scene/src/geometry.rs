use serde::{Deserialize, Serialize};

/// Shape of a renderable. Tessellation happens in the render backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// Plane in the local XY plane facing +Z.
    Plane { width: f32, height: f32 },
    #[serde(rename = "box")]
    Cuboid { width: f32, height: f32, depth: f32 },
    Sphere {
        radius: f32,
        #[serde(default = "default_sphere_segments")]
        segments: u32,
    },
    TorusKnot {
        #[serde(default = "default_knot_radius")]
        radius: f32,
        #[serde(default = "default_knot_tube")]
        tube: f32,
        #[serde(default = "default_tubular_segments")]
        tubular_segments: u32,
        #[serde(default = "default_radial_segments")]
        radial_segments: u32,
        #[serde(default = "default_p")]
        p: u32,
        #[serde(default = "default_q")]
        q: u32,
    },
    /// Explicit indexed triangle list. Missing normals are computed per face.
    Mesh {
        positions: Vec<[f32; 3]>,
        #[serde(default)]
        normals: Option<Vec<[f32; 3]>>,
        indices: Vec<u32>,
    },
}

fn default_sphere_segments() -> u32 {
    32
}
fn default_knot_radius() -> f32 {
    1.0
}
fn default_knot_tube() -> f32 {
    0.4
}
fn default_tubular_segments() -> u32 {
    64
}
fn default_radial_segments() -> u32 {
    8
}
fn default_p() -> u32 {
    2
}
fn default_q() -> u32 {
    3
}

/// Errors from geometry validation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("dimension `{0}` must be finite and positive")]
    Dimension(&'static str),
    #[error("segment count `{0}` is too small")]
    Segments(&'static str),
    #[error("index count {0} is not a multiple of 3")]
    Triangles(usize),
    #[error("index {index} out of bounds for {vertices} vertices")]
    IndexOutOfBounds { index: u32, vertices: usize },
    #[error("{normals} normals given for {positions} positions")]
    NormalCount { normals: usize, positions: usize },
    #[error("mesh has no triangles")]
    EmptyMesh,
}

fn positive(value: f32, name: &'static str) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::Dimension(name))
    }
}

impl Geometry {
    pub fn plane(width: f32, height: f32) -> Self {
        Self::Plane { width, height }
    }

    pub fn torus_knot(radius: f32, tube: f32, tubular_segments: u32, radial_segments: u32) -> Self {
        Self::TorusKnot {
            radius,
            tube,
            tubular_segments,
            radial_segments,
            p: default_p(),
            q: default_q(),
        }
    }

    /// Check that the geometry can be tessellated.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Geometry::Plane { width, height } => {
                positive(*width, "width")?;
                positive(*height, "height")
            }
            Geometry::Cuboid {
                width,
                height,
                depth,
            } => {
                positive(*width, "width")?;
                positive(*height, "height")?;
                positive(*depth, "depth")
            }
            Geometry::Sphere { radius, segments } => {
                positive(*radius, "radius")?;
                if *segments < 3 {
                    return Err(GeometryError::Segments("segments"));
                }
                Ok(())
            }
            Geometry::TorusKnot {
                radius,
                tube,
                tubular_segments,
                radial_segments,
                p,
                q,
            } => {
                positive(*radius, "radius")?;
                positive(*tube, "tube")?;
                if *tubular_segments < 3 {
                    return Err(GeometryError::Segments("tubular_segments"));
                }
                if *radial_segments < 3 {
                    return Err(GeometryError::Segments("radial_segments"));
                }
                if *p == 0 || *q == 0 {
                    return Err(GeometryError::Segments("p/q"));
                }
                Ok(())
            }
            Geometry::Mesh {
                positions,
                normals,
                indices,
            } => {
                if positions.is_empty() || indices.is_empty() {
                    return Err(GeometryError::EmptyMesh);
                }
                if indices.len() % 3 != 0 {
                    return Err(GeometryError::Triangles(indices.len()));
                }
                if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                    return Err(GeometryError::IndexOutOfBounds {
                        index,
                        vertices: positions.len(),
                    });
                }
                if let Some(normals) = normals {
                    if normals.len() != positions.len() {
                        return Err(GeometryError::NormalCount {
                            normals: normals.len(),
                            positions: positions.len(),
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tagged_geometry() {
        let g: Geometry =
            serde_json::from_str(r#"{"type":"box","width":1,"height":2,"depth":3}"#).unwrap();
        assert_eq!(
            g,
            Geometry::Cuboid {
                width: 1.0,
                height: 2.0,
                depth: 3.0
            }
        );

        let knot: Geometry = serde_json::from_str(r#"{"type":"torus_knot"}"#).unwrap();
        assert!(matches!(knot, Geometry::TorusKnot { p: 2, q: 3, .. }));
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert_eq!(
            Geometry::plane(0.0, 1.0).validate(),
            Err(GeometryError::Dimension("width"))
        );
        assert!(Geometry::plane(f32::NAN, 1.0).validate().is_err());
        assert!(Geometry::torus_knot(3.0, 1.0, 256, 32).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_index() {
        let mesh = Geometry::Mesh {
            positions: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: None,
            indices: vec![0, 1, 3],
        };
        assert_eq!(
            mesh.validate(),
            Err(GeometryError::IndexOutOfBounds {
                index: 3,
                vertices: 3
            })
        );
    }

    #[test]
    fn rejects_partial_triangles() {
        let mesh = Geometry::Mesh {
            positions: vec![[0.0; 3]; 3],
            normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
            indices: vec![0, 1],
        };
        assert_eq!(mesh.validate(), Err(GeometryError::Triangles(2)));
    }

    #[test]
    fn rejects_empty_mesh() {
        let no_indices: Geometry =
            serde_json::from_str(r#"{"type":"mesh","positions":[[0,0,0]],"indices":[]}"#).unwrap();
        assert_eq!(no_indices.validate(), Err(GeometryError::EmptyMesh));

        let nothing: Geometry =
            serde_json::from_str(r#"{"type":"mesh","positions":[],"indices":[]}"#).unwrap();
        assert_eq!(nothing.validate(), Err(GeometryError::EmptyMesh));
    }
}
