//! Input geometry collection.
//!
//! Hosts hand the pipeline a set of triangle soups, each with its own
//! transform. Collection flattens them into a single world-space buffer,
//! validating shapes as it goes; the pipeline never touches host memory
//! again after this point.

use glam::Mat4;
use waymesh_common::{calc_bounds, Aabb, Error, Result, Vec3};

/// One source of triangles, referenced from host memory.
pub struct GeometrySource<'a> {
    pub vertices: &'a [Vec3],
    pub indices: &'a [u32],
    /// Local-to-world transform applied during collection.
    pub transform: Mat4,
}

impl<'a> GeometrySource<'a> {
    pub fn new(vertices: &'a [Vec3], indices: &'a [u32]) -> Self {
        Self {
            vertices,
            indices,
            transform: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }
}

/// World-space triangle buffer owned by the pipeline.
pub struct GeometryBuffer {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl GeometryBuffer {
    /// Flatten sources into one world-space buffer.
    pub fn collect(sources: &[GeometrySource]) -> Result<Self> {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for source in sources {
            if source.indices.len() % 3 != 0 {
                return Err(Error::Geometry(format!(
                    "index count {} is not a multiple of 3",
                    source.indices.len()
                )));
            }
            let base = vertices.len() as u32;
            for &v in source.vertices {
                vertices.push(source.transform.transform_point3(v));
            }
            for &i in source.indices {
                if i as usize >= source.vertices.len() {
                    return Err(Error::Geometry(format!(
                        "index {} out of range ({} vertices)",
                        i,
                        source.vertices.len()
                    )));
                }
                indices.push(base + i);
            }
        }

        if indices.is_empty() {
            return Err(Error::Geometry("no triangles in input".into()));
        }

        let bounds = calc_bounds(&vertices);
        Ok(Self {
            vertices,
            indices,
            bounds,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        [
            self.vertices[self.indices[i * 3] as usize],
            self.vertices[self.indices[i * 3 + 1] as usize],
            self.vertices[self.indices[i * 3 + 2] as usize],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vec3>, Vec<u32>) {
        let verts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let indices = vec![0, 2, 1, 0, 3, 2];
        (verts, indices)
    }

    #[test]
    fn collects_and_transforms() {
        let (verts, indices) = quad();
        let shift = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let sources = [
            GeometrySource::new(&verts, &indices),
            GeometrySource::new(&verts, &indices).with_transform(shift),
        ];
        let buffer = GeometryBuffer::collect(&sources).unwrap();
        assert_eq!(buffer.triangle_count(), 4);
        assert_eq!(buffer.bounds.min.x, 0.0);
        assert_eq!(buffer.bounds.max.x, 11.0);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(GeometryBuffer::collect(&[]).is_err());
    }

    #[test]
    fn rejects_out_of_range_index() {
        let verts = vec![Vec3::ZERO, Vec3::X, Vec3::Z];
        let indices = vec![0, 1, 7];
        let sources = [GeometrySource::new(&verts, &indices)];
        assert!(GeometryBuffer::collect(&sources).is_err());
    }

    #[test]
    fn rejects_ragged_indices() {
        let verts = vec![Vec3::ZERO, Vec3::X, Vec3::Z];
        let indices = vec![0, 1];
        let sources = [GeometrySource::new(&verts, &indices)];
        assert!(GeometryBuffer::collect(&sources).is_err());
    }
}
