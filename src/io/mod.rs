//! Mesh I/O.
//!
//! Readers parse a whole stream into a [`MeshData`] before anything touches
//! the target mesh, so a malformed stream leaves the mesh as it was.

pub mod mesh_text;

use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::geometry::transform::GeometricTransformation;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::{ConvexId, PointId, RegionId};
use crate::topology::region::MeshRegion;

pub use mesh_text::MeshTextFormat;

/// Staged content of a mesh stream, with the line each item came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub points: Vec<(usize, PointId, Vec<f64>)>,
    pub convexes: Vec<(usize, ConvexId, GeometricTransformation, Vec<PointId>)>,
    pub regions: BTreeMap<RegionId, (usize, MeshRegion)>,
}

/// Parses a stream into [`MeshData`].
pub trait MeshReader {
    fn read<R: Read>(&self, reader: R) -> Result<MeshData, MeshError>;
}

/// Serializes a mesh.
pub trait MeshWriter {
    fn write<W: Write>(&self, writer: W, mesh: &Mesh) -> Result<(), MeshError>;
}
