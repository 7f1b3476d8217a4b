//! Extrusion of a mesh into one more dimension.
//!
//! Every point `x` of the input gives `nb_layers + 1` points `(x, k / nb_layers)`
//! and every convex gives `nb_layers` convexes stacked along the new axis:
//!
//! - a simplex of dimension `d` becomes a prism of dimension `d + 1`;
//! - a parallelepiped of dimension `d` becomes one of dimension `d + 1`.
//!
//! Both target shapes list the bottom copy of the nodes first and the top
//! copy second, so a layer is the base point list at level `k` followed by
//! the same list at level `k + 1`. Prisms cannot be extruded.

use hashbrown::HashMap;

use crate::geometry::transform::GeometricTransformation;
use crate::mesh::{Mesh, MeshConfig};
use crate::mesh_error::MeshError;
use crate::topology::convex_structure::ConvexStructure;
use crate::topology::point::PointId;

/// Builds the `d + 1` dimensional mesh swept by `input` along `[0, 1]` in
/// `nb_layers` layers. Regions are not carried over.
pub fn extrude(input: &Mesh, nb_layers: usize) -> Result<Mesh, MeshError> {
    if nb_layers == 0 {
        return Err(MeshError::PreconditionViolation(
            "extrusion needs at least one layer".into(),
        ));
    }
    let config = MeshConfig {
        dim: input.dim().map(|d| d + 1),
        ..input.config().clone()
    };
    let mut out = Mesh::with_config(config);

    let mut levels: HashMap<PointId, Vec<PointId>> = HashMap::with_capacity(input.nb_points());
    let mut x = Vec::new();
    for p in input.point_ids() {
        let coords = input
            .point(p)
            .ok_or_else(|| MeshError::point_not_found(p.get()))?;
        let mut column = Vec::with_capacity(nb_layers + 1);
        for k in 0..=nb_layers {
            x.clear();
            x.extend_from_slice(coords);
            x.push(k as f64 / nb_layers as f64);
            column.push(out.add_point_unmerged(&x)?);
        }
        levels.insert(p, column);
    }

    for cv in input.convex_ids() {
        let gt = extruded_trans(input.trans_of_convex(cv)?)?;
        let base = input.ind_points_of_convex(cv)?;
        let mut pts = Vec::with_capacity(2 * base.len());
        for k in 0..nb_layers {
            pts.clear();
            for level in [k, k + 1] {
                for p in base {
                    let column = levels
                        .get(p)
                        .ok_or_else(|| MeshError::point_not_found(p.get()))?;
                    pts.push(column[level]);
                }
            }
            out.add_convex(gt, &pts)?;
        }
    }

    log::debug!(
        "extruded mesh {} into {} convexes over {nb_layers} layers",
        input.uid(),
        out.nb_convex()
    );
    Ok(out)
}

fn extruded_trans(gt: GeometricTransformation) -> Result<GeometricTransformation, MeshError> {
    match gt.structure() {
        ConvexStructure::Simplex(d) => GeometricTransformation::prism(usize::from(d) + 1),
        ConvexStructure::Parallelepiped(d) => {
            GeometricTransformation::parallelepiped(usize::from(d) + 1)
        }
        ConvexStructure::Prism(_) => Err(MeshError::PreconditionViolation(format!(
            "{gt} cannot be extruded"
        ))),
    }
}
