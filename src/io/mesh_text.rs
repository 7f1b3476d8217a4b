//! Plain-text mesh format.
//!
//! ```text
//! % fem-mesh file
//! BEGIN POINTS LIST
//!   POINT  0  0.0  0.0
//!   POINT  1  1.0  0.0
//!   POINT  2  0.0  1.0
//! END POINTS LIST
//! BEGIN MESH STRUCTURE DESCRIPTION
//!   CONVEX 0  'GT_PK(2,1)'  0 1 2
//! END MESH STRUCTURE DESCRIPTION
//! BEGIN REGION 3
//!   0/1 0/2
//! END REGION 3
//! ```
//!
//! - Lines starting with `%` and blank lines are ignored; keywords are
//!   case-insensitive.
//! - Ids are written and read back verbatim, holes included.
//! - Coordinates use the shortest representation that parses back to the
//!   same `f64`, so a write/read round trip is bit-exact.
//! - Region entries are `cv` (whole convex) or `cv/f` (face `f`); the token
//!   `ALL` stands for the all-convexes region.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use itertools::Itertools;

use crate::geometry::point_store::PointStore;
use crate::geometry::transform::GeometricTransformation;
use crate::io::{MeshData, MeshReader, MeshWriter};
use crate::mesh::convexes::ConvexRecord;
use crate::mesh::{ConvexStore, Mesh};
use crate::mesh_error::MeshError;
use crate::topology::point::{ConvexId, FaceId, PointId, RegionId};
use crate::topology::region::{MeshRegion, RegionTable};

/// Reader and writer of the plain-text format.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshTextFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Top,
    Points,
    Convexes,
    Region(RegionId),
}

impl MeshTextFormat {
    fn parse_id(raw: &str, what: &str, line: usize) -> Result<usize, MeshError> {
        raw.parse::<usize>()
            .map_err(|_| MeshError::format(line, format!("invalid {what} id: {raw}")))
    }

    fn parse_coord(raw: &str, line: usize) -> Result<f64, MeshError> {
        raw.parse::<f64>()
            .map_err(|_| MeshError::format(line, format!("invalid coordinate: {raw}")))
    }

    fn parse_region_entry(raw: &str, line: usize) -> Result<(ConvexId, FaceId), MeshError> {
        let (cv, face) = match raw.split_once('/') {
            Some((cv, f)) => {
                let f = Self::parse_id(f, "face", line)?;
                let face = FaceId::try_face(f)
                    .ok_or_else(|| MeshError::format(line, format!("face number {f} out of range")))?;
                (cv, face)
            }
            None => (raw, FaceId::WHOLE),
        };
        Ok((ConvexId::new(Self::parse_id(cv, "convex", line)?), face))
    }
}

fn is_kw(token: Option<&str>, kw: &str) -> bool {
    token.is_some_and(|t| t.eq_ignore_ascii_case(kw))
}

impl MeshReader for MeshTextFormat {
    fn read<R: Read>(&self, mut reader: R) -> Result<MeshData, MeshError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;

        let mut data = MeshData::default();
        let mut section = Section::Top;

        for (i, raw) in contents.lines().enumerate() {
            let line = i + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('%') {
                continue;
            }
            let tokens: Vec<&str> = text.split_whitespace().collect();
            let first = tokens.first().copied();

            if is_kw(first, "BEGIN") {
                if section != Section::Top {
                    return Err(MeshError::format(line, "nested BEGIN"));
                }
                let rest = &tokens[1..];
                section = match rest {
                    [p, l] if p.eq_ignore_ascii_case("POINTS") && l.eq_ignore_ascii_case("LIST") => {
                        Section::Points
                    }
                    [m, s, d]
                        if m.eq_ignore_ascii_case("MESH")
                            && s.eq_ignore_ascii_case("STRUCTURE")
                            && d.eq_ignore_ascii_case("DESCRIPTION") =>
                    {
                        Section::Convexes
                    }
                    [r, id] if r.eq_ignore_ascii_case("REGION") => {
                        let rid = Self::parse_id(id, "region", line)?;
                        if data.regions.contains_key(&rid) {
                            return Err(MeshError::format(line, format!("region {rid} defined twice")));
                        }
                        data.regions.insert(rid, (line, MeshRegion::new()));
                        Section::Region(rid)
                    }
                    _ => return Err(MeshError::format(line, format!("unknown section: {text}"))),
                };
                continue;
            }
            if is_kw(first, "END") {
                if section == Section::Top {
                    return Err(MeshError::format(line, "END outside of a section"));
                }
                section = Section::Top;
                continue;
            }

            match section {
                Section::Top => {
                    return Err(MeshError::format(line, format!("unexpected line: {text}")));
                }
                Section::Points => {
                    if !is_kw(first, "POINT") || tokens.len() < 3 {
                        return Err(MeshError::format(line, format!("malformed point: {text}")));
                    }
                    let id = PointId::new(Self::parse_id(tokens[1], "point", line)?);
                    let coords = tokens[2..]
                        .iter()
                        .map(|t| Self::parse_coord(t, line))
                        .collect::<Result<Vec<_>, _>>()?;
                    data.points.push((line, id, coords));
                }
                Section::Convexes => {
                    if !is_kw(first, "CONVEX") || tokens.len() < 3 {
                        return Err(MeshError::format(line, format!("malformed convex: {text}")));
                    }
                    let id = ConvexId::new(Self::parse_id(tokens[1], "convex", line)?);
                    let gt = GeometricTransformation::parse(tokens[2])
                        .map_err(|e| MeshError::format(line, e.to_string()))?;
                    let pts = tokens[3..]
                        .iter()
                        .map(|t| Self::parse_id(t, "point", line).map(PointId::new))
                        .collect::<Result<Vec<_>, _>>()?;
                    data.convexes.push((line, id, gt, pts));
                }
                Section::Region(rid) => {
                    let Some((_, region)) = data.regions.get_mut(&rid) else {
                        return Err(MeshError::format(line, format!("region {rid} not opened")));
                    };
                    for tok in &tokens {
                        if tok.eq_ignore_ascii_case("ALL") {
                            *region = MeshRegion::all_convexes();
                        } else {
                            let (cv, face) = Self::parse_region_entry(tok, line)?;
                            region.add(cv, face);
                        }
                    }
                }
            }
        }
        if section != Section::Top {
            return Err(MeshError::format(
                contents.lines().count(),
                "unterminated section",
            ));
        }
        Ok(data)
    }
}

impl MeshWriter for MeshTextFormat {
    fn write<W: Write>(&self, mut w: W, mesh: &Mesh) -> Result<(), MeshError> {
        writeln!(w, "% fem-mesh file")?;
        writeln!(w)?;
        writeln!(w, "BEGIN POINTS LIST")?;
        for p in mesh.point_ids() {
            if let Some(x) = mesh.point(p) {
                write!(w, "  POINT  {p}")?;
                for c in x {
                    write!(w, "  {c:?}")?;
                }
                writeln!(w)?;
            }
        }
        writeln!(w, "END POINTS LIST")?;
        writeln!(w)?;
        writeln!(w, "BEGIN MESH STRUCTURE DESCRIPTION")?;
        for cv in mesh.convex_ids() {
            let rec = mesh.convex_or_err(cv)?;
            write!(w, "  CONVEX {cv}  '{}'", rec.trans())?;
            for p in rec.points() {
                write!(w, " {p}")?;
            }
            writeln!(w)?;
        }
        writeln!(w, "END MESH STRUCTURE DESCRIPTION")?;
        for rid in mesh.regions_index().iter() {
            let region = mesh.region(rid);
            writeln!(w)?;
            writeln!(w, "BEGIN REGION {rid}")?;
            if region.is_all() {
                writeln!(w, "  ALL")?;
            }
            for (cv, face) in region.iter() {
                match face.local() {
                    Some(f) => writeln!(w, "  {cv}/{f}")?,
                    None => writeln!(w, "  {cv}")?,
                }
            }
            writeln!(w, "END REGION {rid}")?;
        }
        w.flush()?;
        Ok(())
    }
}

impl Mesh {
    /// Writes the mesh in the plain-text format.
    pub fn write_to<W: Write>(&self, w: W) -> Result<(), MeshError> {
        MeshTextFormat.write(w, self)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), MeshError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Replaces the content of the mesh with a plain-text stream.
    ///
    /// The stream is parsed and checked completely first; on an
    /// [`IoFormat`](MeshError::IoFormat) error the mesh is unchanged.
    pub fn read_from<R: Read>(&mut self, r: R) -> Result<(), MeshError> {
        let data = MeshTextFormat.read(r)?;
        self.load(data)
    }

    pub fn read_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), MeshError> {
        self.read_from(File::open(path)?)
    }

    /// Checks staged data against the mesh configuration, then commits it.
    pub fn load(&mut self, data: MeshData) -> Result<(), MeshError> {
        let mut points = PointStore::new(self.config().dim, self.eps());
        for (line, id, coords) in &data.points {
            points
                .insert_at(*id, coords)
                .map_err(|e| MeshError::format(*line, e.to_string()))?;
        }

        let mut convexes = ConvexStore::default();
        for (line, cv, gt, pts) in &data.convexes {
            let line = *line;
            if convexes.contains(*cv) {
                return Err(MeshError::format(line, format!("convex {cv} defined twice")));
            }
            if pts.len() != gt.nb_points() {
                return Err(MeshError::format(
                    line,
                    format!("{gt} needs {} points, got {}", gt.nb_points(), pts.len()),
                ));
            }
            if let Some(p) = pts.iter().find(|&&p| !points.contains(p)) {
                return Err(MeshError::format(line, format!("undefined point {p}")));
            }
            if !pts.iter().all_unique() {
                return Err(MeshError::format(line, format!("repeated point in convex {cv}")));
            }
            if let Some(d) = points.dim() {
                if gt.dim() > d {
                    return Err(MeshError::format(line, format!("{gt} in dimension {d}")));
                }
            }
            let twin = points.record(pts[0]).and_then(|r| {
                r.convexes().iter().copied().find(|&other| {
                    convexes
                        .get(other)
                        .is_some_and(|o| o.structure() == gt.structure() && o.points() == &pts[..])
                })
            });
            if let Some(other) = twin {
                return Err(MeshError::format(
                    line,
                    format!("convex {cv} duplicates convex {other}"),
                ));
            }
            convexes.insert_at(
                *cv,
                ConvexRecord {
                    gt: *gt,
                    points: pts.clone(),
                },
            );
            for &p in pts {
                points.attach(p, *cv);
            }
        }

        let mut regions = RegionTable::new();
        for (rid, (line, region)) in data.regions {
            for (cv, face) in region.iter() {
                let Some(rec) = convexes.get(cv) else {
                    return Err(MeshError::format(line, format!("region {rid}: undefined convex {cv}")));
                };
                if face.local().is_some_and(|f| f >= rec.structure().nb_faces()) {
                    return Err(MeshError::format(line, format!("region {rid}: bad face {face:?} of {cv}")));
                }
            }
            regions.set(rid, region);
        }

        log::debug!(
            "loading {} points and {} convexes into mesh {}",
            points.len(),
            convexes.len(),
            self.uid()
        );
        self.replace_content(points, convexes, regions)?;
        crate::debug_invariants!(
            crate::debug_invariants::DebugInvariants::validate_invariants(self),
            "load"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn parse_regions(text: &str) -> Result<BTreeMap<RegionId, MeshRegion>, MeshError> {
        Ok(MeshTextFormat
            .read(text.as_bytes())?
            .regions
            .into_iter()
            .map(|(rid, (_, r))| (rid, r))
            .collect())
    }

    const SAMPLE: &str = "\
% two triangles
BEGIN POINTS LIST
  POINT 0 0.0 0.0
  POINT 1 1.0 0.0
  POINT 2 0.0 1.0
  POINT 5 1.0 1.0
END POINTS LIST
begin mesh structure description
  CONVEX 0 'GT_PK(2,1)' 0 1 2
  CONVEX 3 GT_PK(2,1) 1 5 2
END MESH STRUCTURE DESCRIPTION
BEGIN REGION 1
  0/1 3
  3/2
END REGION 1
";

    #[test]
    fn reads_ids_verbatim() {
        let mut m = Mesh::new();
        m.read_from(SAMPLE.as_bytes()).unwrap();
        assert_eq!(m.nb_points(), 4);
        assert_eq!(m.point(PointId::new(5)), Some(&[1.0, 1.0][..]));
        assert_eq!(
            m.ind_points_of_convex(ConvexId::new(3)).unwrap(),
            &[PointId::new(1), PointId::new(5), PointId::new(2)]
        );
        let r = m.region(1);
        assert!(r.contains_face(ConvexId::new(0), FaceId::face(1)));
        assert!(r.contains_face(ConvexId::new(3), FaceId::WHOLE));
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn write_read_is_exact() {
        let mut m = Mesh::new();
        m.add_triangle_by_points(&[0.1, 1.0 / 3.0], &[1e-300, 2.5], &[-7.0, 0.2])
            .unwrap();
        m.set_region(2, MeshRegion::all_convexes()).unwrap();
        let mut buf = Vec::new();
        m.write_to(&mut buf).unwrap();

        let mut back = Mesh::new();
        back.read_from(buf.as_slice()).unwrap();
        for p in m.point_ids() {
            assert_eq!(back.point(p), m.point(p));
        }
        assert!(back.region(2).is_all());
    }

    #[test]
    fn malformed_stream_leaves_mesh_untouched() {
        let mut m = Mesh::new();
        m.add_segment_by_points(&[0.0], &[1.0]).unwrap();
        let v = m.version();
        for (bad, line) in [
            ("BEGIN POINTS LIST\n POINT x 1.0\nEND POINTS LIST\n", 2),
            ("BEGIN POINTS LIST\n POINT 0 1.0\n", 2),
            ("BEGIN MESH STRUCTURE DESCRIPTION\n CONVEX 0 'GT_PK(1,1)' 0 1\nEND\n", 2),
            ("BEGIN REGION 1\n 4/x\nEND REGION 1\n", 2),
            ("POINT 0 1.0\n", 1),
        ] {
            match m.read_from(bad.as_bytes()) {
                Err(MeshError::IoFormat { line: l, .. }) => assert_eq!(l, line, "{bad}"),
                other => panic!("{bad}: {other:?}"),
            }
        }
        assert_eq!(m.nb_convex(), 1);
        assert_eq!(m.version(), v);
    }

    #[test]
    fn load_rejects_what_add_convex_rejects() {
        let points = "BEGIN POINTS LIST\n POINT 0 0.0 0.0\n POINT 1 1.0 0.0\n POINT 2 0.0 1.0\nEND POINTS LIST\n";
        let repeated = format!(
            "{points}BEGIN MESH STRUCTURE DESCRIPTION\n CONVEX 0 'GT_PK(2,1)' 0 1 1\nEND MESH STRUCTURE DESCRIPTION\n"
        );
        let twins = format!(
            "{points}BEGIN MESH STRUCTURE DESCRIPTION\n CONVEX 0 'GT_PK(2,1)' 0 1 2\n CONVEX 4 'GT_PK(2,1)' 0 1 2\nEND MESH STRUCTURE DESCRIPTION\n"
        );
        let mut m = Mesh::new();
        for (bad, line) in [(repeated, 7), (twins, 8)] {
            match m.read_from(bad.as_bytes()) {
                Err(MeshError::IoFormat { line: l, .. }) => assert_eq!(l, line, "{bad}"),
                other => panic!("{bad}: {other:?}"),
            }
        }
        assert_eq!(m.nb_points(), 0);

        let reordered = format!(
            "{points}BEGIN MESH STRUCTURE DESCRIPTION\n CONVEX 0 'GT_PK(2,1)' 0 1 2\n CONVEX 1 'GT_PK(2,1)' 0 2 1\nEND MESH STRUCTURE DESCRIPTION\n"
        );
        m.read_from(reordered.as_bytes()).unwrap();
        assert_eq!(m.nb_convex(), 2);
    }

    #[test]
    fn region_tokens() {
        let r = parse_regions("BEGIN REGION 7\n ALL\nEND REGION 7\n").unwrap();
        assert!(r[&7].is_all());
        assert!(parse_regions("BEGIN REGION 7\n 1/99\nEND REGION 7\n").is_err());
    }
}
