//! The Zemlya hierarchical greedy refiner.
//!
//! A multi-resolution pyramid feeds a priority-queued greedy loop: at
//! each level, every live triangle is scanned for its worst-fitting
//! pixel, and the worst candidates are inserted into the Delaunay mesh
//! until none exceeds the error bound. Insertion re-scans the affected
//! triangles through the [`TriangleScanner`] callback, and stale queue
//! entries are dropped at pop time via per-pixel generation tokens.

mod candidate;

pub use candidate::{Candidate, CandidateHeap};

use crate::data::line::Plane;
use crate::data::mesh::{Face, Mesh, Normal, Vertex};
use crate::data::raster::{is_no_data, Raster};
use crate::delaunay::{DelaunayMesh, FaceId, TriangleScanner};
use crate::predicates::is_ccw;
use crate::repair::repair_point;

pub struct ZemlyaMesh {
  mesh: Option<DelaunayMesh>,
  scan: ScanState,
}

/// Everything the triangle scanner needs: the input raster, the
/// auxiliary rasters (sized once, never resized), the candidate heap
/// and the token counter.
struct ScanState {
  raster: Raster<f64>,
  sample: Raster<f64>,
  insert: Raster<f64>,
  result: Raster<f64>,
  used: Raster<u8>,
  token: Raster<i32>,
  candidates: CandidateHeap,
  counter: i32,
  current_level: u32,
  max_level: u32,
  max_error: f64,
}

impl ZemlyaMesh {
  pub fn new(raster: Raster<f64>) -> ZemlyaMesh {
    let rows = raster.rows();
    let cols = raster.cols();
    let no_data = raster.no_data();
    ZemlyaMesh {
      mesh: None,
      scan: ScanState {
        sample: Raster::new(rows, cols, no_data),
        insert: Raster::new(rows, cols, no_data),
        result: Raster::new(rows, cols, no_data),
        used: Raster::new(rows, cols, 0),
        token: Raster::new(rows, cols, 0),
        candidates: CandidateHeap::new(),
        counter: 0,
        current_level: 0,
        max_level: 0,
        max_error: 0.0,
        raster,
      },
    }
  }

  pub fn raster(&self) -> &Raster<f64> {
    &self.scan.raster
  }

  /// Final elevations at inserted pixels; no-data elsewhere.
  pub fn result(&self) -> &Raster<f64> {
    &self.scan.result
  }

  pub fn delaunay(&self) -> Option<&DelaunayMesh> {
    self.mesh.as_ref()
  }

  /// Refine until every pixel fits the TIN to within `max_error`.
  ///
  /// Rasters too small to carry the corner rectangle are left alone;
  /// [`ZemlyaMesh::to_mesh`] then yields an empty mesh.
  pub fn greedy_insert(&mut self, max_error: f64) {
    let rows = self.scan.raster.rows();
    let cols = self.scan.raster.cols();
    if rows < 2 || cols < 2 {
      return;
    }

    self.scan.max_error = max_error;
    self.scan.counter = 0;
    self.scan.max_level = (rows.max(cols) as f64).log2().ceil() as u32;

    self.scan.build_sample_pyramid();

    repair_point(&mut self.scan.raster, 0, 0);
    repair_point(&mut self.scan.raster, rows - 1, 0);
    repair_point(&mut self.scan.raster, rows - 1, cols - 1);
    repair_point(&mut self.scan.raster, 0, cols - 1);

    for (row, col) in [(0, 0), (rows - 1, 0), (rows - 1, cols - 1), (0, cols - 1)] {
      let z = self.scan.raster.value(row, col);
      self.scan.result.set_value(row, col, z);
    }

    let right = (cols - 1) as f64;
    let bottom = (rows - 1) as f64;
    self.mesh = Some(DelaunayMesh::from_rect(
      [0.0, 0.0],
      [0.0, bottom],
      [right, bottom],
      [right, 0.0],
    ));
    let mesh = self.mesh.as_mut().unwrap();

    for level in 1..=self.scan.max_level {
      self.scan.current_level = level;
      self.scan.used.fill(0);
      self.scan.prepare_insert_raster(level);

      let faces: Vec<FaceId> = mesh.faces().collect();
      for face in faces {
        self.scan.scan_triangle(mesh, face);
      }

      while let Some(candidate) = self.scan.candidates.grab_greatest() {
        if candidate.importance < self.scan.max_error {
          continue;
        }
        // Lazy invalidation: a newer scan owns this pixel.
        if self.scan.token.value(candidate.y, candidate.x) != candidate.token {
          continue;
        }

        self.scan.result.set_value(candidate.y, candidate.x, candidate.z);
        self.scan.used.set_value(candidate.y, candidate.x, 1);

        mesh.insert(
          [candidate.x as f64, candidate.y as f64],
          Some(candidate.triangle),
          &mut self.scan,
        );
      }
    }
  }

  /// Emit the TIN as a decomposed mesh: one vertex per inserted pixel
  /// (at cell-centre geographic coordinates, transformed when the
  /// raster carries a transform), area-weighted per-vertex normals, and
  /// faces wound counter-clockwise in `(x, y)`.
  pub fn to_mesh(&self) -> Mesh {
    let mesh = match &self.mesh {
      Some(mesh) => mesh,
      None => return Mesh::default(),
    };

    let raster = &self.scan.raster;
    let rows = raster.rows();
    let cols = raster.cols();
    let no_data = raster.no_data();

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut vertex_id: Raster<i32> = Raster::new(rows, cols, 0);
    let mut min = [f64::MAX; 3];
    let mut max = [f64::MIN; 3];

    for row in 0..rows {
      for col in 0..cols {
        let z = self.scan.result.value(row, col);
        if is_no_data(z, no_data) {
          continue;
        }
        let mut v = [raster.col_to_x(col), raster.row_to_y(row), z];
        if let Some(transform) = raster.transform() {
          v = transform(v);
        }
        for i in 0..3 {
          min[i] = min[i].min(v[i]);
          max[i] = max[i].max(v[i]);
        }
        vertex_id.set_value(row, col, vertices.len() as i32);
        vertices.push(v);
      }
    }

    let id_of = |p: [f64; 2]| vertex_id.value(p[1] as usize, p[0] as usize) as usize;

    let mut normals: Vec<Normal> = vec![[0.0; 3]; vertices.len()];
    let mut faces: Vec<Face> = Vec::new();

    for face in mesh.faces() {
      let [p1, p2, p3] = mesh.triangle_points(face);

      // Pixel rows grow downward, so a pixel-space counter-clockwise
      // face is clockwise in geographic coordinates; reverse it.
      let f: Face = if !is_ccw(p1, p2, p3) {
        [id_of(p1), id_of(p2), id_of(p3)]
      } else {
        [id_of(p3), id_of(p2), id_of(p1)]
      };
      faces.push(f);

      let v0 = vertices[f[0]];
      let v1 = vertices[f[1]];
      let v2 = vertices[f[2]];
      let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
      let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
      // Unnormalised cross product: accumulation is area-weighted.
      let n = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
      ];
      for &i in &f {
        normals[i][0] += n[0];
        normals[i][1] += n[1];
        normals[i][2] += n[2];
      }
    }

    for n in &mut normals {
      let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
      if len > 0.0 {
        n[0] /= len;
        n[1] /= len;
        n[2] /= len;
      }
    }

    let bbox = if vertices.is_empty() {
      [[0.0; 3]; 2]
    } else {
      [min, max]
    };

    Mesh {
      vertices,
      normals,
      faces,
      bbox,
    }
  }
}

impl ScanState {
  /// Burt–Adelson style pyramid sampled into one raster: coarser levels
  /// live on sparser sub-lattices offset so they never collide with
  /// finer ones.
  fn build_sample_pyramid(&mut self) {
    let rows = self.raster.rows();
    let cols = self.raster.cols();
    let no_data = self.raster.no_data();

    for level in (1..self.max_level).rev() {
      let step = self.max_level - level;
      let stride = 1usize << step;

      for y in (0..rows).step_by(stride) {
        for x in (0..cols).step_by(stride) {
          if step == 1 {
            let v = average_of(
              [
                self.raster.value_or_nan(y as i64, x as i64),
                self.raster.value_or_nan(y as i64, x as i64 + 1),
                self.raster.value_or_nan(y as i64 + 1, x as i64),
                self.raster.value_or_nan(y as i64 + 1, x as i64 + 1),
              ],
              no_data,
            );
            if y + 1 < rows && x + 1 < cols {
              self.sample.set_value(y + 1, x + 1, v);
            }
          } else {
            let co = 1i64 << (step - 1);
            let d = 1i64 << (step - 2);
            let yc = y as i64 + co;
            let xc = x as i64 + co;
            let v = average_of(
              [
                self.raster.value_or_nan(yc - d, xc - d),
                self.raster.value_or_nan(yc - d, xc + d),
                self.raster.value_or_nan(yc + d, xc - d),
                self.raster.value_or_nan(yc + d, xc + d),
              ],
              no_data,
            );
            if (yc as usize) < rows && (xc as usize) < cols {
              self.sample.set_value(yc as usize, xc as usize, v);
            }
          }
        }
      }
    }
  }

  /// Populate the insert raster for `level`: the active working copy
  /// the scanlines read below the final level. Finer levels refresh
  /// already-valid cells and add the level's sub-lattice centres.
  fn prepare_insert_raster(&mut self, level: u32) {
    let rows = self.raster.rows();
    let cols = self.raster.cols();
    let no_data = self.raster.no_data();
    let step = self.max_level - level;

    if level >= 5 && level + 1 <= self.max_level {
      for y in 0..rows {
        for x in 0..cols {
          if is_no_data(self.insert.value(y, x), no_data) {
            continue;
          }
          self.insert.set_value(y, x, self.raster.value(y, x));
        }
      }

      let stride = 1usize << step;
      let co = 1usize << (step - 1);
      for y in (0..rows).step_by(stride) {
        for x in (0..cols).step_by(stride) {
          if y + co < rows && x + co < cols {
            self
              .insert
              .set_value(y + co, x + co, self.raster.value(y + co, x + co));
          }
        }
      }
    } else if level < self.max_level {
      if step >= 3 {
        let d = 1i64 << (step - 3);
        for y in 0..rows {
          for x in 0..cols {
            if is_no_data(self.insert.value(y, x), no_data) {
              continue;
            }
            let avg = average_of(
              [
                self.sample.value_or_nan(y as i64 - d, x as i64 - d),
                self.sample.value_or_nan(y as i64 - d, x as i64 + d),
                self.sample.value_or_nan(y as i64 + d, x as i64 - d),
                self.sample.value_or_nan(y as i64 + d, x as i64 + d),
              ],
              no_data,
            );
            if !is_no_data(avg, no_data) {
              self.insert.set_value(y, x, avg);
            }
          }
        }
      }

      let stride = 1usize << step;
      let co = 1usize << (step - 1);
      for y in (0..rows).step_by(stride) {
        for x in (0..cols).step_by(stride) {
          if y + co < rows && x + co < cols {
            self
              .insert
              .set_value(y + co, x + co, self.sample.value(y + co, x + co));
          }
        }
      }
    }
    // At the final level the scanlines read the input raster directly.
  }

  fn compute_plane(&self, points: [[f64; 2]; 3]) -> Plane {
    let lift = |p: [f64; 2]| {
      let z = self.result.value(p[1] as usize, p[0] as usize);
      [p[0], p[1], z]
    };
    Plane::new(lift(points[0]), lift(points[1]), lift(points[2]))
  }

  fn scan_line(&self, plane: &Plane, y: i64, x1: f64, x2: f64, candidate: &mut Candidate) {
    let startx = x1.min(x2).ceil() as i64;
    let endx = x1.max(x2).floor() as i64;
    if startx > endx {
      return;
    }

    let no_data = self.raster.no_data();
    let mut z0 = plane.eval(startx as f64, y as f64);
    let dz = plane.a;

    for x in startx..=endx {
      if self.used.value(y as usize, x as usize) == 0 {
        let zv = if self.current_level == self.max_level {
          self.raster.value(y as usize, x as usize)
        } else {
          self.insert.value(y as usize, x as usize)
        };
        if !is_no_data(zv, no_data) {
          candidate.consider(x as usize, y as usize, zv, (zv - z0).abs());
        }
      }
      z0 += dz;
    }
  }
}

impl TriangleScanner for ScanState {
  /// Rasterise one triangle with a two-edge DDA, track its worst
  /// unfitted pixel, stamp that pixel's token and queue the candidate
  /// when it exceeds the error bound.
  fn scan_triangle(&mut self, mesh: &DelaunayMesh, face: FaceId) {
    let points = mesh.triangle_points(face);
    let plane = self.compute_plane(points);

    let mut by_y = points;
    order_by_y(&mut by_y);
    let [v0, v1, v2] = by_y;

    let token = self.counter;
    self.counter += 1;
    let mut candidate = Candidate::start(token, face);

    let y0 = v0[1] as i64;
    let y1 = v1[1] as i64;
    let y2 = v2[1] as i64;
    let dx2 = (v2[0] - v0[0]) / (v2[1] - v0[1]);
    let mut x2 = v0[0];

    if y1 != y0 {
      let dx1 = (v1[0] - v0[0]) / (v1[1] - v0[1]);
      let mut x1 = v0[0];
      for y in y0..y1 {
        self.scan_line(&plane, y, x1, x2, &mut candidate);
        x1 += dx1;
        x2 += dx2;
      }
    }

    if y2 != y1 {
      let dx1 = (v2[0] - v1[0]) / (v2[1] - v1[1]);
      let mut x1 = v1[0];
      for y in y1..=y2 {
        self.scan_line(&plane, y, x1, x2, &mut candidate);
        x1 += dx1;
        x2 += dx2;
      }
    } else if y1 != y0 {
      // Flat-bottom triangle: the closing scanline runs between the
      // two bottom vertices.
      self.scan_line(&plane, y1, v1[0], v2[0], &mut candidate);
    }

    if candidate.found() {
      self.token.set_value(candidate.y, candidate.x, candidate.token);
      if candidate.importance >= self.max_error {
        self.candidates.push(candidate);
      }
    }
  }
}

fn order_by_y(p: &mut [[f64; 2]; 3]) {
  if p[0][1] > p[1][1] {
    p.swap(0, 1);
  }
  if p[1][1] > p[2][1] {
    p.swap(1, 2);
  }
  if p[0][1] > p[1][1] {
    p.swap(0, 1);
  }
}

fn average_of(values: [f64; 4], no_data: f64) -> f64 {
  let mut sum = 0.0;
  let mut count = 0;
  for v in values {
    if is_no_data(v, no_data) {
      continue;
    }
    sum += v;
    count += 1;
  }
  if count == 0 {
    f64::NAN
  } else {
    sum / count as f64
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raster_5x5(values: [[f64; 5]; 5]) -> Raster<f64> {
    let flat: Vec<f64> = values.iter().flatten().copied().collect();
    let mut raster = Raster::from_data(5, 5, f64::NAN, flat).unwrap();
    raster.set_xy_pos(0.0, 0.0, 1.0);
    raster
  }

  #[test]
  fn sample_pyramid_of_a_spike() {
    let mut values = [[0.0; 5]; 5];
    values[2][2] = 10.0;
    let mut zemlya = ZemlyaMesh::new(raster_5x5(values));
    zemlya.scan.max_level = 3;
    zemlya.scan.build_sample_pyramid();

    // step 1 lattice: 2x2 averages stored at odd positions.
    assert_eq!(zemlya.scan.sample.value(1, 1), 0.0);
    assert_eq!(zemlya.scan.sample.value(1, 3), 0.0);
    assert_eq!(zemlya.scan.sample.value(3, 1), 0.0);
    assert_eq!(zemlya.scan.sample.value(3, 3), 2.5);
    // step 2 lattice: centre of the 4x4 block, sampled at offset 1.
    assert_eq!(zemlya.scan.sample.value(2, 2), 0.0);
  }

  #[test]
  fn pyramid_skips_no_data() {
    let mut values = [[1.0; 5]; 5];
    values[0][0] = f64::NAN;
    values[0][1] = f64::NAN;
    values[1][0] = f64::NAN;
    let mut zemlya = ZemlyaMesh::new(raster_5x5(values));
    zemlya.scan.max_level = 3;
    zemlya.scan.build_sample_pyramid();
    // Only (1, 1) of the four contributors is valid.
    assert_eq!(zemlya.scan.sample.value(1, 1), 1.0);
  }

  #[test]
  fn flat_raster_keeps_only_the_corners() {
    let mut zemlya = ZemlyaMesh::new(raster_5x5([[0.0; 5]; 5]));
    zemlya.greedy_insert(0.1);

    let result = zemlya.result();
    for row in 0..5 {
      for col in 0..5 {
        let corner = (row == 0 || row == 4) && (col == 0 || col == 4);
        assert_eq!(
          !is_no_data(result.value(row, col), f64::NAN),
          corner,
          "unexpected result at ({}, {})",
          row,
          col
        );
      }
    }

    let mesh = zemlya.to_mesh();
    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.faces.len(), 2);
    assert!(mesh.check_tin());
  }

  #[test]
  fn spike_is_recovered_exactly() {
    let mut values = [[0.0; 5]; 5];
    values[2][2] = 10.0;
    let mut zemlya = ZemlyaMesh::new(raster_5x5(values));
    zemlya.greedy_insert(0.5);

    let result = zemlya.result();
    assert_eq!(result.value(2, 2), 10.0);

    // Every recovered pixel matches the input exactly.
    for row in 0..5 {
      for col in 0..5 {
        let z = result.value(row, col);
        if !is_no_data(z, f64::NAN) {
          assert_eq!(z, zemlya.raster().value(row, col));
        }
      }
    }

    let mesh = zemlya.to_mesh();
    assert!(mesh.faces.len() >= 4);
    assert!(mesh.vertices.len() < 25);
    assert!(mesh
      .vertices
      .iter()
      .any(|v| v[0] == 2.5 && v[1] == 2.5 && v[2] == 10.0));
    assert!(mesh.check_tin());
  }

  #[test]
  fn empty_raster_yields_empty_mesh() {
    let mut zemlya = ZemlyaMesh::new(Raster::new(0, 0, f64::NAN));
    zemlya.greedy_insert(0.5);
    assert!(zemlya.to_mesh().is_empty());

    let mut zemlya = ZemlyaMesh::new(Raster::new(1, 7, f64::NAN));
    zemlya.greedy_insert(0.5);
    assert!(zemlya.to_mesh().is_empty());
  }

  #[test]
  fn generate_tin_mesh_drives_the_refiner() {
    let mesh = crate::generate_tin_mesh(raster_5x5([[3.0; 5]; 5]), 0.1);
    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.faces.len(), 2);
    for v in &mesh.vertices {
      assert_eq!(v[2], 3.0);
    }
  }
}
