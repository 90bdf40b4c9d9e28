use ordered_float::OrderedFloat;

pub type Vertex = [f64; 3];
pub type Normal = [f64; 3];

/// Indices into the vertex list, in consistent winding order.
pub type Face = [usize; 3];

/// A decomposed triangle mesh: unique vertices, per-vertex normals, and
/// faces as index triples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
  pub vertices: Vec<Vertex>,
  pub normals: Vec<Normal>,
  pub faces: Vec<Face>,
  /// Min and max corner over all vertices.
  pub bbox: [Vertex; 2],
}

impl Mesh {
  pub fn count(&self) -> usize {
    self.faces.len()
  }

  pub fn is_empty(&self) -> bool {
    self.faces.is_empty()
  }

  /// Structural TIN validation: every face references distinct, in-range
  /// vertices and faces upward in `(x, y)`; every vertex is referenced by
  /// some face; no two vertices coincide.
  pub fn check_tin(&self) -> bool {
    let n = self.vertices.len();
    let mut used = vec![false; n];

    for face in &self.faces {
      if face[0] >= n || face[1] >= n || face[2] >= n {
        return false;
      }
      if face[0] == face[1] || face[0] == face[2] || face[1] == face[2] {
        return false;
      }
      used[face[0]] = true;
      used[face[1]] = true;
      used[face[2]] = true;
      if !is_facing_upwards(
        self.vertices[face[0]],
        self.vertices[face[1]],
        self.vertices[face[2]],
      ) {
        return false;
      }
    }

    if used.iter().any(|u| !*u) {
      return false;
    }

    let mut keys: Vec<[OrderedFloat<f64>; 3]> = self
      .vertices
      .iter()
      .map(|v| [OrderedFloat(v[0]), OrderedFloat(v[1]), OrderedFloat(v[2])])
      .collect();
    keys.sort();
    !keys.windows(2).any(|w| w[0] == w[1])
  }
}

/// The 2D projection of the face has non-negative signed area.
pub fn is_facing_upwards(t0: Vertex, t1: Vertex, t2: Vertex) -> bool {
  let nz = (t0[0] - t1[0]) * (t0[1] - t2[1]) - (t0[0] - t2[0]) * (t0[1] - t1[1]);
  nz >= 0.0
}
