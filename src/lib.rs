//! Adaptive simplification of raster elevation models (DEMs) into
//! triangulated irregular networks (TINs).
//!
//! The pipeline is layered bottom-up: floating-point [geometric
//! predicates](predicates), a [quad-edge](quadedge) arena, an incremental
//! [Delaunay mesh](DelaunayMesh), and the hierarchical greedy
//! [refiner](ZemlyaMesh) that drives point insertion until every raster
//! pixel fits the current TIN to within a vertical error bound.
//!
//! ```rust
//! use demtin::{generate_tin_mesh, Raster};
//!
//! let mut dem = Raster::new(5, 5, f64::NAN);
//! for row in 0..5 {
//!   for col in 0..5 {
//!     dem.set_value(row, col, 0.0);
//!   }
//! }
//! dem.set_value(2, 2, 10.0);
//! let mesh = generate_tin_mesh(dem, 0.5);
//! assert!(!mesh.is_empty());
//! ```

pub mod data;
mod delaunay;
pub mod predicates;
pub mod quadedge;
pub mod repair;
pub mod testing;
mod zemlya;

pub use data::line::{Line, Plane};
pub use data::mesh::{Face, Mesh, Normal, Vertex};
pub use data::raster::{is_no_data, Raster};
pub use delaunay::{DelaunayMesh, FaceId, TriangleScanner};
pub use zemlya::{Candidate, CandidateHeap, ZemlyaMesh};

/// Tolerance for coordinate comparisons throughout the crate.
pub const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// A raster was constructed from a buffer whose length does not match
  /// the requested dimensions.
  DimensionMismatch,
}

/// Triangulate a raster down to `max_error` vertical tolerance and emit the
/// resulting mesh.
///
/// No-data corners are repaired in place before triangulation; rasters too
/// small to carry the initial corner rectangle yield an empty mesh.
pub fn generate_tin_mesh(raster: Raster<f64>, max_error: f64) -> Mesh {
  let mut zemlya = ZemlyaMesh::new(raster);
  zemlya.greedy_insert(max_error);
  zemlya.to_mesh()
}
