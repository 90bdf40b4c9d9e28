//! Incremental Delaunay triangulation over the quad-edge arena.
//!
//! The mesh starts as a bounding rectangle split by one diagonal and
//! grows by point insertion: locate the containing face with a
//! randomised edge walk, spoke the point in, then restore the
//! empty-circumcircle property by edge flips. Every face touched around
//! a newly inserted point is reported through [`TriangleScanner`].

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::data::line::Line;
use crate::predicates::{in_circumcircle, is_ccw, orientation, points_equal};
use crate::quadedge::{EdgeId, EdgePool};
use crate::EPS;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceId(u32);

impl std::fmt::Debug for FaceId {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "t{}", self.0)
  }
}

/// A triangle record: an anchor edge whose left face is this triangle,
/// and the intrusive link of the live-face list.
///
/// Records are recycled by re-anchoring, never freed: point insertion
/// reshapes the faces it subsumes onto edges of the new fan.
struct Triangle {
  anchor: EdgeId,
  next: Option<FaceId>,
}

/// Callback boundary between the triangulation and its driver.
///
/// Invoked for every face incident to a freshly inserted point, after
/// the mesh has been re-optimised. The mesh is quiescent during the
/// call.
pub trait TriangleScanner {
  fn scan_triangle(&mut self, mesh: &DelaunayMesh, face: FaceId);
}

/// No-op scanner for callers that only want the triangulation.
impl TriangleScanner for () {
  fn scan_triangle(&mut self, _mesh: &DelaunayMesh, _face: FaceId) {}
}

pub struct DelaunayMesh {
  edges: EdgePool,
  triangles: Vec<Triangle>,
  first_face: Option<FaceId>,
  starting_edge: EdgeId,
  rng: SmallRng,
}

impl DelaunayMesh {
  /// Build the initial two-triangle mesh over the rectangle
  /// `(a, b, c, d)`, consecutive corners sharing a side, wound the way
  /// the raster convention produces them (interior to the right of
  /// `a -> b`). The shared diagonal runs `a -> c`; the starting-edge
  /// hint is the side `a -> b`.
  pub fn from_rect(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> DelaunayMesh {
    let mut edges = EdgePool::new();

    let ea = edges.make_edge();
    edges.set_endpoints(ea, a, b);

    let eb = edges.make_edge();
    edges.splice(ea.sym(), eb);
    edges.set_endpoints(eb, b, c);

    let ec = edges.make_edge();
    edges.splice(eb.sym(), ec);
    edges.set_endpoints(ec, c, d);

    let ed = edges.make_edge();
    edges.splice(ec.sym(), ed);
    edges.set_endpoints(ed, d, a);
    edges.splice(ed.sym(), ea);

    let diag = edges.make_edge();
    edges.splice(ed.sym(), diag);
    edges.splice(eb.sym(), diag.sym());
    edges.set_endpoints(diag, a, c);

    let mut mesh = DelaunayMesh {
      edges,
      triangles: Vec::new(),
      first_face: None,
      starting_edge: ea,
      rng: SmallRng::seed_from_u64(0x5ca1ab1e),
    };
    mesh.make_face(ea.sym());
    mesh.make_face(ec.sym());
    mesh
  }

  pub fn edges(&self) -> &EdgePool {
    &self.edges
  }

  pub fn starting_edge(&self) -> EdgeId {
    self.starting_edge
  }

  pub fn face_count(&self) -> usize {
    self.triangles.len()
  }

  pub fn anchor(&self, face: FaceId) -> EdgeId {
    self.tri(face).anchor
  }

  /// The three corners of a face: anchor origin, anchor destination,
  /// and the far vertex.
  pub fn triangle_points(&self, face: FaceId) -> [[f64; 2]; 3] {
    let anchor = self.tri(face).anchor;
    [
      self.edges.orig(anchor),
      self.edges.dest(anchor),
      self.edges.orig(self.edges.lprev(anchor)),
    ]
  }

  /// Walk the intrusive list of live faces.
  pub fn faces(&self) -> Faces<'_> {
    Faces {
      mesh: self,
      cur: self.first_face,
    }
  }

  /// Insert `x` into the triangulation and notify `scanner` of every
  /// face incident to it. `hint` starts point location at a known face.
  ///
  /// Inserting an existing vertex skips spoking but still re-optimises
  /// (and re-scans) the fan around that vertex.
  pub fn insert<S: TriangleScanner>(&mut self, x: [f64; 2], hint: Option<FaceId>, scanner: &mut S) {
    let start = match hint {
      Some(face) => self.tri(face).anchor,
      None => self.starting_edge,
    };
    let e = self.locate(x, start);

    if points_equal(x, self.edges.orig(e)) || points_equal(x, self.edges.dest(e)) {
      self.optimize(x, e, scanner);
    } else {
      let spoke = self.spoke(x, e);
      self.optimize(x, spoke.sym(), scanner);
    }
  }

  /// Find an edge whose left face contains `x` (or which `x` lies on),
  /// walking from `start`. Updates the starting-edge hint.
  ///
  /// Ties on zero areas are broken by a coin flip so co-circular or
  /// collinear inputs cannot trap the walk in a cycle.
  pub fn locate(&mut self, x: [f64; 2], start: EdgeId) -> EdgeId {
    let mut e = start;
    let mut t = orientation(x, self.edges.dest(e), self.edges.orig(e));
    if t > 0.0 {
      t = -t;
      e = e.sym();
    }

    loop {
      let eo = self.edges.onext(e);
      let ed = self.edges.dprev(e);

      let to = orientation(x, self.edges.dest(eo), self.edges.orig(eo));
      let td = orientation(x, self.edges.dest(ed), self.edges.orig(ed));

      if td > 0.0 {
        if to > 0.0 || (to == 0.0 && t == 0.0) {
          self.starting_edge = e;
          return e;
        }
        t = to;
        e = eo;
      } else if to > 0.0 {
        if td == 0.0 && t == 0.0 {
          self.starting_edge = e;
          return e;
        }
        t = td;
        e = ed;
      } else if t == 0.0 && !self.left_of(self.edges.dest(eo), e) {
        e = e.sym();
      } else if self.rng.gen::<u32>() & 1 == 0 {
        t = to;
        e = eo;
      } else {
        t = td;
        e = ed;
      }
    }
  }

  ///////////////////////////////////////////////////////////////////////////
  // Face bookkeeping

  fn tri(&self, face: FaceId) -> &Triangle {
    &self.triangles[face.0 as usize]
  }

  fn tri_mut(&mut self, face: FaceId) -> &mut Triangle {
    &mut self.triangles[face.0 as usize]
  }

  fn make_face(&mut self, e: EdgeId) -> FaceId {
    let face = FaceId(self.triangles.len() as u32);
    self.triangles.push(Triangle {
      anchor: e,
      next: self.first_face,
    });
    self.first_face = Some(face);
    self.reshape(face, e);
    face
  }

  /// Re-anchor `face` on `e` and stamp all three boundary edges with
  /// the back-pointer.
  fn reshape(&mut self, face: FaceId, e: EdgeId) {
    self.tri_mut(face).anchor = e;
    self.edges.set_left_face(e, Some(face));
    let ln = self.edges.lnext(e);
    self.edges.set_left_face(ln, Some(face));
    let lp = self.edges.lprev(e);
    self.edges.set_left_face(lp, Some(face));
    debug_assert_eq!(self.edges.lnext(self.edges.lnext(ln)), e);
  }

  /// Move the anchor off `e` before `e` is deleted or rewired.
  fn dont_anchor(&mut self, face: FaceId, e: EdgeId) {
    if self.tri(face).anchor == e {
      self.tri_mut(face).anchor = self.edges.lnext(e);
    }
  }

  ///////////////////////////////////////////////////////////////////////////
  // Geometry helpers

  fn right_of(&self, p: [f64; 2], e: EdgeId) -> bool {
    is_ccw(p, self.edges.dest(e), self.edges.orig(e))
  }

  fn left_of(&self, p: [f64; 2], e: EdgeId) -> bool {
    is_ccw(p, self.edges.orig(e), self.edges.dest(e))
  }

  /// Hull edge whose removal keeps the boundary counter-clockwise.
  fn ccw_boundary(&self, e: EdgeId) -> bool {
    let p = self.edges.dest(self.edges.oprev(e));
    !self.right_of(p, e)
  }

  fn is_interior(&self, e: EdgeId) -> bool {
    let l3 = self.edges.lnext(self.edges.lnext(self.edges.lnext(e)));
    let r3 = self.edges.rnext(self.edges.rnext(self.edges.rnext(e)));
    l3 == e && r3 == e
  }

  /// Is `x` on the interior of segment `e`, within tolerance?
  fn on_edge(&self, x: [f64; 2], e: EdgeId) -> bool {
    let orig = self.edges.orig(e);
    let dest = self.edges.dest(e);

    let t1 = dist(x, orig);
    let t2 = dist(x, dest);
    if t1 < EPS || t2 < EPS {
      return true;
    }
    let t3 = dist(orig, dest);
    if t1 > t3 || t2 > t3 {
      return false;
    }
    Line::new(orig, dest).eval(x).abs() < EPS
  }

  fn should_swap(&self, x: [f64; 2], e: EdgeId) -> bool {
    let t = self.edges.oprev(e);
    in_circumcircle(
      self.edges.orig(e),
      self.edges.dest(t),
      self.edges.dest(e),
      x,
    )
  }

  ///////////////////////////////////////////////////////////////////////////
  // Mutation

  /// Flip `e` and re-anchor the two incident faces onto it.
  fn swap(&mut self, e: EdgeId) {
    let f1 = self.edges.left_face(e).unwrap();
    let f2 = self.edges.left_face(e.sym()).unwrap();

    self.edges.swap_triangles(e);

    self.reshape(f1, e);
    self.reshape(f2, e.sym());
  }

  /// Fan `x` into its containing face (or into both faces adjacent to
  /// the edge it lies on) and return the first spoke, whose origin is
  /// the fan's hub on the old boundary and whose destination is `x`.
  fn spoke(&mut self, x: [f64; 2], e: EdgeId) -> EdgeId {
    let mut e = e;
    let mut reusable: Vec<FaceId> = Vec::with_capacity(4);
    let mut boundary_edge: Option<EdgeId> = None;

    let lface = self.edges.left_face(e).unwrap();
    self.dont_anchor(lface, e);
    reusable.push(lface);

    if self.on_edge(x, e) {
      if self.ccw_boundary(e) {
        // Hull edge: keep it during spoking, delete afterwards.
        boundary_edge = Some(e);
      } else {
        let sym_face = self.edges.left_face(e.sym()).unwrap();
        reusable.push(sym_face);
        self.dont_anchor(sym_face, e.sym());

        e = self.edges.oprev(e);
        let dead = self.edges.onext(e);
        self.edges.delete(dead);
      }
    }

    let first = self.edges.make_edge();
    let orig = self.edges.orig(e);
    self.edges.set_endpoints(first, orig, x);
    self.edges.splice(first, e);

    self.starting_edge = first;
    let mut base = first;
    loop {
      base = self.edges.connect(e, base.sym());
      e = self.edges.oprev(base);
      if self.edges.lnext(e) == self.starting_edge {
        break;
      }
    }

    if let Some(b) = boundary_edge {
      self.edges.delete(b);
    }

    let mut base = if boundary_edge.is_some() {
      self.edges.rprev(self.starting_edge)
    } else {
      self.starting_edge.sym()
    };
    loop {
      match reusable.pop() {
        Some(face) => self.reshape(face, base),
        None => {
          self.make_face(base);
        }
      }
      base = self.edges.onext(base);
      if base == self.starting_edge.sym() {
        break;
      }
    }

    self.starting_edge
  }

  /// Restore the empty-circumcircle property around `x` by flipping
  /// offending edges, then report every face incident to `x`.
  fn optimize<S: TriangleScanner>(&mut self, x: [f64; 2], start_spoke: EdgeId, scanner: &mut S) {
    let mut spoke = start_spoke;
    loop {
      let e = self.edges.lnext(spoke);
      if self.is_interior(e) && self.should_swap(x, e) {
        self.swap(e);
      } else {
        spoke = self.edges.onext(spoke);
        if spoke == start_spoke {
          break;
        }
      }
    }

    let mut spoke = start_spoke;
    let mut touched: Vec<FaceId> = Vec::new();
    loop {
      let e = self.edges.lnext(spoke);
      if let Some(face) = self.edges.left_face(e) {
        touched.push(face);
      }
      spoke = self.edges.onext(spoke);
      if spoke == start_spoke {
        break;
      }
    }
    for face in touched {
      scanner.scan_triangle(self, face);
    }
  }
}

pub struct Faces<'a> {
  mesh: &'a DelaunayMesh,
  cur: Option<FaceId>,
}

impl Iterator for Faces<'_> {
  type Item = FaceId;
  fn next(&mut self) -> Option<FaceId> {
    let face = self.cur?;
    self.cur = self.mesh.tri(face).next;
    Some(face)
  }
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
  let dx = a[0] - b[0];
  let dy = a[1] - b[1];
  (dx * dx + dy * dy).sqrt()
}
