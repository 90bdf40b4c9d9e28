use super::{EdgeId, EdgePool};

impl EdgePool {
  /// The Guibas–Stolfi splice primitive.
  ///
  /// If the origins of `a` and `b` share an Onext ring it is split in
  /// two, otherwise the two rings are merged; the dual rings through
  /// `a.Onext.Rot` and `b.Onext.Rot` are spliced alongside. Splice is
  /// its own inverse.
  pub fn splice(&mut self, a: EdgeId, b: EdgeId) {
    let alpha = self.next[a.slot()].rot();
    let beta = self.next[b.slot()].rot();

    self.next.swap(a.slot(), b.slot());
    self.next.swap(alpha.slot(), beta.slot());
  }

  /// Add a new edge from `a.Dest` to `b.Orig` so that its left face is
  /// shared by the faces of `a` and `b`.
  pub fn connect(&mut self, a: EdgeId, b: EdgeId) -> EdgeId {
    let e = self.make_edge();
    self.set_orig(e, self.dest(a));
    self.set_dest(e, self.orig(b));
    let la = self.lnext(a);
    self.splice(e, la);
    self.splice(e.sym(), b);
    e
  }

  /// Rotate `e` inside the quadrilateral formed by its two incident
  /// faces: afterwards `e` connects the opposite pair of vertices.
  ///
  /// Face back-pointers are left untouched; callers re-anchor the two
  /// incident faces.
  pub fn swap_triangles(&mut self, e: EdgeId) {
    let a = self.oprev(e);
    let b = self.oprev(e.sym());

    self.splice(e, a);
    self.splice(e.sym(), b);
    let la = self.lnext(a);
    self.splice(e, la);
    let lb = self.lnext(b);
    self.splice(e.sym(), lb);

    self.set_orig(e, self.dest(a));
    self.set_dest(e, self.dest(b));
  }
}
