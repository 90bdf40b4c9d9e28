mod zemlya {
  use demtin::testing::synthetic_dem;
  use demtin::{generate_tin_mesh, is_no_data, Raster, ZemlyaMesh};

  /// 5x5 symmetric hill, cell size 1, anchored at the origin.
  fn hill_raster() -> Raster<f64> {
    let values = [
      [0.0, 0.0, 0.0, 0.0, 0.0],
      [0.0, 1.0, 1.0, 1.0, 0.0],
      [0.0, 1.0, 2.0, 1.0, 0.0],
      [0.0, 1.0, 1.0, 1.0, 0.0],
      [0.0, 0.0, 0.0, 0.0, 0.0],
    ];
    let flat: Vec<f64> = values.iter().flatten().copied().collect();
    let mut raster = Raster::from_data(5, 5, f64::NAN, flat).unwrap();
    raster.set_xy_pos(0.0, 0.0, 1.0);
    raster
  }

  #[test]
  fn symmetric_hill_keeps_key_points() {
    let mut zemlya = ZemlyaMesh::new(hill_raster());
    zemlya.greedy_insert(0.5);
    let mesh = zemlya.to_mesh();

    // Cell centres of the four corners and the summit.
    let key_points = [
      (0.5, 4.5),
      (4.5, 4.5),
      (4.5, 0.5),
      (0.5, 0.5),
      (2.5, 2.5),
    ];
    for (x, y) in key_points {
      assert!(
        mesh
          .vertices
          .iter()
          .any(|v| (v[0] - x).abs() < 1e-5 && (v[1] - y).abs() < 1e-5),
        "key point ({}, {}) missing from the mesh",
        x,
        y
      );
    }

    assert!(mesh.faces.len() >= 4);
    assert!(mesh.vertices.len() < 25, "no simplification happened");
    assert!(mesh.check_tin());

    // Wherever the refiner committed an elevation, it fits the input.
    let mut max_residual: f64 = 0.0;
    for row in 0..5 {
      for col in 0..5 {
        let z = zemlya.result().value(row, col);
        if !z.is_nan() {
          let residual = (zemlya.raster().value(row, col) - z).abs();
          max_residual = max_residual.max(residual);
        }
      }
    }
    assert!(max_residual <= 0.5, "residual {} exceeds bound", max_residual);
  }

  #[test]
  fn hill_bounds_match_cell_centres() {
    let mut zemlya = ZemlyaMesh::new(hill_raster());
    zemlya.greedy_insert(0.5);
    let mesh = zemlya.to_mesh();

    let mut westmost = f64::MAX;
    let mut eastmost = f64::MIN;
    for v in &mesh.vertices {
      westmost = westmost.min(v[0]);
      eastmost = eastmost.max(v[0]);
    }
    assert!((westmost - 0.5).abs() < 1e-5);
    assert!((eastmost - 4.5).abs() < 1e-5);
  }

  #[test]
  fn no_data_pixels_stay_out_of_the_result() {
    let mut raster = hill_raster();
    raster.set_value(0, 1, f64::NAN);

    let mut zemlya = ZemlyaMesh::new(raster);
    zemlya.greedy_insert(0.5);

    assert!(zemlya.result().value(0, 1).is_nan());
    // The summit is still reconstructed.
    assert!(!is_no_data(zemlya.result().value(2, 2), f64::NAN));
  }

  #[test]
  fn synthetic_dem_simplifies_and_validates() {
    let dem = synthetic_dem(64, 64, 10.0, 50.0);
    let mesh = generate_tin_mesh(dem, 0.5);

    assert!(!mesh.is_empty());
    assert!(mesh.vertices.len() < 64 * 64);
    assert!(mesh.check_tin());
    assert!(mesh.bbox[0][2] <= mesh.bbox[1][2]);
  }

  #[test]
  fn vertex_transform_is_applied() {
    let mut raster = hill_raster();
    raster.set_transform(Box::new(|v| [v[0] + 100.0, v[1] + 200.0, v[2] * 2.0]));

    let mesh = generate_tin_mesh(raster, 0.5);
    for v in &mesh.vertices {
      assert!(v[0] >= 100.0 && v[0] <= 105.0);
      assert!(v[1] >= 200.0 && v[1] <= 205.0);
    }
  }
}
