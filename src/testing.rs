//! Deterministic synthetic DEMs for tests and benchmarks.

use crate::data::raster::Raster;

fn hash(x: i64, y: i64) -> i64 {
  (x * 1619 + y * 31337) & 0x7fff_ffff
}

fn grad(h: i64) -> (f64, f64) {
  const GRADS: [f64; 16] = [
    1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0,
  ];
  let g = GRADS[(h & 7) as usize];
  (g, g)
}

/// Gradient noise in roughly `[-1, 1]`, deterministic in `(x, y)`.
pub fn noise_2d(x: f64, y: f64) -> f64 {
  let xi = x.floor() as i64;
  let yi = y.floor() as i64;
  let xf = x - xi as f64;
  let yf = y - yi as f64;

  let mut total = 0.0;
  for (cx, cy) in [(0i64, 0i64), (1, 0), (0, 1), (1, 1)] {
    let dx = xf - cx as f64;
    let dy = yf - cy as f64;
    let t = 0.5 - dx * dx - dy * dy;
    if t >= 0.0 {
      let (gx, gy) = grad(hash(xi + cx, yi + cy));
      let t2 = t * t;
      total += t2 * t2 * (gx * dx + gy * dy);
    }
  }
  40.0 * total
}

/// A fractal-noise terrain raster with cell size `spacing`, elevations
/// bounded by roughly `max_elev`.
pub fn synthetic_dem(rows: usize, cols: usize, spacing: f64, max_elev: f64) -> Raster<f64> {
  let mut data = Vec::with_capacity(rows * cols);
  for row in 0..rows {
    for col in 0..cols {
      let x = col as f64 * spacing;
      let y = row as f64 * spacing;
      let height = max_elev
        * (0.5 * noise_2d(x / 500.0, y / 500.0)
          + 0.3 * noise_2d(x / 100.0, y / 100.0)
          + 0.2 * noise_2d(x / 20.0, y / 20.0));
      data.push(height);
    }
  }
  let mut raster = Raster::from_data(rows, cols, f64::NAN, data).unwrap();
  raster.set_xy_pos(0.0, 0.0, spacing);
  raster
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn noise_is_deterministic_and_bounded() {
    for i in 0..50 {
      let x = i as f64 * 0.7;
      let y = i as f64 * 1.3;
      let n = noise_2d(x, y);
      assert_eq!(n, noise_2d(x, y));
      assert!(n.abs() <= 1.5);
    }
  }

  #[test]
  fn synthetic_dem_has_no_gaps() {
    let dem = synthetic_dem(33, 33, 10.0, 50.0);
    assert_eq!(dem.rows(), 33);
    assert_eq!(dem.cols(), 33);
    for row in 0..33 {
      for col in 0..33 {
        assert!(dem.value(row, col).is_finite());
      }
    }
  }
}
