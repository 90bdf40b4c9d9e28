//! No-data repair: a spiral search for the nearest valid neighbourhood
//! average, used to backfill the four raster corners before the initial
//! bounding triangulation.

use crate::data::raster::{is_no_data, Raster};

pub const MAX_AVERAGING_SAMPLES: usize = 64;

/// Mean over the finite entries; NaN when none are finite.
fn average_valid(values: &[f64]) -> f64 {
  let mut sum = 0.0;
  let mut count = 0;
  for &v in values {
    if !v.is_nan() {
      sum += v;
      count += 1;
    }
  }
  if count == 0 {
    f64::NAN
  } else {
    sum / count as f64
  }
}

/// 3x3 weighted average around `(row, col)`: the centre weighs in three
/// times, the cross-neighbour average twice, the diagonal average once.
/// No-data and out-of-range pixels are ignored.
pub fn sub_sample_3x3(src: &Raster<f64>, row: i64, col: i64) -> f64 {
  let no_data = src.no_data();
  let pick = |r: i64, c: i64| {
    let z = src.value_or_nan(r, c);
    if is_no_data(z, no_data) {
      f64::NAN
    } else {
      z
    }
  };

  let center = pick(row, col);
  let cross = average_valid(&[
    pick(row - 1, col),
    pick(row, col - 1),
    pick(row, col + 1),
    pick(row + 1, col),
  ]);
  let diag = average_valid(&[
    pick(row - 1, col - 1),
    pick(row - 1, col + 1),
    pick(row + 1, col - 1),
    pick(row + 1, col + 1),
  ]);

  average_valid(&[center, center, center, cross, cross, diag])
}

/// Spiral outwards from `(row, col)` over Bresenham circles of growing
/// integer radius, collecting 3x3-weighted samples until `min_samples`
/// are found, and return their mean. NaN when the whole raster is
/// no-data.
pub fn sample_nearest_valid_avg(
  src: &Raster<f64>,
  row: usize,
  col: usize,
  min_samples: usize,
) -> f64 {
  let min_samples = min_samples.min(MAX_AVERAGING_SAMPLES);
  let w = src.cols() as i64;
  let h = src.rows() as i64;
  let no_data = src.no_data();

  let z = src.value_or_nan(row as i64, col as i64);
  if !is_no_data(z, no_data) {
    return z;
  }

  let max_radius = ((w * w + h * h) as f64).sqrt() as i64;
  let mut samples: Vec<f64> = Vec::new();

  let mut put_pixel = |samples: &mut Vec<f64>, x_off: i64, y_off: i64| {
    if samples.len() >= MAX_AVERAGING_SAMPLES {
      return;
    }
    let z = sub_sample_3x3(src, row as i64 + y_off, col as i64 + x_off);
    if !is_no_data(z, no_data) {
      samples.push(z);
    }
  };

  let mut radius: i64 = 2;
  while radius <= max_radius && samples.len() < min_samples {
    let mut x = radius - 1;
    let mut y: i64 = 0;
    let mut dx: i64 = 1;
    let mut dy: i64 = 1;
    let mut err = dx - radius / 2;

    while y <= x {
      put_pixel(&mut samples, x, y);
      put_pixel(&mut samples, y, x);
      put_pixel(&mut samples, -y, x);
      put_pixel(&mut samples, -x, y);
      put_pixel(&mut samples, -x, -y);
      put_pixel(&mut samples, -y, -x);
      put_pixel(&mut samples, y, -x);
      put_pixel(&mut samples, x, -y);

      if err <= 0 {
        y += 1;
        err += dy;
        dy += 2;
      } else {
        x -= 1;
        dx += 2;
        err += dx - radius / 2;
      }
    }
    radius += 1;
  }

  average_valid(&samples)
}

/// Overwrite `(row, col)` with the nearest valid average when it holds
/// no-data. Writes a literal zero when the spiral search finds nothing.
pub fn repair_point(raster: &mut Raster<f64>, row: usize, col: usize) {
  let no_data = raster.no_data();
  if !is_no_data(raster.value(row, col), no_data) {
    return;
  }

  let z = sample_nearest_valid_avg(raster, row, col, 3);
  if is_no_data(z, no_data) {
    raster.set_value(row, col, 0.0);
  } else {
    raster.set_value(row, col, z);
  }
}
