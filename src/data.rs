pub mod line;
pub mod mesh;
pub mod raster;

pub use line::{Line, Plane};
pub use mesh::{Face, Mesh, Normal, Vertex};
pub use raster::{is_no_data, Raster};
