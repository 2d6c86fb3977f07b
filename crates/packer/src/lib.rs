pub mod atlas;
pub mod buffer;
pub mod builder;
pub mod data_pack;
pub mod extrusion;
pub mod format;
pub mod line;
pub mod normals;
pub mod pack;
pub mod point;

pub use atlas::*;
pub use buffer::*;
pub use builder::*;
pub use data_pack::*;
pub use extrusion::*;
pub use format::*;
pub use line::*;
pub use normals::*;
pub use pack::*;
pub use point::*;
