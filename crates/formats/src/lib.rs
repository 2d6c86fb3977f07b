pub mod feature;
pub mod geojson;
pub mod normalize;

pub use feature::*;
pub use geojson::*;
pub use normalize::*;
