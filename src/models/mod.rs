pub mod classification;
pub mod data_uri;
pub mod gemini;
pub mod render;

pub use classification::*;
pub use data_uri::*;
pub use render::*;
