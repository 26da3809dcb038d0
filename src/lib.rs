pub mod array;
pub mod colormap;
pub mod command;
pub mod config;
pub mod error;
pub mod fields;
pub mod figure;
pub mod gpu;
pub mod image;
pub mod kernel;
pub mod layout;
pub mod rescale;
pub mod scene;
pub mod shader;
pub mod texture;
pub mod viewer;

pub use error::{Error, Result};
