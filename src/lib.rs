pub mod area;
pub mod compress;
pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod project;
pub mod reader;
pub mod writer;

pub use config::MapParams;
pub use data::{Area, DataSet, Diagnostics, Node, Relation, Ring, Way};
pub use error::MapError;
