pub mod consts;
pub mod error;
pub mod raster;
pub mod io;
pub mod filters;
pub mod edges;
pub mod lines;
pub mod scoring;
pub mod decision;
pub mod verify;
pub mod report;
pub mod pipeline;
