pub mod app;
pub mod config;
pub mod design;
pub mod error;
pub mod fs_util;
pub mod model;
pub mod output;
