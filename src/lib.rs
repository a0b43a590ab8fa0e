pub mod app;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod extract;
pub mod gbif;
pub mod images;
pub mod output;
pub mod probe;
pub mod table;
