//! # syncforge-mapper
//!
//! Status/entity-type/priority mapper (C1): translates a
//! [`syncforge_types::StatusUpdate`] between each pair of the four systems.
//! See spec.md §4.1.

mod error;
mod mapper;
mod tables;

pub use error::{MapperError, Result};
pub use mapper::{MapperConfig, MappingMode, StatusMapper};
pub use tables::MappingKind;
