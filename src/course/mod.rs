//! Course structure and lesson navigation

pub mod model;
pub mod navigator;

pub use model::{Catalog, Lesson, Module, parse_ordinal};
pub use navigator::{LessonNavigator, LessonPosition, Rollup};
