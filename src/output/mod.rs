//! Result reporting: console text and JSON files

pub mod json;
pub mod text;
