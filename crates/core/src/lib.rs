#![deny(warnings)]

pub mod config;
pub mod registry;
pub mod split;
pub mod translate;
