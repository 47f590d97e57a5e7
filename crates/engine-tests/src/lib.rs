#![allow(dead_code)]

pub mod connectors;
pub mod resume;
