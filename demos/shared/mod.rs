//! Helpers shared by the demos

#![allow(dead_code)]

pub mod tracing;
