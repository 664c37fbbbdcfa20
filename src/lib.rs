#![recursion_limit = "256"]

// Layers, outermost first. See each module's header.
pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
