//! Properties that hold for every generated manifest

mod export_determinism;
mod migration;
mod strategies;
mod validation;
