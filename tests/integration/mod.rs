//! Integration tests for the manifest pipeline

mod batch;
mod config_integration;
mod export_pipeline;
mod migration_files;
mod scenarios;
mod test_utils;
