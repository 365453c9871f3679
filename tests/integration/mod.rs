//! Integration tests for the coursegen generation client

mod config_integration;
mod job_tracking;
mod test_utils;
