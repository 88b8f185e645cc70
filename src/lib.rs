//! Cross-references EC2, EBS and Elastic Load Balancing inventory in one
//! region to find resources that are unattached, unused or stale.
//!
//! Every call against the account is a read. Results are a point-in-time
//! view: resources created, attached or deleted while a run is in progress
//! may be misclassified.

pub mod analysis;
pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod model;
pub mod output;
pub mod references;
pub mod report;
pub mod staleness;
pub mod tags;

#[cfg(test)]
mod testing;
