//! Typed inventory records.
//!
//! Every record is an immutable snapshot of remote state, built at the
//! inventory boundary. Missing fields from the API are already normalized to
//! `None` or empty collections by the time the engine sees them.

use chrono::{DateTime, Utc};

pub const STATE_RUNNING: &str = "running";
pub const VOLUME_STATUS_AVAILABLE: &str = "available";

/// Key/value resource tag. Raw tag sequences may repeat a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub instance_id: String,
    pub state: String,
    pub image_id: Option<String>,
    pub instance_type: String,
    pub launch_time: Option<DateTime<Utc>>,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.state == STATE_RUNNING
    }
}

/// Block device mapping of an image. `snapshot_id` is only set for
/// EBS-backed mappings; instance-store mappings carry none.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDeviceMapping {
    pub device_name: String,
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub image_id: String,
    pub owner_id: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    pub tags: Vec<Tag>,
}

impl Image {
    /// Snapshot ids backing this image, in mapping order.
    pub fn backing_snapshot_ids(&self) -> impl Iterator<Item = &str> {
        self.block_device_mappings
            .iter()
            .filter_map(|m| m.snapshot_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub volume_size: Option<i32>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub volume_id: String,
    pub size: Option<i32>,
    pub status: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElasticIp {
    pub public_ip: String,
    pub allocation_id: Option<String>,
    pub instance_id: Option<String>,
    pub network_interface_id: Option<String>,
    pub association_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassicLoadBalancer {
    pub name: String,
    pub instance_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadBalancerV2 {
    pub arn: String,
    pub name: String,
    pub lb_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroup {
    pub arn: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetHealth {
    pub target_id: String,
    pub state: String,
}
