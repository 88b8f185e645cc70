//! Report row types and the collected result of one analysis run.

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use tabled::Tabled;

/// Timestamp layout for snapshot and instance report columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    /// EBS volumes not attached to any instance
    Volumes,
    /// Elastic IPs without instance, interface or association
    ElasticIps,
    /// Snapshots older than the cutoff and not backing an in-use AMI
    Snapshots,
    /// Self-owned AMIs older than the cutoff and not used by running instances
    Images,
    /// Classic load balancers without registered instances
    ClassicLoadBalancers,
    /// ALB/NLB/GWLB whose target groups have no targets
    LoadBalancers,
    /// Running instances
    Instances,
    /// Running instance count per instance type
    InstanceTypes,
}

impl ReportKind {
    /// Orphan reports run when no `--report` is given.
    pub const ORPHANS: [ReportKind; 6] = [
        ReportKind::Volumes,
        ReportKind::ElasticIps,
        ReportKind::Snapshots,
        ReportKind::Images,
        ReportKind::ClassicLoadBalancers,
        ReportKind::LoadBalancers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Volumes => "volumes",
            ReportKind::ElasticIps => "elastic-ips",
            ReportKind::Snapshots => "snapshots",
            ReportKind::Images => "images",
            ReportKind::ClassicLoadBalancers => "classic-load-balancers",
            ReportKind::LoadBalancers => "load-balancers",
            ReportKind::Instances => "instances",
            ReportKind::InstanceTypes => "instance-types",
        }
    }

    /// Human readable title for table output.
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Volumes => "Unattached EBS volumes",
            ReportKind::ElasticIps => "Unused Elastic IPs",
            ReportKind::Snapshots => "Stale EBS snapshots",
            ReportKind::Images => "Stale AMIs",
            ReportKind::ClassicLoadBalancers => "Unused classic load balancers",
            ReportKind::LoadBalancers => "Unused load balancers (v2)",
            ReportKind::Instances => "Running instances",
            ReportKind::InstanceTypes => "Running instances by type",
        }
    }

    /// Table name for SQL output and key for JSON output.
    pub fn table_name(&self) -> &'static str {
        match self {
            ReportKind::Volumes => "unattached_volumes",
            ReportKind::ElasticIps => "unused_elastic_ips",
            ReportKind::Snapshots => "stale_snapshots",
            ReportKind::Images => "stale_images",
            ReportKind::ClassicLoadBalancers => "unused_classic_load_balancers",
            ReportKind::LoadBalancers => "unused_load_balancers",
            ReportKind::Instances => "running_instances",
            ReportKind::InstanceTypes => "instance_type_counts",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single output cell, typed so SQL can leave numbers unquoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(i64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Flat report row, renderable as table, CSV, JSON or SQL.
pub trait Record: Tabled + Serialize {
    /// Column names, in the same order as [`Record::cells`].
    const COLUMNS: &'static [&'static str];

    fn cells(&self) -> Vec<Cell>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct UnattachedVolume {
    #[tabled(rename = "VOLUME ID")]
    pub volume_id: String,
    #[tabled(rename = "SIZE (GiB)")]
    pub size_gib: i64,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "DESCRIPTION")]
    pub description: String,
}

impl Record for UnattachedVolume {
    const COLUMNS: &'static [&'static str] = &["volume_id", "size_gib", "name", "description"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.volume_id.clone()),
            Cell::Number(self.size_gib),
            Cell::Text(self.name.clone()),
            Cell::Text(self.description.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct UnusedElasticIp {
    #[tabled(rename = "PUBLIC IP")]
    pub public_ip: String,
    #[tabled(rename = "ALLOCATION ID")]
    pub allocation_id: String,
}

impl Record for UnusedElasticIp {
    const COLUMNS: &'static [&'static str] = &["public_ip", "allocation_id"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.public_ip.clone()),
            Cell::Text(self.allocation_id.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StaleSnapshot {
    #[tabled(rename = "SNAPSHOT ID")]
    pub snapshot_id: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "START TIME")]
    pub start_time: String,
    #[tabled(rename = "SIZE (GiB)")]
    pub volume_size_gib: i64,
}

impl Record for StaleSnapshot {
    const COLUMNS: &'static [&'static str] =
        &["snapshot_id", "name", "start_time", "volume_size_gib"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.snapshot_id.clone()),
            Cell::Text(self.name.clone()),
            Cell::Text(self.start_time.clone()),
            Cell::Number(self.volume_size_gib),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StaleImage {
    #[tabled(rename = "IMAGE ID")]
    pub image_id: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "CREATION DATE")]
    pub creation_date: String,
}

impl Record for StaleImage {
    const COLUMNS: &'static [&'static str] = &["image_id", "name", "creation_date"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.image_id.clone()),
            Cell::Text(self.name.clone()),
            Cell::Text(self.creation_date.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct UnusedClassicLoadBalancer {
    #[tabled(rename = "LOAD BALANCER")]
    pub load_balancer_name: String,
}

impl Record for UnusedClassicLoadBalancer {
    const COLUMNS: &'static [&'static str] = &["load_balancer_name"];

    fn cells(&self) -> Vec<Cell> {
        vec![Cell::Text(self.load_balancer_name.clone())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct UnusedLoadBalancerV2 {
    #[tabled(rename = "LOAD BALANCER")]
    pub load_balancer_name: String,
    #[tabled(rename = "TYPE")]
    pub load_balancer_type: String,
    #[tabled(rename = "TARGET GROUPS")]
    pub target_groups: i64,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "DESCRIPTION")]
    pub description: String,
}

impl Record for UnusedLoadBalancerV2 {
    const COLUMNS: &'static [&'static str] = &[
        "load_balancer_name",
        "load_balancer_type",
        "target_groups",
        "name",
        "description",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.load_balancer_name.clone()),
            Cell::Text(self.load_balancer_type.clone()),
            Cell::Number(self.target_groups),
            Cell::Text(self.name.clone()),
            Cell::Text(self.description.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct RunningInstance {
    #[tabled(rename = "INSTANCE ID")]
    pub instance_id: String,
    #[tabled(rename = "STATE")]
    pub state: String,
    #[tabled(rename = "TYPE")]
    pub instance_type: String,
    #[tabled(rename = "IMAGE ID")]
    pub image_id: String,
    #[tabled(rename = "LAUNCH TIME")]
    pub launch_time: String,
}

impl Record for RunningInstance {
    const COLUMNS: &'static [&'static str] = &[
        "instance_id",
        "state",
        "instance_type",
        "image_id",
        "launch_time",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.instance_id.clone()),
            Cell::Text(self.state.clone()),
            Cell::Text(self.instance_type.clone()),
            Cell::Text(self.image_id.clone()),
            Cell::Text(self.launch_time.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct InstanceTypeCount {
    #[tabled(rename = "TYPE")]
    pub instance_type: String,
    #[tabled(rename = "COUNT")]
    pub count: i64,
}

impl Record for InstanceTypeCount {
    const COLUMNS: &'static [&'static str] = &["instance_type", "count"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.instance_type.clone()),
            Cell::Number(self.count),
        ]
    }
}

/// Result of one run. `None` means the report was not run; `Some(vec![])`
/// means it ran and found nothing.
#[derive(Debug, Default, Serialize)]
pub struct Reports {
    #[serde(rename = "unattached_volumes", skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<UnattachedVolume>>,
    #[serde(rename = "unused_elastic_ips", skip_serializing_if = "Option::is_none")]
    pub elastic_ips: Option<Vec<UnusedElasticIp>>,
    #[serde(rename = "stale_snapshots", skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Vec<StaleSnapshot>>,
    #[serde(rename = "stale_images", skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<StaleImage>>,
    #[serde(
        rename = "unused_classic_load_balancers",
        skip_serializing_if = "Option::is_none"
    )]
    pub classic_load_balancers: Option<Vec<UnusedClassicLoadBalancer>>,
    #[serde(
        rename = "unused_load_balancers",
        skip_serializing_if = "Option::is_none"
    )]
    pub load_balancers: Option<Vec<UnusedLoadBalancerV2>>,
    #[serde(rename = "running_instances", skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<RunningInstance>>,
    #[serde(
        rename = "instance_type_counts",
        skip_serializing_if = "Option::is_none"
    )]
    pub instance_types: Option<Vec<InstanceTypeCount>>,
}

impl Reports {
    /// Number of rows for a report, `None` if it was not run.
    pub fn row_count(&self, kind: ReportKind) -> Option<usize> {
        match kind {
            ReportKind::Volumes => self.volumes.as_ref().map(Vec::len),
            ReportKind::ElasticIps => self.elastic_ips.as_ref().map(Vec::len),
            ReportKind::Snapshots => self.snapshots.as_ref().map(Vec::len),
            ReportKind::Images => self.images.as_ref().map(Vec::len),
            ReportKind::ClassicLoadBalancers => self.classic_load_balancers.as_ref().map(Vec::len),
            ReportKind::LoadBalancers => self.load_balancers.as_ref().map(Vec::len),
            ReportKind::Instances => self.instances.as_ref().map(Vec::len),
            ReportKind::InstanceTypes => self.instance_types.as_ref().map(Vec::len),
        }
    }
}
