//! In-memory inventory and fixtures shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{InventoryError, Result};
use crate::inventory::Inventory;
use crate::model::{
    BlockDeviceMapping, ClassicLoadBalancer, ElasticIp, Image, Instance, LoadBalancerV2, Page,
    Snapshot, Tag, TargetGroup, TargetHealth, Volume,
};

/// Fixed "now" so age arithmetic in tests is deterministic.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn instance(id: &str, image_id: &str) -> Instance {
    Instance {
        instance_id: id.to_string(),
        state: "running".to_string(),
        image_id: Some(image_id.to_string()),
        instance_type: "t3.micro".to_string(),
        launch_time: Some(days_ago(3)),
    }
}

pub fn image(id: &str, created: DateTime<Utc>, snapshot_ids: &[&str]) -> Image {
    Image {
        image_id: id.to_string(),
        owner_id: Some("123456789012".to_string()),
        creation_date: Some(created),
        block_device_mappings: snapshot_ids
            .iter()
            .enumerate()
            .map(|(idx, snap)| BlockDeviceMapping {
                device_name: format!("/dev/sd{}", (b'a' + idx as u8) as char),
                snapshot_id: Some(snap.to_string()),
            })
            .collect(),
        tags: Vec::new(),
    }
}

pub fn snapshot(id: &str, started: DateTime<Utc>) -> Snapshot {
    Snapshot {
        snapshot_id: id.to_string(),
        start_time: Some(started),
        volume_size: Some(8),
        tags: Vec::new(),
    }
}

pub fn volume(id: &str, status: &str) -> Volume {
    Volume {
        volume_id: id.to_string(),
        size: Some(8),
        status: status.to_string(),
        tags: Vec::new(),
    }
}

pub fn target(id: &str) -> TargetHealth {
    TargetHealth {
        target_id: id.to_string(),
        state: "healthy".to_string(),
    }
}

pub fn target_group(name: &str) -> TargetGroup {
    TargetGroup {
        arn: format!("arn:aws:elasticloadbalancing:us-east-1:123456789012:targetgroup/{name}"),
        name: name.to_string(),
    }
}

pub fn load_balancer_v2(name: &str) -> LoadBalancerV2 {
    LoadBalancerV2 {
        arn: format!("arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/{name}"),
        name: name.to_string(),
        lb_type: "application".to_string(),
    }
}

/// Inventory backed by vectors, with per-operation call counting and
/// injectable failures.
#[derive(Default)]
pub struct FakeInventory {
    instance_pages: Vec<Vec<Instance>>,
    owned_images: Vec<Image>,
    foreign_images: Vec<Image>,
    snapshots: Vec<Snapshot>,
    volumes: Vec<Volume>,
    elastic_ips: Vec<ElasticIp>,
    classic_load_balancers: Vec<ClassicLoadBalancer>,
    load_balancers_v2: Vec<LoadBalancerV2>,
    target_groups: HashMap<String, Vec<TargetGroup>>,
    target_health: HashMap<String, Vec<TargetHealth>>,
    tags: HashMap<String, Vec<Tag>>,
    failing: HashSet<&'static str>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeInventory {
    pub fn with_instance_pages(mut self, pages: Vec<Vec<Instance>>) -> Self {
        self.instance_pages = pages;
        self
    }

    pub fn with_images(mut self, images: Vec<Image>) -> Self {
        self.owned_images = images;
        self
    }

    /// Images visible to detail lookups but not owned by the caller.
    pub fn with_foreign_images(mut self, images: Vec<Image>) -> Self {
        self.foreign_images = images;
        self
    }

    pub fn with_snapshots(mut self, snapshots: Vec<Snapshot>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_volumes(mut self, volumes: Vec<Volume>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_elastic_ips(mut self, addresses: Vec<ElasticIp>) -> Self {
        self.elastic_ips = addresses;
        self
    }

    pub fn with_classic_load_balancers(mut self, lbs: Vec<ClassicLoadBalancer>) -> Self {
        self.classic_load_balancers = lbs;
        self
    }

    pub fn with_load_balancer_v2(
        mut self,
        lb: LoadBalancerV2,
        groups: Vec<(TargetGroup, Vec<TargetHealth>)>,
        tags: Vec<Tag>,
    ) -> Self {
        let mut owned = Vec::new();
        for (group, health) in groups {
            self.target_health.insert(group.arn.clone(), health);
            owned.push(group);
        }
        self.target_groups.insert(lb.arn.clone(), owned);
        self.tags.insert(lb.arn.clone(), tags);
        self.load_balancers_v2.push(lb);
        self
    }

    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        if self.failing.contains(operation) {
            return Err(InventoryError::AwsSdk(
                operation.to_string(),
                "injected failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Inventory for FakeInventory {
    async fn running_instances_page(&self, next_token: Option<String>) -> Result<Page<Instance>> {
        self.record("ec2:DescribeInstances")?;

        let index = next_token
            .as_deref()
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);

        let items = self.instance_pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.instance_pages.len())
            .then(|| format!("page-{}", index + 1));

        Ok(Page { items, next_token })
    }

    async fn image(&self, image_id: &str) -> Result<Option<Image>> {
        self.record("ec2:DescribeImage")?;
        Ok(self
            .owned_images
            .iter()
            .chain(self.foreign_images.iter())
            .find(|i| i.image_id == image_id)
            .cloned())
    }

    async fn owned_images(&self) -> Result<Vec<Image>> {
        self.record("ec2:DescribeImages")?;
        Ok(self.owned_images.clone())
    }

    async fn owned_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.record("ec2:DescribeSnapshots")?;
        Ok(self.snapshots.clone())
    }

    async fn available_volumes(&self) -> Result<Vec<Volume>> {
        self.record("ec2:DescribeVolumes")?;
        Ok(self.volumes.clone())
    }

    async fn elastic_ips(&self) -> Result<Vec<ElasticIp>> {
        self.record("ec2:DescribeAddresses")?;
        Ok(self.elastic_ips.clone())
    }

    async fn classic_load_balancers(&self) -> Result<Vec<ClassicLoadBalancer>> {
        self.record("elb:DescribeLoadBalancers")?;
        Ok(self.classic_load_balancers.clone())
    }

    async fn load_balancers_v2(&self) -> Result<Vec<LoadBalancerV2>> {
        self.record("elbv2:DescribeLoadBalancers")?;
        Ok(self.load_balancers_v2.clone())
    }

    async fn target_groups(&self, load_balancer_arn: &str) -> Result<Vec<TargetGroup>> {
        self.record("elbv2:DescribeTargetGroups")?;
        Ok(self
            .target_groups
            .get(load_balancer_arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>> {
        self.record("elbv2:DescribeTargetHealth")?;
        Ok(self
            .target_health
            .get(target_group_arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_balancer_tags(&self, load_balancer_arn: &str) -> Result<Vec<Tag>> {
        self.record("elbv2:DescribeTags")?;
        Ok(self
            .tags
            .get(load_balancer_arn)
            .cloned()
            .unwrap_or_default())
    }
}
