//! Read-only inventory client interface.
//!
//! Every method issues blocking-from-the-caller's-view read calls; the engine
//! awaits each one before starting the next. Listing methods other than
//! [`Inventory::running_instances_page`] return every page already drained.

pub mod aws;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    ClassicLoadBalancer, ElasticIp, Image, Instance, LoadBalancerV2, Page, Snapshot, Tag,
    TargetGroup, TargetHealth, Volume,
};

pub use aws::{AwsInventory, InventoryConfig};

#[async_trait]
pub trait Inventory: Send + Sync {
    /// One page of instances filtered to `instance-state-name = running`.
    async fn running_instances_page(&self, next_token: Option<String>) -> Result<Page<Instance>>;

    /// Detail record for a single image id. `None` when the image no longer
    /// exists (deregistered or shared access revoked).
    async fn image(&self, image_id: &str) -> Result<Option<Image>>;

    /// Images owned by the caller.
    async fn owned_images(&self) -> Result<Vec<Image>>;

    /// Snapshots owned by the caller.
    async fn owned_snapshots(&self) -> Result<Vec<Snapshot>>;

    /// Volumes filtered to `status = available`.
    async fn available_volumes(&self) -> Result<Vec<Volume>>;

    async fn elastic_ips(&self) -> Result<Vec<ElasticIp>>;

    async fn classic_load_balancers(&self) -> Result<Vec<ClassicLoadBalancer>>;

    async fn load_balancers_v2(&self) -> Result<Vec<LoadBalancerV2>>;

    async fn target_groups(&self, load_balancer_arn: &str) -> Result<Vec<TargetGroup>>;

    async fn target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>>;

    async fn load_balancer_tags(&self, load_balancer_arn: &str) -> Result<Vec<Tag>>;
}

/// Lazy cursor over the running-instance pages of one listing.
///
/// Each cursor restarts the listing from the first page; a cursor cannot be
/// rewound once consumed.
pub struct InstancePages<'a> {
    inventory: &'a dyn Inventory,
    next_token: Option<String>,
    exhausted: bool,
    pages_read: usize,
}

impl<'a> InstancePages<'a> {
    pub fn new(inventory: &'a dyn Inventory) -> Self {
        Self {
            inventory,
            next_token: None,
            exhausted: false,
            pages_read: 0,
        }
    }

    /// Fetch the next page, or `None` once the listing has no more pages.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Instance>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .inventory
            .running_instances_page(self.next_token.take())
            .await?;

        self.pages_read += 1;
        match page.next_token {
            Some(token) if !token.is_empty() => self.next_token = Some(token),
            _ => self.exhausted = true,
        }

        Ok(Some(page.items))
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn pages_read(&self) -> usize {
        self.pages_read
    }

    /// Drain every remaining page into one vector.
    pub async fn collect_all(mut self) -> Result<Vec<Instance>> {
        let mut instances = Vec::new();
        while let Some(page) = self.next_page().await? {
            instances.extend(page);
        }
        Ok(instances)
    }
}
