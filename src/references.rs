//! Active-reference sets: images used by running instances and the snapshots
//! backing those images.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::inventory::{InstancePages, Inventory};
use crate::model::Instance;
use crate::tags::NOT_AVAILABLE;

/// Image and snapshot ids transitively required by running workloads.
///
/// Built once per run, strictly before any staleness check, and shared by the
/// snapshot and image reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveReferences {
    pub images: BTreeSet<String>,
    pub snapshots: BTreeSet<String>,
}

impl ActiveReferences {
    /// Build the active image set from a fresh instance listing and, when
    /// `with_snapshots` is set, the snapshot set behind it.
    pub async fn build(inventory: &dyn Inventory, with_snapshots: bool) -> Result<Self> {
        let images = active_images(InstancePages::new(inventory)).await?;
        Self::resolve(images, inventory, with_snapshots).await
    }

    /// Same as [`ActiveReferences::build`], for an instance listing the caller
    /// has already drained.
    pub async fn from_instances(
        instances: &[Instance],
        inventory: &dyn Inventory,
        with_snapshots: bool,
    ) -> Result<Self> {
        let mut images = BTreeSet::new();
        add_running_image_ids(instances, &mut images);
        Self::resolve(images, inventory, with_snapshots).await
    }

    async fn resolve(
        images: BTreeSet<String>,
        inventory: &dyn Inventory,
        with_snapshots: bool,
    ) -> Result<Self> {
        let snapshots = if with_snapshots {
            active_snapshots(&images, inventory).await?
        } else {
            BTreeSet::new()
        };

        info!(
            active_images = images.len(),
            active_snapshots = snapshots.len(),
            "Active reference sets built"
        );

        Ok(Self { images, snapshots })
    }
}

/// Collect the image ids of running instances.
///
/// Consumes every page of the cursor before returning; a failed page fetch
/// propagates instead of yielding a truncated set.
pub async fn active_images(mut pages: InstancePages<'_>) -> Result<BTreeSet<String>> {
    let mut images = BTreeSet::new();
    let mut instances_seen = 0;

    while let Some(page) = pages.next_page().await? {
        instances_seen += page.len();
        add_running_image_ids(&page, &mut images);
    }

    debug_assert!(pages.is_exhausted());
    debug!(
        pages = pages.pages_read(),
        instances = instances_seen,
        active_images = images.len(),
        "Finished walking running instances"
    );

    Ok(images)
}

fn add_running_image_ids(instances: &[Instance], images: &mut BTreeSet<String>) {
    for instance in instances {
        if !instance.is_running() {
            debug!(
                instance_id = %instance.instance_id,
                state = %instance.state,
                "Skipping non-running instance"
            );
            continue;
        }
        match &instance.image_id {
            Some(image_id) => {
                if images.insert(image_id.clone()) {
                    debug!(
                        instance_id = %instance.instance_id,
                        image_id = %image_id,
                        "Found active AMI"
                    );
                }
            }
            None => warn!(
                instance_id = %instance.instance_id,
                "Running instance has no image id"
            ),
        }
    }
}

/// Collect the snapshot ids backing the given images.
///
/// Issues one detail lookup per image id. Mappings without an EBS backing
/// store and images that no longer exist contribute nothing.
pub async fn active_snapshots(
    image_ids: &BTreeSet<String>,
    inventory: &dyn Inventory,
) -> Result<BTreeSet<String>> {
    let mut snapshots = BTreeSet::new();

    for image_id in image_ids {
        let Some(image) = inventory.image(image_id).await? else {
            warn!(image_id = %image_id, "Active AMI not found, no snapshots to protect");
            continue;
        };

        let before = snapshots.len();
        snapshots.extend(image.backing_snapshot_ids().map(str::to_string));
        debug!(
            image_id = %image_id,
            owner_id = image.owner_id.as_deref().unwrap_or(NOT_AVAILABLE),
            backing_snapshots = snapshots.len() - before,
            "Resolved active AMI"
        );
    }

    debug!(
        image_lookups = image_ids.len(),
        active_snapshots = snapshots.len(),
        "Resolved snapshots backing active AMIs"
    );

    Ok(snapshots)
}
