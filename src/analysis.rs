//! Analysis driver.
//!
//! Builds the active-reference sets once, then runs every selected report in
//! a fixed order, one inventory call at a time. The account can change between
//! the first and the last call of a run, so a resource may be misclassified
//! if it changes state mid-run; results are a best-effort point-in-time view.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, ReportFailure, Result};
use crate::inventory::{InstancePages, Inventory};
use crate::model::Instance;
use crate::references::ActiveReferences;
use crate::report::{
    InstanceTypeCount, ReportKind, Reports, RunningInstance, StaleImage, StaleSnapshot,
    TIMESTAMP_FORMAT, UnattachedVolume, UnusedClassicLoadBalancer, UnusedElasticIp,
    UnusedLoadBalancerV2,
};
use crate::staleness::{self, Cutoff};
use crate::tags::{self, NOT_AVAILABLE};

/// Outcome of one run: every report that ran, plus the ones whose listing
/// call failed.
#[derive(Debug, Default)]
pub struct Analysis {
    pub reports: Reports,
    pub failures: Vec<ReportFailure>,
}

impl Analysis {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Analyzer<'a> {
    inventory: &'a dyn Inventory,
    cutoff: Cutoff,
}

impl<'a> Analyzer<'a> {
    pub fn new(inventory: &'a dyn Inventory, cutoff: Cutoff) -> Self {
        Self { inventory, cutoff }
    }

    /// Run the selected reports.
    ///
    /// A failure to build the active-reference set aborts the run, since the
    /// snapshot and image reports would otherwise flag in-use resources. Any
    /// other listing failure is recorded and the remaining reports still run.
    pub async fn run(&self, selected: &BTreeSet<ReportKind>) -> Result<Analysis, AnalysisError> {
        let start = Instant::now();
        let report_names: Vec<&str> = selected.iter().map(ReportKind::as_str).collect();
        info!(
            reports = ?report_names,
            cutoff = %self.cutoff.threshold().to_rfc3339_opts(SecondsFormat::Secs, true),
            "Starting inventory analysis"
        );

        let needs_snapshots = selected.contains(&ReportKind::Snapshots);
        let needs_references = needs_snapshots || selected.contains(&ReportKind::Images);
        let needs_instances = selected.contains(&ReportKind::Instances)
            || selected.contains(&ReportKind::InstanceTypes);

        // One instance listing per run, shared by the references and the
        // instance reports.
        let instances = if needs_references || needs_instances {
            match InstancePages::new(self.inventory).collect_all().await {
                Ok(instances) => Ok(instances),
                Err(e) if needs_references => return Err(AnalysisError::ActiveReferences(e)),
                Err(e) => Err(e),
            }
        } else {
            Ok(Vec::new())
        };

        let references = match &instances {
            Ok(listing) if needs_references => {
                ActiveReferences::from_instances(listing, self.inventory, needs_snapshots)
                    .await
                    .map_err(AnalysisError::ActiveReferences)?
            }
            _ => ActiveReferences::default(),
        };

        let mut analysis = Analysis::default();

        for kind in selected {
            let outcome = match kind {
                ReportKind::Volumes => self
                    .unattached_volumes()
                    .await
                    .map(|rows| analysis.reports.volumes = Some(rows)),
                ReportKind::ElasticIps => self
                    .unused_elastic_ips()
                    .await
                    .map(|rows| analysis.reports.elastic_ips = Some(rows)),
                ReportKind::Snapshots => self
                    .stale_snapshots(&references.snapshots)
                    .await
                    .map(|rows| analysis.reports.snapshots = Some(rows)),
                ReportKind::Images => self
                    .stale_images(&references.images)
                    .await
                    .map(|rows| analysis.reports.images = Some(rows)),
                ReportKind::ClassicLoadBalancers => self
                    .unused_classic_load_balancers()
                    .await
                    .map(|rows| analysis.reports.classic_load_balancers = Some(rows)),
                ReportKind::LoadBalancers => self
                    .unused_load_balancers_v2()
                    .await
                    .map(|rows| analysis.reports.load_balancers = Some(rows)),
                ReportKind::Instances => instances
                    .as_deref()
                    .map_err(Clone::clone)
                    .map(|listing| {
                        analysis.reports.instances = Some(running_instances(listing))
                    }),
                ReportKind::InstanceTypes => instances
                    .as_deref()
                    .map_err(Clone::clone)
                    .map(|listing| {
                        analysis.reports.instance_types = Some(instance_type_counts(listing))
                    }),
            };

            match outcome {
                Ok(()) => info!(
                    report = %kind,
                    rows = analysis.reports.row_count(*kind).unwrap_or(0),
                    "Report completed"
                ),
                Err(source) => {
                    warn!(
                        report = %kind,
                        error = %source,
                        "Report failed, continuing with the rest"
                    );
                    analysis.failures.push(ReportFailure {
                        report: *kind,
                        source,
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            duration_ms = duration_ms,
            failed_reports = analysis.failures.len(),
            "Inventory analysis finished"
        );

        Ok(analysis)
    }

    pub async fn unattached_volumes(&self) -> Result<Vec<UnattachedVolume>> {
        let volumes = self.inventory.available_volumes().await?;

        Ok(volumes
            .iter()
            .filter(|v| staleness::is_unattached_volume(v))
            .map(|v| {
                let summary = tags::extract(&v.tags);
                UnattachedVolume {
                    volume_id: v.volume_id.clone(),
                    size_gib: v.size.map(i64::from).unwrap_or_default(),
                    name: summary.name,
                    description: summary.description,
                }
            })
            .collect())
    }

    pub async fn unused_elastic_ips(&self) -> Result<Vec<UnusedElasticIp>> {
        let addresses = self.inventory.elastic_ips().await?;

        Ok(addresses
            .iter()
            .filter(|a| staleness::is_unused_elastic_ip(a))
            .map(|a| UnusedElasticIp {
                public_ip: a.public_ip.clone(),
                allocation_id: or_not_available(a.allocation_id.as_deref()),
            })
            .collect())
    }

    pub async fn stale_snapshots(
        &self,
        active_snapshots: &BTreeSet<String>,
    ) -> Result<Vec<StaleSnapshot>> {
        let snapshots = self.inventory.owned_snapshots().await?;
        let total = snapshots.len();

        let stale: Vec<StaleSnapshot> = snapshots
            .iter()
            .filter(|s| staleness::is_stale_snapshot(s, &self.cutoff, active_snapshots))
            .map(|s| StaleSnapshot {
                snapshot_id: s.snapshot_id.clone(),
                name: tags::extract(&s.tags).name,
                start_time: format_timestamp(s.start_time),
                volume_size_gib: s.volume_size.map(i64::from).unwrap_or_default(),
            })
            .collect();

        debug!(total, stale = stale.len(), "Classified owned snapshots");
        Ok(stale)
    }

    pub async fn stale_images(&self, active_images: &BTreeSet<String>) -> Result<Vec<StaleImage>> {
        let images = self.inventory.owned_images().await?;
        let mut stale = Vec::new();

        for image in &images {
            if staleness::is_stale_image(image, &self.cutoff, active_images) {
                debug!(image_id = %image.image_id, "Listing old, unused AMI");
                stale.push(StaleImage {
                    image_id: image.image_id.clone(),
                    name: tags::extract(&image.tags).name,
                    creation_date: image
                        .creation_date
                        .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                });
            } else {
                debug!(
                    image_id = %image.image_id,
                    in_use = active_images.contains(&image.image_id),
                    "Skipping AMI"
                );
            }
        }

        Ok(stale)
    }

    pub async fn unused_classic_load_balancers(&self) -> Result<Vec<UnusedClassicLoadBalancer>> {
        let load_balancers = self.inventory.classic_load_balancers().await?;

        Ok(load_balancers
            .iter()
            .filter(|lb| staleness::is_unused_classic_load_balancer(lb))
            .map(|lb| UnusedClassicLoadBalancer {
                load_balancer_name: lb.name.clone(),
            })
            .collect())
    }

    /// One target-group listing per load balancer, then one target-health
    /// call per target group. Call count grows with the number of target
    /// groups in the account.
    pub async fn unused_load_balancers_v2(&self) -> Result<Vec<UnusedLoadBalancerV2>> {
        let load_balancers = self.inventory.load_balancers_v2().await?;
        let mut unused = Vec::new();
        let mut health_calls = 0;

        for lb in &load_balancers {
            let target_groups = self.inventory.target_groups(&lb.arn).await?;

            let mut health_per_group = Vec::with_capacity(target_groups.len());
            for group in &target_groups {
                health_per_group.push(self.inventory.target_health(&group.arn).await?);
                health_calls += 1;
            }

            if !staleness::is_unused_load_balancer_v2(&health_per_group) {
                continue;
            }

            let summary = tags::extract(&self.inventory.load_balancer_tags(&lb.arn).await?);
            unused.push(UnusedLoadBalancerV2 {
                load_balancer_name: lb.name.clone(),
                load_balancer_type: lb.lb_type.clone(),
                target_groups: target_groups.len() as i64,
                name: summary.name,
                description: summary.description,
            });
        }

        debug!(
            load_balancers = load_balancers.len(),
            target_health_calls = health_calls,
            unused = unused.len(),
            "Checked v2 load balancer targets"
        );

        Ok(unused)
    }
}

/// Rows for the running instances of a listing, in listing order.
pub fn running_instances(instances: &[Instance]) -> Vec<RunningInstance> {
    instances
        .iter()
        .filter(|i| i.is_running())
        .map(|i| RunningInstance {
            instance_id: i.instance_id.clone(),
            state: i.state.clone(),
            instance_type: i.instance_type.clone(),
            image_id: or_not_available(i.image_id.as_deref()),
            launch_time: format_timestamp(i.launch_time),
        })
        .collect()
}

/// Running instance count per type, in order of first appearance.
pub fn instance_type_counts(instances: &[Instance]) -> Vec<InstanceTypeCount> {
    let mut counts: Vec<InstanceTypeCount> = Vec::new();

    for instance in instances.iter().filter(|i| i.is_running()) {
        match counts
            .iter_mut()
            .find(|c| c.instance_type == instance.instance_type)
        {
            Some(entry) => entry.count += 1,
            None => counts.push(InstanceTypeCount {
                instance_type: instance.instance_type.clone(),
                count: 1,
            }),
        }
    }

    counts
}

fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn or_not_available(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}
