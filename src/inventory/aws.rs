//! AWS SDK implementation of [`Inventory`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::primitives::DateTime as SdkDateTime;
use aws_sdk_ec2::types::Filter;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::Inventory;
use crate::error::{InventoryError, Result};
use crate::model::{
    BlockDeviceMapping, ClassicLoadBalancer, ElasticIp, Image, Instance, LoadBalancerV2, Page,
    STATE_RUNNING, Snapshot, Tag, TargetGroup, TargetHealth, VOLUME_STATUS_AVAILABLE, Volume,
};

const OWNER_SELF: &str = "self";

/// Error codes EC2 returns when an image id no longer resolves.
const IMAGE_NOT_FOUND_CODES: &[&str] = &["InvalidAMIID.NotFound", "InvalidAMIID.Unavailable"];

/// Connection settings for the inventory client.
#[derive(Debug, Clone, Default)]
pub struct InventoryConfig {
    /// Explicit region; falls back to the SDK default chain when unset.
    pub region: Option<String>,
    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,
}

pub struct AwsInventory {
    ec2: aws_sdk_ec2::Client,
    elb: aws_sdk_elasticloadbalancing::Client,
    elbv2: aws_sdk_elasticloadbalancingv2::Client,
    region: String,
}

impl AwsInventory {
    /// Creates EC2, ELB and ELBv2 clients sharing one SDK configuration.
    ///
    /// Region resolution priority:
    /// 1. Explicit region from [`InventoryConfig`] (--region or AWS_REGION)
    /// 2. AWS SDK defaults (profile, ~/.aws/config, IMDS)
    pub async fn new(config: &InventoryConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            info!(region = %region, "Using explicit AWS region from configuration");
            loader = loader.region(aws_config::Region::new(region.clone()));
        } else {
            debug!("Using default AWS region from AWS SDK (environment/credentials file/IMDS)");
        }

        if let Some(profile) = &config.profile {
            debug!(profile = %profile, "Using AWS profile");
            loader = loader.profile_name(profile);
        }

        let sdk_config = loader.load().await;
        let region = sdk_config
            .region()
            .map(|r| r.as_ref())
            .unwrap_or("unknown")
            .to_string();

        info!(region = %region, "AWS inventory clients initialized");

        Self::from_clients(
            aws_sdk_ec2::Client::new(&sdk_config),
            aws_sdk_elasticloadbalancing::Client::new(&sdk_config),
            aws_sdk_elasticloadbalancingv2::Client::new(&sdk_config),
            region,
        )
    }

    /// Wrap already-configured service clients.
    pub fn from_clients(
        ec2: aws_sdk_ec2::Client,
        elb: aws_sdk_elasticloadbalancing::Client,
        elbv2: aws_sdk_elasticloadbalancingv2::Client,
        region: impl Into<String>,
    ) -> Self {
        Self {
            ec2,
            elb,
            elbv2,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl Inventory for AwsInventory {
    async fn running_instances_page(&self, next_token: Option<String>) -> Result<Page<Instance>> {
        let response = self
            .ec2
            .describe_instances()
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values(STATE_RUNNING)
                    .build(),
            )
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| InventoryError::aws("ec2:DescribeInstances", e))?;

        let items: Vec<Instance> = response
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .map(convert_instance)
            .collect();

        debug!(
            instances = items.len(),
            has_more = response.next_token().is_some(),
            "Fetched running instance page"
        );

        Ok(Page {
            items,
            next_token: response.next_token().map(str::to_string),
        })
    }

    async fn image(&self, image_id: &str) -> Result<Option<Image>> {
        let response = match self.ec2.describe_images().image_ids(image_id).send().await {
            Ok(response) => response,
            Err(e) if e.code().is_some_and(|c| IMAGE_NOT_FOUND_CODES.contains(&c)) => {
                debug!(image_id = %image_id, code = ?e.code(), "Image no longer exists");
                return Ok(None);
            }
            Err(e) => return Err(InventoryError::aws("ec2:DescribeImages", e)),
        };

        Ok(response.images().first().map(convert_image))
    }

    async fn owned_images(&self) -> Result<Vec<Image>> {
        let mut images = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .ec2
                .describe_images()
                .owners(OWNER_SELF)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| InventoryError::aws("ec2:DescribeImages", e))?;

            images.extend(response.images().iter().map(convert_image));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(images = images.len(), "Fetched owned AMIs");
        Ok(images)
    }

    async fn owned_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .ec2
                .describe_snapshots()
                .owner_ids(OWNER_SELF)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| InventoryError::aws("ec2:DescribeSnapshots", e))?;

            snapshots.extend(response.snapshots().iter().filter_map(|s| {
                let Some(snapshot_id) = s.snapshot_id() else {
                    warn!("Skipping snapshot without id");
                    return None;
                };
                Some(Snapshot {
                    snapshot_id: snapshot_id.to_string(),
                    start_time: s.start_time().and_then(to_chrono),
                    volume_size: s.volume_size(),
                    tags: convert_ec2_tags(s.tags()),
                })
            }));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(snapshots = snapshots.len(), "Fetched owned snapshots");
        Ok(snapshots)
    }

    async fn available_volumes(&self) -> Result<Vec<Volume>> {
        let mut volumes = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .ec2
                .describe_volumes()
                .filters(
                    Filter::builder()
                        .name("status")
                        .values(VOLUME_STATUS_AVAILABLE)
                        .build(),
                )
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| InventoryError::aws("ec2:DescribeVolumes", e))?;

            volumes.extend(response.volumes().iter().filter_map(|v| {
                Some(Volume {
                    volume_id: v.volume_id()?.to_string(),
                    size: v.size(),
                    status: v
                        .state()
                        .map(|s| s.as_str().to_string())
                        .unwrap_or_default(),
                    tags: convert_ec2_tags(v.tags()),
                })
            }));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(volumes = volumes.len(), "Fetched available volumes");
        Ok(volumes)
    }

    async fn elastic_ips(&self) -> Result<Vec<ElasticIp>> {
        let response = self
            .ec2
            .describe_addresses()
            .send()
            .await
            .map_err(|e| InventoryError::aws("ec2:DescribeAddresses", e))?;

        let addresses: Vec<ElasticIp> = response
            .addresses()
            .iter()
            .map(|a| ElasticIp {
                public_ip: a.public_ip().unwrap_or_default().to_string(),
                allocation_id: a.allocation_id().map(str::to_string),
                instance_id: non_empty(a.instance_id()),
                network_interface_id: non_empty(a.network_interface_id()),
                association_id: non_empty(a.association_id()),
            })
            .collect();

        debug!(addresses = addresses.len(), "Fetched Elastic IPs");
        Ok(addresses)
    }

    async fn classic_load_balancers(&self) -> Result<Vec<ClassicLoadBalancer>> {
        let mut load_balancers = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .elb
                .describe_load_balancers()
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| InventoryError::aws("elb:DescribeLoadBalancers", e))?;

            load_balancers.extend(response.load_balancer_descriptions().iter().map(|lb| {
                ClassicLoadBalancer {
                    name: lb.load_balancer_name().unwrap_or_default().to_string(),
                    instance_ids: lb
                        .instances()
                        .iter()
                        .filter_map(|i| i.instance_id().map(str::to_string))
                        .collect(),
                }
            }));

            match response.next_marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        debug!(
            load_balancers = load_balancers.len(),
            "Fetched classic load balancers"
        );
        Ok(load_balancers)
    }

    async fn load_balancers_v2(&self) -> Result<Vec<LoadBalancerV2>> {
        let mut load_balancers = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .elbv2
                .describe_load_balancers()
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| InventoryError::aws("elbv2:DescribeLoadBalancers", e))?;

            load_balancers.extend(response.load_balancers().iter().filter_map(|lb| {
                Some(LoadBalancerV2 {
                    arn: lb.load_balancer_arn()?.to_string(),
                    name: lb.load_balancer_name().unwrap_or_default().to_string(),
                    lb_type: lb
                        .r#type()
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_default(),
                })
            }));

            match response.next_marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        debug!(
            load_balancers = load_balancers.len(),
            "Fetched v2 load balancers"
        );
        Ok(load_balancers)
    }

    async fn target_groups(&self, load_balancer_arn: &str) -> Result<Vec<TargetGroup>> {
        let mut groups = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .elbv2
                .describe_target_groups()
                .load_balancer_arn(load_balancer_arn)
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| InventoryError::aws("elbv2:DescribeTargetGroups", e))?;

            groups.extend(response.target_groups().iter().filter_map(|tg| {
                Some(TargetGroup {
                    arn: tg.target_group_arn()?.to_string(),
                    name: tg.target_group_name().unwrap_or_default().to_string(),
                })
            }));

            match response.next_marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(groups)
    }

    async fn target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>> {
        let response = self
            .elbv2
            .describe_target_health()
            .target_group_arn(target_group_arn)
            .send()
            .await
            .map_err(|e| InventoryError::aws("elbv2:DescribeTargetHealth", e))?;

        Ok(response
            .target_health_descriptions()
            .iter()
            .map(|d| TargetHealth {
                target_id: d
                    .target()
                    .and_then(|t| optional_str(t.id()))
                    .unwrap_or_default()
                    .to_string(),
                state: d
                    .target_health()
                    .and_then(|h| h.state())
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn load_balancer_tags(&self, load_balancer_arn: &str) -> Result<Vec<Tag>> {
        let response = self
            .elbv2
            .describe_tags()
            .resource_arns(load_balancer_arn)
            .send()
            .await
            .map_err(|e| InventoryError::aws("elbv2:DescribeTags", e))?;

        Ok(response
            .tag_descriptions()
            .iter()
            .flat_map(|d| d.tags())
            .filter_map(|t| {
                Some(Tag::new(
                    optional_str(t.key())?,
                    t.value().unwrap_or_default(),
                ))
            })
            .collect())
    }
}

fn convert_instance(instance: &aws_sdk_ec2::types::Instance) -> Instance {
    Instance {
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string())
            .unwrap_or_default(),
        image_id: instance.image_id().map(str::to_string),
        instance_type: instance
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        launch_time: instance.launch_time().and_then(to_chrono),
    }
}

fn convert_image(image: &aws_sdk_ec2::types::Image) -> Image {
    let image_id = image.image_id().unwrap_or_default().to_string();
    let creation_date = image.creation_date().and_then(|raw| {
        let parsed = parse_creation_date(raw);
        if parsed.is_none() {
            warn!(image_id = %image_id, creation_date = %raw, "Unparseable AMI creation date");
        }
        parsed
    });

    Image {
        creation_date,
        owner_id: image.owner_id().map(str::to_string),
        block_device_mappings: image
            .block_device_mappings()
            .iter()
            .map(|m| BlockDeviceMapping {
                device_name: m.device_name().unwrap_or_default().to_string(),
                snapshot_id: m
                    .ebs()
                    .and_then(|ebs| ebs.snapshot_id())
                    .map(str::to_string),
            })
            .collect(),
        tags: convert_ec2_tags(image.tags()),
        image_id,
    }
}

fn convert_ec2_tags(tags: &[aws_sdk_ec2::types::Tag]) -> Vec<Tag> {
    tags.iter()
        .filter_map(|t| Some(Tag::new(t.key()?, t.value().unwrap_or_default())))
        .collect()
}

/// Parse an AMI creation date such as `2024-01-15T08:30:00.000Z`.
pub(crate) fn parse_creation_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn to_chrono(timestamp: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Accepts both optional and required SDK string members.
fn optional_str<'a>(value: impl Into<Option<&'a str>>) -> Option<&'a str> {
    value.into()
}
