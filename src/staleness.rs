//! Orphan and staleness predicates.
//!
//! All predicates are pure functions of already-fetched records. Age checks go
//! through a [`Cutoff`] captured once per run so every resource is compared
//! against the same instant.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::model::{
    ClassicLoadBalancer, ElasticIp, Image, Snapshot, TargetHealth, VOLUME_STATUS_AVAILABLE, Volume,
};

pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Upper bound accepted for `--max-age-days` (about a century).
pub const MAX_AGE_DAYS_LIMIT: i64 = 36_500;

/// Age threshold for snapshots and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff {
    now: DateTime<Utc>,
    max_age: Duration,
}

impl Cutoff {
    pub fn new(now: DateTime<Utc>, max_age: Duration) -> Self {
        Self { now, max_age }
    }

    /// Out-of-range day counts saturate to the largest representable age.
    pub fn days(now: DateTime<Utc>, days: i64) -> Self {
        Self::new(now, Duration::try_days(days).unwrap_or(Duration::MAX))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Saturates at the earliest representable instant, so nothing is old.
    pub fn threshold(&self) -> DateTime<Utc> {
        self.now
            .checked_sub_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Strictly older than the threshold. A timestamp exactly on the
    /// threshold is not old.
    pub fn is_older(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp < self.threshold()
    }
}

/// `available` is the control plane's own "not attached to any instance".
pub fn is_unattached_volume(volume: &Volume) -> bool {
    volume.status == VOLUME_STATUS_AVAILABLE
}

/// Unused only when no instance, network interface or association is present.
pub fn is_unused_elastic_ip(address: &ElasticIp) -> bool {
    address.instance_id.is_none()
        && address.network_interface_id.is_none()
        && address.association_id.is_none()
}

/// Old enough and not backing any active image. A snapshot without a start
/// time is never stale.
pub fn is_stale_snapshot(
    snapshot: &Snapshot,
    cutoff: &Cutoff,
    active_snapshots: &BTreeSet<String>,
) -> bool {
    snapshot
        .start_time
        .is_some_and(|started| cutoff.is_older(started))
        && !active_snapshots.contains(&snapshot.snapshot_id)
}

/// Old enough and not used by any running instance. An image without a
/// parseable creation date is never stale.
pub fn is_stale_image(image: &Image, cutoff: &Cutoff, active_images: &BTreeSet<String>) -> bool {
    image
        .creation_date
        .is_some_and(|created| cutoff.is_older(created))
        && !active_images.contains(&image.image_id)
}

pub fn is_unused_classic_load_balancer(load_balancer: &ClassicLoadBalancer) -> bool {
    load_balancer.instance_ids.is_empty()
}

/// Unused when the union of target health records across all of the load
/// balancer's target groups is empty. No target groups at all also counts.
pub fn is_unused_load_balancer_v2(target_health_per_group: &[Vec<TargetHealth>]) -> bool {
    target_health_per_group.iter().all(Vec::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{days_ago, image, now, snapshot, target, volume};

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn cutoff() -> Cutoff {
        Cutoff::days(now(), DEFAULT_MAX_AGE_DAYS)
    }

    #[test]
    fn test_cutoff_threshold() {
        assert_eq!(cutoff().threshold(), days_ago(30));
        assert!(cutoff().is_older(days_ago(31)));
        assert!(!cutoff().is_older(days_ago(29)));
    }

    #[test]
    fn test_cutoff_boundary_is_not_older() {
        assert!(!cutoff().is_older(days_ago(30)));
        assert!(cutoff().is_older(days_ago(30) - Duration::seconds(1)));
    }

    #[test]
    fn test_huge_max_age_saturates_instead_of_overflowing() {
        let cutoff = Cutoff::days(now(), 100_000_000);
        assert_eq!(cutoff.threshold(), DateTime::<Utc>::MIN_UTC);
        assert!(!cutoff.is_older(days_ago(365 * 200)));

        let cutoff = Cutoff::days(now(), i64::MAX);
        assert_eq!(cutoff.threshold(), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_limit_is_representable() {
        let cutoff = Cutoff::days(now(), MAX_AGE_DAYS_LIMIT);
        assert!(cutoff.threshold() < now());
        assert!(cutoff.is_older(cutoff.threshold() - Duration::seconds(1)));
    }

    mod volume_tests {
        use super::*;

        #[test]
        fn test_available_volume_is_unattached() {
            assert!(is_unattached_volume(&volume("vol-1", "available")));
        }

        #[test]
        fn test_in_use_volume_is_attached() {
            assert!(!is_unattached_volume(&volume("vol-1", "in-use")));
        }

        #[test]
        fn test_other_states_are_not_reported() {
            for status in ["creating", "deleting", "deleted", "error", "Available"] {
                assert!(
                    !is_unattached_volume(&volume("vol-1", status)),
                    "status '{}' should not count as unattached",
                    status
                );
            }
        }
    }

    mod elastic_ip_tests {
        use super::*;

        fn address() -> ElasticIp {
            ElasticIp {
                public_ip: "203.0.113.10".to_string(),
                allocation_id: Some("eipalloc-1".to_string()),
                ..Default::default()
            }
        }

        #[test]
        fn test_no_attachment_is_unused() {
            assert!(is_unused_elastic_ip(&address()));
        }

        #[test]
        fn test_interface_only_is_in_use() {
            let eip = ElasticIp {
                network_interface_id: Some("eni-1".to_string()),
                ..address()
            };
            assert!(!is_unused_elastic_ip(&eip));
        }

        #[test]
        fn test_any_single_field_marks_in_use() {
            let with_instance = ElasticIp {
                instance_id: Some("i-1".to_string()),
                ..address()
            };
            let with_association = ElasticIp {
                association_id: Some("eipassoc-1".to_string()),
                ..address()
            };
            assert!(!is_unused_elastic_ip(&with_instance));
            assert!(!is_unused_elastic_ip(&with_association));
        }
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_old_unreferenced_snapshot_is_stale() {
            assert!(is_stale_snapshot(
                &snapshot("snap-2", days_ago(45)),
                &cutoff(),
                &set(&["snap-1"])
            ));
        }

        #[test]
        fn test_old_referenced_snapshot_is_kept() {
            assert!(!is_stale_snapshot(
                &snapshot("snap-1", days_ago(45)),
                &cutoff(),
                &set(&["snap-1"])
            ));
        }

        #[test]
        fn test_young_unreferenced_snapshot_is_kept() {
            assert!(!is_stale_snapshot(
                &snapshot("snap-3", days_ago(5)),
                &cutoff(),
                &set(&[])
            ));
        }

        #[test]
        fn test_snapshot_exactly_at_cutoff_is_kept() {
            assert!(!is_stale_snapshot(
                &snapshot("snap-4", days_ago(30)),
                &cutoff(),
                &set(&[])
            ));
        }

        #[test]
        fn test_snapshot_without_start_time_is_kept() {
            let mut snap = snapshot("snap-5", days_ago(90));
            snap.start_time = None;
            assert!(!is_stale_snapshot(&snap, &cutoff(), &set(&[])));
        }
    }

    mod image_tests {
        use super::*;

        #[test]
        fn test_old_unused_image_is_stale() {
            assert!(is_stale_image(
                &image("ami-old", days_ago(60), &[]),
                &cutoff(),
                &set(&["ami-live"])
            ));
        }

        #[test]
        fn test_old_image_in_use_is_kept() {
            assert!(!is_stale_image(
                &image("ami-live", days_ago(365), &[]),
                &cutoff(),
                &set(&["ami-live"])
            ));
        }

        #[test]
        fn test_young_image_is_kept() {
            assert!(!is_stale_image(
                &image("ami-new", days_ago(1), &[]),
                &cutoff(),
                &set(&[])
            ));
        }

        #[test]
        fn test_image_without_creation_date_is_kept() {
            let mut img = image("ami-odd", days_ago(90), &[]);
            img.creation_date = None;
            assert!(!is_stale_image(&img, &cutoff(), &set(&[])));
        }
    }

    mod load_balancer_tests {
        use super::*;

        #[test]
        fn test_classic_without_instances_is_unused() {
            let lb = ClassicLoadBalancer {
                name: "legacy".to_string(),
                instance_ids: vec![],
            };
            assert!(is_unused_classic_load_balancer(&lb));
        }

        #[test]
        fn test_classic_with_instances_is_used() {
            let lb = ClassicLoadBalancer {
                name: "web".to_string(),
                instance_ids: vec!["i-1".to_string()],
            };
            assert!(!is_unused_classic_load_balancer(&lb));
        }

        #[test]
        fn test_v2_union_across_groups() {
            assert!(!is_unused_load_balancer_v2(&[vec![], vec![target("i-1")]]));
            assert!(is_unused_load_balancer_v2(&[vec![], vec![]]));
        }

        #[test]
        fn test_v2_without_target_groups_is_unused() {
            assert!(is_unused_load_balancer_v2(&[]));
        }
    }
}
