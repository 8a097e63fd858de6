//! Offered resources and their ingestion-time classification.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Role string for unreserved resources.
pub const UNRESERVED_ROLE: &str = "*";

/// A bundle of resources made available by the cluster manager for one
/// evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: String,
    /// Node the resources live on.
    pub node_id: String,
    /// Resources in the order the cluster manager listed them.
    pub resources: Vec<Resource>,
}

/// A named, typed allocation unit within an offer.
///
/// Immutable once read from an offer — consumption removes or replaces
/// whole values in the pool, it never edits a `Resource` in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub name: String,
    pub value: Value,
    /// Role the resource is offered under (`"*"` for unreserved).
    pub role: String,
    pub reservation: Option<Reservation>,
    pub disk: Option<DiskInfo>,
}

/// Marks a resource as held for a principal.
///
/// A resource-id label makes the resource individually tracked rather
/// than merged; a reservation without one is matched like any other
/// resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub principal: String,
    pub resource_id: Option<String>,
}

/// Disk-specific attributes of an offered resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DiskInfo {
    /// Persistence id of an existing volume, if any.
    pub persistence_id: Option<String>,
    /// Mount volumes are indivisible: consumable only whole.
    pub mount: bool,
}

/// How a resource is tracked in the pool. Assigned once at ingestion,
/// never re-derived during consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ResourceClass {
    /// Tracked individually by resource-id, never merged.
    Reserved { resource_id: String },
    /// Indivisible; consumed whole or not at all.
    Atomic,
    /// Same-named instances sum into one aggregate.
    Mergeable,
}

impl Resource {
    /// An unreserved resource with no disk attributes.
    pub fn unreserved(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            role: UNRESERVED_ROLE.to_string(),
            reservation: None,
            disk: None,
        }
    }

    /// The reservation's resource-id label, when present.
    pub fn resource_id(&self) -> Option<&str> {
        self.reservation
            .as_ref()
            .and_then(|r| r.resource_id.as_deref())
    }

    /// Whether this resource is an indivisible mount volume.
    pub fn is_mount_volume(&self) -> bool {
        self.disk.as_ref().is_some_and(|d| d.mount)
    }

    /// Classify this resource for pool placement.
    ///
    /// A resource-id label wins over everything else: reserved resources
    /// are tracked individually even when their value would merge.
    pub fn classify(&self) -> ResourceClass {
        if let Some(resource_id) = self.resource_id() {
            ResourceClass::Reserved {
                resource_id: resource_id.to_string(),
            }
        } else if self.is_mount_volume() {
            ResourceClass::Atomic
        } else {
            ResourceClass::Mergeable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount_volume(name: &str, size: f64) -> Resource {
        Resource {
            disk: Some(DiskInfo {
                persistence_id: None,
                mount: true,
            }),
            ..Resource::unreserved(name, Value::scalar(size))
        }
    }

    #[test]
    fn plain_resource_is_mergeable() {
        let cpus = Resource::unreserved("cpus", Value::scalar(1.0));
        assert_eq!(cpus.classify(), ResourceClass::Mergeable);
    }

    #[test]
    fn mount_volume_is_atomic() {
        let disk = mount_volume("disk", 1000.0);
        assert_eq!(disk.classify(), ResourceClass::Atomic);
    }

    #[test]
    fn resource_id_label_wins_over_mount() {
        let mut disk = mount_volume("disk", 1000.0);
        disk.reservation = Some(Reservation {
            principal: "svc".to_string(),
            resource_id: Some("res-1".to_string()),
        });

        assert_eq!(
            disk.classify(),
            ResourceClass::Reserved {
                resource_id: "res-1".to_string()
            }
        );
    }

    #[test]
    fn reservation_without_id_is_not_reserved() {
        let mut cpus = Resource::unreserved("cpus", Value::scalar(1.0));
        cpus.reservation = Some(Reservation {
            principal: "svc".to_string(),
            resource_id: None,
        });

        assert_eq!(cpus.classify(), ResourceClass::Mergeable);
        assert_eq!(cpus.resource_id(), None);
    }
}
