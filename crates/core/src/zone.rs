//! Zone identity
//!
//! A zone is a logical trace context (a thread, a worker, a process shard).
//! Zones are discovered from `wtf.zone#create` events; identity is the
//! `(name, zone_type, location)` triple and duplicate creates are ignored
//! by the coordinator.

use serde::{Deserialize, Serialize};

/// Identity of a logical trace context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    /// Human-readable zone name (unique within a session)
    pub name: String,
    /// Zone category, e.g. `script`, `native`, `worker`
    pub zone_type: String,
    /// Where the zone ran, e.g. a URI or host identifier
    pub location: String,
}

impl Zone {
    /// Create a zone identity
    pub fn new(
        name: impl Into<String>,
        zone_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            zone_type: zone_type.into(),
            location: location.into(),
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.zone_type)
    }
}
