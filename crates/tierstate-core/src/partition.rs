//! Partition identifiers, descriptors and usage reports

use crate::errors::{Result, TierError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Name of a partition, e.g. a hash slot range such as `"0_65536"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    /// Create a validated partition identifier
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let id = Self(name.into());
        id.validate()?;
        Ok(id)
    }

    /// Check that the identifier is usable as a partition key
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(TierError::InvalidPartitionId {
                message: "partition id must not be empty".to_string(),
            });
        }
        if self.0.chars().any(char::is_whitespace) {
            return Err(TierError::InvalidPartitionId {
                message: format!("partition id {:?} contains whitespace", self.0),
            });
        }
        Ok(())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartitionId {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&str> for PartitionId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PartitionId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&PartitionId> for PartitionId {
    fn from(id: &PartitionId) -> Self {
        id.clone()
    }
}

/// Static description of a partition, supplied at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    /// Partition identifier
    pub id: PartitionId,
    /// Implementation type, e.g. `"hashtable"` or `"fifoqueue"`
    pub partition_type: String,
    /// Where a flush persists the partition
    pub backing_path: PathBuf,
    /// Memory capacity reserved for the partition
    pub capacity_bytes: u64,
}

impl PartitionDescriptor {
    /// Descriptor of a hashtable partition with no capacity set
    pub fn new(id: impl Into<PartitionId>, backing_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            partition_type: "hashtable".to_string(),
            backing_path: backing_path.into(),
            capacity_bytes: 0,
        }
    }

    /// Set the implementation type
    pub fn with_type(mut self, partition_type: impl Into<String>) -> Self {
        self.partition_type = partition_type.into();
        self
    }

    /// Set the memory capacity, the denominator of pressure utilization
    pub fn with_capacity(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = capacity_bytes;
        self
    }
}

/// Point-in-time storage usage of a partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    /// Partition the report describes
    pub partition_id: PartitionId,
    /// Bytes currently held
    pub used_bytes: u64,
    /// Bytes available to the partition
    pub capacity_bytes: u64,
}

impl StorageUsage {
    /// Create a usage report
    pub fn new(partition_id: impl Into<PartitionId>, used_bytes: u64, capacity_bytes: u64) -> Self {
        Self {
            partition_id: partition_id.into(),
            used_bytes,
            capacity_bytes,
        }
    }

    /// Fraction of capacity in use
    ///
    /// A partition with zero capacity is treated as fully utilized.
    pub fn utilization(&self) -> f64 {
        if self.capacity_bytes == 0 {
            return 1.0;
        }
        self.used_bytes as f64 / self.capacity_bytes as f64
    }
}
