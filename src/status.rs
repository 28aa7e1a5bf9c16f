//! Lifecycle status values. Deletion is logical: a record is deleted by moving it to `Inactive`.

use serde::{Deserialize, Serialize};

/// Column holding the lifecycle status on every table.
pub const STATUS_COLUMN: &str = "status";

/// Status shared by master files and most transaction records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenericEntityStatus {
    Active,
    Inactive,
}

impl GenericEntityStatus {
    pub const ALL: &'static [GenericEntityStatus] = &[GenericEntityStatus::Active, GenericEntityStatus::Inactive];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenericEntityStatus::Active => "Active",
            GenericEntityStatus::Inactive => "Inactive",
        }
    }
}

/// Status of a sale, which moves through a small workflow before it can be retired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleStatus {
    Created,
    Pending,
    Completed,
    Inactive,
}

impl SaleStatus {
    pub const ALL: &'static [SaleStatus] = &[
        SaleStatus::Created,
        SaleStatus::Pending,
        SaleStatus::Completed,
        SaleStatus::Inactive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Created => "Created",
            SaleStatus::Pending => "Pending",
            SaleStatus::Completed => "Completed",
            SaleStatus::Inactive => "Inactive",
        }
    }
}

/// Which status enum an entity uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Generic,
    Sale,
}

impl StatusKind {
    /// Status assigned on create.
    pub fn initial(&self) -> &'static str {
        match self {
            StatusKind::Generic => GenericEntityStatus::Active.as_str(),
            StatusKind::Sale => SaleStatus::Created.as_str(),
        }
    }

    /// Terminal status written by delete; both enums share the same name.
    pub fn inactive(&self) -> &'static str {
        match self {
            StatusKind::Generic => GenericEntityStatus::Inactive.as_str(),
            StatusKind::Sale => SaleStatus::Inactive.as_str(),
        }
    }

    pub fn values(&self) -> Vec<&'static str> {
        match self {
            StatusKind::Generic => GenericEntityStatus::ALL.iter().map(|s| s.as_str()).collect(),
            StatusKind::Sale => SaleStatus::ALL.iter().map(|s| s.as_str()).collect(),
        }
    }
}
