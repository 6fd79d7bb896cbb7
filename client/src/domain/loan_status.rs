//! The two loan status vocabularies and the mappings between them.
//!
//! The remote loans service speaks [`CanonicalStatus`]. The local cache and
//! the display layer speak the coarser [`LegacyStatus`]. The mapping is not
//! bijective, so each direction is a separate total function.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Loan status as defined by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    /// Requested, awaiting a decision.
    #[serde(alias = "Pending", alias = "PENDIENTE")]
    Pending,
    /// Approved and not yet due.
    #[serde(alias = "Active", alias = "ACTIVO")]
    Active,
    /// The book is back.
    #[serde(alias = "Returned", alias = "DEVUELTO")]
    Returned,
    /// Approved and past its due date.
    #[serde(alias = "Overdue", alias = "VENCIDO")]
    Overdue,
    /// Rejected or cancelled.
    #[serde(
        alias = "Cancelled",
        alias = "CANCELADO",
        alias = "REJECTED",
        alias = "RECHAZADO"
    )]
    Cancelled,
}

impl CanonicalStatus {
    /// Wire name used in remote paths and payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Returned => "RETURNED",
            Self::Overdue => "OVERDUE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// True when no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Returned | Self::Cancelled)
    }

    /// Display mapping. Overdue folds into `aprobado`; overdue-ness is derived
    /// from the due date, never stored.
    #[must_use]
    pub const fn to_legacy(self) -> LegacyStatus {
        match self {
            Self::Pending => LegacyStatus::Pendiente,
            Self::Active | Self::Overdue => LegacyStatus::Aprobado,
            Self::Returned => LegacyStatus::Devuelto,
            Self::Cancelled => LegacyStatus::Rechazado,
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan status as stored locally and rendered by the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyStatus {
    /// Awaiting a decision.
    Pendiente,
    /// Approved; the book is out.
    Aprobado,
    /// Rejected or cancelled.
    Rechazado,
    /// Returned.
    Devuelto,
}

impl LegacyStatus {
    /// Stored and displayed spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Aprobado => "aprobado",
            Self::Rechazado => "rechazado",
            Self::Devuelto => "devuelto",
        }
    }

    /// Write-intent mapping used where no canonical authority exists.
    /// Never produces [`CanonicalStatus::Overdue`].
    #[must_use]
    pub const fn to_canonical(self) -> CanonicalStatus {
        match self {
            Self::Pendiente => CanonicalStatus::Pending,
            Self::Aprobado => CanonicalStatus::Active,
            Self::Rechazado => CanonicalStatus::Cancelled,
            Self::Devuelto => CanonicalStatus::Returned,
        }
    }
}

impl fmt::Display for LegacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
