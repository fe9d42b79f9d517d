use serde::Serialize;

/// Where a generated value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Entirely model text
    Model,
    /// Model text topped up with placeholders
    Padded,
    /// Placeholder text only
    Fallback,
}

/// Result of one narrative operation
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub value: T,
    pub provenance: Provenance,
    /// Model attempts spent; zero when no call was needed
    pub attempts: usize,
}

impl<T> Generated<T> {
    pub fn model(value: T, attempts: usize) -> Self {
        Self {
            value,
            provenance: Provenance::Model,
            attempts,
        }
    }

    pub fn padded(value: T, attempts: usize) -> Self {
        Self {
            value,
            provenance: Provenance::Padded,
            attempts,
        }
    }

    pub fn fallback(value: T, attempts: usize) -> Self {
        Self {
            value,
            provenance: Provenance::Fallback,
            attempts,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.provenance != Provenance::Model
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
