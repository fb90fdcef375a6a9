#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Anomaly report taxonomy and the geolocated sighting record.
//!
//! This crate defines the canonical phenomenon categories used across the
//! window-map system. All report sources normalize their source-specific
//! phenomenon types into this shared taxonomy before analysis.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of phenomenon categories in the taxonomy.
///
/// Kept in sync with [`SightingCategory::all`]; the null-model engine uses
/// it to size its dense per-cell count arrays.
pub const CATEGORY_COUNT: usize = 3;

/// Phenomenon categories tracked by the window hypothesis.
///
/// The window hypothesis asks whether these otherwise-unrelated report
/// categories co-occur geographically beyond chance, so the set is fixed
/// and intentionally small.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SightingCategory {
    /// Unidentified aerial phenomenon reports
    Ufo,
    /// Unknown creature encounter reports
    Cryptid,
    /// Haunting and apparition reports
    Haunting,
}

impl SightingCategory {
    /// Returns all variants of this enum, in dense-index order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Ufo, Self::Cryptid, Self::Haunting]
    }

    /// Returns the dense index of this category (0..[`CATEGORY_COUNT`]).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A single validated, geolocated anomaly report.
///
/// Immutable and externally supplied; ingestion and validation happen
/// upstream of this core. Coordinates are expected to be in range
/// (latitude [-90, 90], longitude [-180, 180]); the grid assigner rejects
/// out-of-range rows rather than silently coercing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SightingRecord {
    /// Upstream record identifier.
    pub id: String,
    /// Phenomenon category.
    pub category: SightingCategory,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl SightingRecord {
    /// Returns `true` if both coordinates are finite and in range.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}
