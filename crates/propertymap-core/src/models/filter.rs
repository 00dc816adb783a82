//! Map filter criteria.
//!
//! Room ranges run from 0 to [`ROOM_FILTER_CEILING`], where a maximum at the
//! ceiling means "no upper bound". Properties with an unknown count always
//! pass that count's range.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::property::{iso_millis, Property};

/// Slider maximum; a max bound at this value reads as "10+"
pub const ROOM_FILTER_CEILING: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PropertyFilter {
    pub bedrooms_min: f64,
    pub bedrooms_max: f64,
    pub bathrooms_min: f64,
    pub bathrooms_max: f64,
    pub reception_rooms_min: f64,
    pub reception_rooms_max: f64,
    pub parking_types: Vec<String>,
    pub property_types: Vec<String>,
}

impl Default for PropertyFilter {
    fn default() -> Self {
        Self {
            bedrooms_min: 0.0,
            bedrooms_max: ROOM_FILTER_CEILING,
            bathrooms_min: 0.0,
            bathrooms_max: ROOM_FILTER_CEILING,
            reception_rooms_min: 0.0,
            reception_rooms_max: ROOM_FILTER_CEILING,
            parking_types: Vec::new(),
            property_types: Vec::new(),
        }
    }
}

fn in_range(value: Option<f64>, min: f64, max: f64) -> bool {
    match value {
        None => true,
        Some(v) => v >= min && (max >= ROOM_FILTER_CEILING || v <= max),
    }
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if !in_range(property.bedrooms, self.bedrooms_min, self.bedrooms_max)
            || !in_range(property.bathrooms, self.bathrooms_min, self.bathrooms_max)
            || !in_range(
                property.reception_rooms,
                self.reception_rooms_min,
                self.reception_rooms_max,
            )
        {
            return false;
        }

        if !self.parking_types.is_empty() {
            let Some(parking) = property.parking.as_deref() else {
                return false;
            };
            let parking = parking.to_lowercase();
            if !self
                .parking_types
                .iter()
                .any(|t| parking.contains(&t.to_lowercase()))
            {
                return false;
            }
        }

        if !self.property_types.is_empty() {
            let Some(kind) = property.property_type.as_deref() else {
                return false;
            };
            if !self
                .property_types
                .iter()
                .any(|t| t.to_lowercase() == kind.to_lowercase())
            {
                return false;
            }
        }

        true
    }

    pub fn has_active_filters(&self) -> bool {
        self.bedrooms_min > 0.0
            || self.bedrooms_max < ROOM_FILTER_CEILING
            || self.bathrooms_min > 0.0
            || self.bathrooms_max < ROOM_FILTER_CEILING
            || self.reception_rooms_min > 0.0
            || self.reception_rooms_max < ROOM_FILTER_CEILING
            || !self.parking_types.is_empty()
            || !self.property_types.is_empty()
    }
}

/// Values available to filter on, derived from a set of properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FilterFacets {
    pub property_types: Vec<String>,
    pub parking_types: Vec<String>,
    pub total: usize,
    pub mappable: usize,
    #[serde(with = "iso_millis")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub last_fetched: DateTime<Utc>,
}

impl FilterFacets {
    pub fn from_properties(properties: &[Property], last_fetched: DateTime<Utc>) -> Self {
        let mut property_types = BTreeSet::new();
        let mut parking_types = BTreeSet::new();
        let mut mappable = 0;

        for p in properties {
            if let Some(ref kind) = p.property_type {
                property_types.insert(kind.clone());
            }
            if let Some(ref parking) = p.parking {
                parking_types.insert(parking.clone());
            }
            if p.is_mappable() {
                mappable += 1;
            }
        }

        Self {
            property_types: property_types.into_iter().collect(),
            parking_types: parking_types.into_iter().collect(),
            total: properties.len(),
            mappable,
            last_fetched,
        }
    }
}
