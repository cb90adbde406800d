//! Dimension reference data
//!
//! Sample sets the populator draws from, plus the value <-> ID maps the
//! wide table's linkage columns store. Attributes that must co-occur live
//! in one record per sample (`SubscriptionProfile`, `Location`,
//! `ValueTypeSample`), so a single draw always yields a consistent set of
//! IDs.
//!
//! `ReferenceData` is immutable once built and is shared as
//! `Arc<ReferenceData>` between the populator workers.

mod id_map;
mod telecom;

pub use id_map::IdMap;

use crate::schema::DimensionAttribute;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One subscription tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionProfile {
    pub kind: String,
    pub cost_cents: u32,
    pub free_minutes: u32,
    pub data_mb: u32,
}

/// One real-world location; all five parts describe the same place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub zip: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub region: String,
}

/// A value type with its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueTypeSample {
    pub name: String,
    pub threshold: u32,
}

/// Sizes of the four independent sample spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub subscriptions: usize,
    pub locations: usize,
    pub categories: usize,
    pub value_types: usize,
}

/// Value <-> ID maps for every linkage attribute.
#[derive(Debug, Clone, Default)]
pub struct DimensionMaps {
    pub subscription_type: IdMap<String>,
    pub subscription_cost: IdMap<u32>,
    pub subscription_free_minutes: IdMap<u32>,
    pub subscription_data: IdMap<u32>,
    pub zip: IdMap<String>,
    pub city: IdMap<String>,
    pub state: IdMap<String>,
    pub country: IdMap<String>,
    pub region: IdMap<String>,
    pub category: IdMap<String>,
    pub value_type: IdMap<String>,
    pub value_threshold: IdMap<u32>,
}

/// Immutable reference dataset.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    subscriptions: Vec<SubscriptionProfile>,
    subscription_ids: Vec<[i16; 4]>,
    locations: Vec<Location>,
    location_ids: Vec<[i16; 5]>,
    categories: Vec<String>,
    category_ids: Vec<i16>,
    value_types: Vec<ValueTypeSample>,
    value_type_ids: Vec<[i16; 2]>,
    maps: DimensionMaps,
}

impl ReferenceData {
    pub fn builder() -> ReferenceDataBuilder {
        ReferenceDataBuilder::default()
    }

    /// Built-in telecom dataset.
    pub fn telecom() -> Result<Self> {
        telecom::dataset()
    }

    pub fn sample_counts(&self) -> SampleCounts {
        SampleCounts {
            subscriptions: self.subscriptions.len(),
            locations: self.locations.len(),
            categories: self.categories.len(),
            value_types: self.value_types.len(),
        }
    }

    pub fn subscriptions(&self) -> &[SubscriptionProfile] {
        &self.subscriptions
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn value_types(&self) -> &[ValueTypeSample] {
        &self.value_types
    }

    pub fn maps(&self) -> &DimensionMaps {
        &self.maps
    }

    /// IDs for (type, cost, free minutes, data) of subscription sample `idx`.
    pub fn subscription_ids(&self, idx: usize) -> Option<[i16; 4]> {
        self.subscription_ids.get(idx).copied()
    }

    /// IDs for (zip, city, state, country, region) of location sample `idx`.
    pub fn location_ids(&self, idx: usize) -> Option<[i16; 5]> {
        self.location_ids.get(idx).copied()
    }

    pub fn category_id(&self, idx: usize) -> Option<i16> {
        self.category_ids.get(idx).copied()
    }

    /// IDs for (value type, threshold) of value-type sample `idx`.
    pub fn value_type_ids(&self, idx: usize) -> Option<[i16; 2]> {
        self.value_type_ids.get(idx).copied()
    }

    /// Inverse of `subscription_ids`.
    pub fn decode_subscription(&self, ids: [i16; 4]) -> Option<SubscriptionProfile> {
        Some(SubscriptionProfile {
            kind: self.maps.subscription_type.value_of(ids[0])?.clone(),
            cost_cents: *self.maps.subscription_cost.value_of(ids[1])?,
            free_minutes: *self.maps.subscription_free_minutes.value_of(ids[2])?,
            data_mb: *self.maps.subscription_data.value_of(ids[3])?,
        })
    }

    /// Inverse of `location_ids`.
    pub fn decode_location(&self, ids: [i16; 5]) -> Option<Location> {
        Some(Location {
            zip: self.maps.zip.value_of(ids[0])?.clone(),
            city: self.maps.city.value_of(ids[1])?.clone(),
            state: self.maps.state.value_of(ids[2])?.clone(),
            country: self.maps.country.value_of(ids[3])?.clone(),
            region: self.maps.region.value_of(ids[4])?.clone(),
        })
    }

    /// Inverse of `value_type_ids`.
    pub fn decode_value_type(&self, ids: [i16; 2]) -> Option<ValueTypeSample> {
        Some(ValueTypeSample {
            name: self.maps.value_type.value_of(ids[0])?.clone(),
            threshold: *self.maps.value_threshold.value_of(ids[1])?,
        })
    }

    /// Human-readable value behind a linkage ID.
    pub fn label(&self, attr: DimensionAttribute, id: i16) -> Option<String> {
        let maps = &self.maps;
        match attr {
            DimensionAttribute::SubscriptionType => maps.subscription_type.value_of(id).cloned(),
            DimensionAttribute::SubscriptionCost => {
                maps.subscription_cost.value_of(id).map(|v| v.to_string())
            }
            DimensionAttribute::SubscriptionFreeMinutes => maps
                .subscription_free_minutes
                .value_of(id)
                .map(|v| v.to_string()),
            DimensionAttribute::SubscriptionData => {
                maps.subscription_data.value_of(id).map(|v| v.to_string())
            }
            DimensionAttribute::Zip => maps.zip.value_of(id).cloned(),
            DimensionAttribute::City => maps.city.value_of(id).cloned(),
            DimensionAttribute::State => maps.state.value_of(id).cloned(),
            DimensionAttribute::Country => maps.country.value_of(id).cloned(),
            DimensionAttribute::Region => maps.region.value_of(id).cloned(),
            DimensionAttribute::Category => maps.category.value_of(id).cloned(),
            DimensionAttribute::ValueType => maps.value_type.value_of(id).cloned(),
            DimensionAttribute::ValueThreshold => {
                maps.value_threshold.value_of(id).map(|v| v.to_string())
            }
            DimensionAttribute::SubscriberId => None,
        }
    }
}

/// Builder for ReferenceData
#[derive(Debug, Default)]
pub struct ReferenceDataBuilder {
    subscriptions: Vec<SubscriptionProfile>,
    locations: Vec<Location>,
    categories: Vec<String>,
    value_types: Vec<ValueTypeSample>,
}

impl ReferenceDataBuilder {
    pub fn with_subscription(mut self, profile: SubscriptionProfile) -> Self {
        self.subscriptions.push(profile);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_value_type(mut self, sample: ValueTypeSample) -> Self {
        self.value_types.push(sample);
        self
    }

    /// Assign IDs and freeze the dataset.
    pub fn build(self) -> Result<ReferenceData> {
        for (name, len) in [
            ("subscription", self.subscriptions.len()),
            ("location", self.locations.len()),
            ("category", self.categories.len()),
            ("value type", self.value_types.len()),
        ] {
            if len == 0 {
                return Err(Error::InvalidSchema(format!(
                    "reference data has no {} samples",
                    name
                )));
            }
        }

        let mut maps = DimensionMaps::default();

        let subscription_ids = self
            .subscriptions
            .iter()
            .map(|p| -> Result<[i16; 4]> {
                Ok([
                    maps.subscription_type.intern(&p.kind)?,
                    maps.subscription_cost.intern(&p.cost_cents)?,
                    maps.subscription_free_minutes.intern(&p.free_minutes)?,
                    maps.subscription_data.intern(&p.data_mb)?,
                ])
            })
            .collect::<Result<Vec<_>>>()?;

        let location_ids = self
            .locations
            .iter()
            .map(|l| -> Result<[i16; 5]> {
                Ok([
                    maps.zip.intern(&l.zip)?,
                    maps.city.intern(&l.city)?,
                    maps.state.intern(&l.state)?,
                    maps.country.intern(&l.country)?,
                    maps.region.intern(&l.region)?,
                ])
            })
            .collect::<Result<Vec<_>>>()?;

        let category_ids = self
            .categories
            .iter()
            .map(|c| maps.category.intern(c))
            .collect::<Result<Vec<_>>>()?;

        let value_type_ids = self
            .value_types
            .iter()
            .map(|v| -> Result<[i16; 2]> {
                Ok([
                    maps.value_type.intern(&v.name)?,
                    maps.value_threshold.intern(&v.threshold)?,
                ])
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ReferenceData {
            subscriptions: self.subscriptions,
            subscription_ids,
            locations: self.locations,
            location_ids,
            categories: self.categories,
            category_ids,
            value_types: self.value_types,
            value_type_ids,
            maps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(zip: &str, city: &str, state: &str) -> Location {
        Location {
            zip: zip.into(),
            city: city.into(),
            state: state.into(),
            country: "USA".into(),
            region: "North America".into(),
        }
    }

    fn fixture() -> ReferenceData {
        ReferenceData::builder()
            .with_subscription(SubscriptionProfile {
                kind: "prepaid".into(),
                cost_cents: 1000,
                free_minutes: 100,
                data_mb: 500,
            })
            .with_location(location("94105", "San Francisco", "CA"))
            .with_location(location("90012", "Los Angeles", "CA"))
            .with_location(location("10001", "New York", "NY"))
            .with_category("residential")
            .with_value_type(ValueTypeSample {
                name: "low".into(),
                threshold: 50,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_shared_values_share_ids() {
        let data = fixture();
        let sf = data.location_ids(0).unwrap();
        let la = data.location_ids(1).unwrap();
        let ny = data.location_ids(2).unwrap();

        // distinct zips and cities
        assert_ne!(sf[0], la[0]);
        assert_ne!(sf[1], la[1]);
        // same state, country, region
        assert_eq!(sf[2], la[2]);
        assert_ne!(sf[2], ny[2]);
        assert_eq!(sf[3], ny[3]);
        assert_eq!(sf[4], ny[4]);

        assert_eq!(data.maps().state.len(), 2);
        assert_eq!(data.maps().country.len(), 1);
    }

    #[test]
    fn test_decode_round_trip_per_sample() {
        let data = fixture();
        for (idx, loc) in data.locations().iter().enumerate() {
            let ids = data.location_ids(idx).unwrap();
            assert_eq!(data.decode_location(ids).as_ref(), Some(loc));
        }
        let sub = data.decode_subscription(data.subscription_ids(0).unwrap());
        assert_eq!(sub.as_ref(), data.subscriptions().first());
        assert_eq!(data.location_ids(3), None);
    }

    #[test]
    fn test_label() {
        let data = fixture();
        let ids = data.location_ids(2).unwrap();
        assert_eq!(data.label(DimensionAttribute::City, ids[1]).as_deref(), Some("New York"));
        assert_eq!(
            data.label(DimensionAttribute::SubscriptionCost, 1).as_deref(),
            Some("1000")
        );
        assert_eq!(data.label(DimensionAttribute::SubscriberId, 1), None);
    }

    #[test]
    fn test_empty_sample_set_rejected() {
        let err = ReferenceData::builder()
            .with_category("residential")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn test_telecom_dataset() {
        let data = ReferenceData::telecom().unwrap();
        let counts = data.sample_counts();
        assert!(counts.subscriptions >= 4);
        assert!(counts.locations >= 10);
        assert!(counts.categories >= 3);
        assert!(counts.value_types >= 3);
        // Regions are coarser than countries, countries coarser than states
        assert!(data.maps().region.len() <= data.maps().country.len());
        assert!(data.maps().country.len() <= data.maps().state.len());
    }
}
