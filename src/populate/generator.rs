//! Synthetic subscriber rows
//!
//! Each row takes four random draws: one subscription sample, one location
//! sample, one category and one value type. Every linkage column comes from
//! the sample picked by its draw, so co-occurring attributes always belong
//! together.

use crate::backend::PartialRow;
use crate::reference::{ReferenceData, SampleCounts};
use crate::schema::{
    DimensionAttribute, LAST_UPDATED_FIELD, LINKAGE_COLUMN_COUNT, SUBSCRIBER_ID_FIELD,
};
use crate::{Error, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// One generated wide-table row, minus the metric columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRow {
    pub subscriber_id: i64,
    pub last_updated: i64,
    /// Sample indices chosen by the four draws
    pub subscription: usize,
    pub location: usize,
    pub category: usize,
    pub value_type: usize,
    /// Linkage IDs in `DimensionAttribute::LINKAGE` order
    pub linkage: [i16; LINKAGE_COLUMN_COUNT],
}

impl GeneratedRow {
    pub fn linkage_id(&self, attr: DimensionAttribute) -> Option<i16> {
        attr.linkage_index().map(|idx| self.linkage[idx])
    }

    pub fn subscription_ids(&self) -> [i16; 4] {
        let l = &self.linkage;
        [l[0], l[1], l[2], l[3]]
    }

    pub fn location_ids(&self) -> [i16; 5] {
        let l = &self.linkage;
        [l[4], l[5], l[6], l[7], l[8]]
    }

    pub fn value_type_ids(&self) -> [i16; 2] {
        [self.linkage[10], self.linkage[11]]
    }

    /// Set key, timestamp and linkage columns on `row`.
    pub fn apply_to(&self, row: &mut PartialRow) -> Result<()> {
        row.set_i64(SUBSCRIBER_ID_FIELD, self.subscriber_id)?;
        row.set_i64(LAST_UPDATED_FIELD, self.last_updated)?;
        for (attr, id) in DimensionAttribute::LINKAGE.iter().zip(self.linkage) {
            row.set_i16(attr.column_name(), id)?;
        }
        Ok(())
    }
}

/// Draws dimension samples for successive subscriber rows.
pub struct RowGenerator {
    reference: Arc<ReferenceData>,
    counts: SampleCounts,
    rng: SmallRng,
}

impl RowGenerator {
    pub fn new(reference: Arc<ReferenceData>, seed: u64) -> Self {
        Self::with_rng(reference, SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy(reference: Arc<ReferenceData>) -> Self {
        Self::with_rng(reference, SmallRng::from_entropy())
    }

    fn with_rng(reference: Arc<ReferenceData>, rng: SmallRng) -> Self {
        let counts = reference.sample_counts();
        Self {
            reference,
            counts,
            rng,
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn next_row(&mut self, subscriber_id: i64, last_updated: i64) -> Result<GeneratedRow> {
        let subscription = self.rng.gen_range(0..self.counts.subscriptions);
        let location = self.rng.gen_range(0..self.counts.locations);
        let category = self.rng.gen_range(0..self.counts.categories);
        let value_type = self.rng.gen_range(0..self.counts.value_types);

        let missing = |what: &str, idx: usize| {
            Error::Internal(format!("no IDs for {} sample {}", what, idx))
        };
        let [sub_type, sub_cost, sub_minutes, sub_data] = self
            .reference
            .subscription_ids(subscription)
            .ok_or_else(|| missing("subscription", subscription))?;
        let [zip, city, state, country, region] = self
            .reference
            .location_ids(location)
            .ok_or_else(|| missing("location", location))?;
        let category_id = self
            .reference
            .category_id(category)
            .ok_or_else(|| missing("category", category))?;
        let [value_type_id, threshold_id] = self
            .reference
            .value_type_ids(value_type)
            .ok_or_else(|| missing("value type", value_type))?;

        Ok(GeneratedRow {
            subscriber_id,
            last_updated,
            subscription,
            location,
            category,
            value_type,
            linkage: [
                sub_type,
                sub_cost,
                sub_minutes,
                sub_data,
                zip,
                city,
                state,
                country,
                region,
                category_id,
                value_type_id,
                threshold_id,
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Location, SubscriptionProfile, ValueTypeSample};

    fn reference() -> Arc<ReferenceData> {
        Arc::new(ReferenceData::telecom().unwrap())
    }

    #[test]
    fn test_rows_are_consistent() {
        let reference = reference();
        let mut generator = RowGenerator::new(reference.clone(), 7);

        for id in 0..2_000 {
            let row = generator.next_row(id, 1_000).unwrap();
            assert_eq!(row.subscriber_id, id);

            let location = reference.decode_location(row.location_ids()).unwrap();
            assert_eq!(location, reference.locations()[row.location]);

            let subscription = reference.decode_subscription(row.subscription_ids()).unwrap();
            assert_eq!(subscription, reference.subscriptions()[row.subscription]);

            let value_type = reference.decode_value_type(row.value_type_ids()).unwrap();
            assert_eq!(value_type, reference.value_types()[row.value_type]);

            let category = row.linkage_id(DimensionAttribute::Category).unwrap();
            assert_eq!(
                reference.label(DimensionAttribute::Category, category).unwrap(),
                reference.categories()[row.category]
            );
        }
    }

    #[test]
    fn test_same_seed_same_rows() {
        let mut a = RowGenerator::new(reference(), 42);
        let mut b = RowGenerator::new(reference(), 42);
        for id in 0..100 {
            assert_eq!(a.next_row(id, 0).unwrap(), b.next_row(id, 0).unwrap());
        }
    }

    #[test]
    fn test_draws_cover_samples() {
        let reference = reference();
        let mut generator = RowGenerator::new(reference.clone(), 1);
        let mut seen = vec![false; reference.locations().len()];
        for id in 0..5_000 {
            seen[generator.next_row(id, 0).unwrap().location] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_single_sample_fixture() {
        let reference = Arc::new(
            ReferenceData::builder()
                .with_subscription(SubscriptionProfile {
                    kind: "prepaid".into(),
                    cost_cents: 1000,
                    free_minutes: 60,
                    data_mb: 512,
                })
                .with_location(Location {
                    zip: "8001".into(),
                    city: "Zurich".into(),
                    state: "ZH".into(),
                    country: "Switzerland".into(),
                    region: "Europe".into(),
                })
                .with_category("consumer")
                .with_value_type(ValueTypeSample {
                    name: "gold".into(),
                    threshold: 100,
                })
                .build()
                .unwrap(),
        );
        let row = RowGenerator::new(reference, 3).next_row(5, 6).unwrap();
        assert_eq!(row.linkage, [1; 12]);
        assert_eq!(row.last_updated, 6);
    }
}
