//! Dimensional attributes of a subscriber row
//!
//! Every wide-table row links to one sample of each dimension through a
//! small integer ID column. Widths are fixed per attribute: the subscriber
//! key is 8 bytes, every linkage ID is 2 bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key column of the wide table.
pub const SUBSCRIBER_ID_FIELD: &str = "subscriber_id";
/// Last modification timestamp column (millis since epoch).
pub const LAST_UPDATED_FIELD: &str = "last_updated";

/// The 13 dimensional attribute kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionAttribute {
    SubscriptionType,
    SubscriptionCost,
    SubscriptionFreeMinutes,
    SubscriptionData,
    Zip,
    City,
    State,
    Country,
    Region,
    Category,
    ValueType,
    ValueThreshold,
    SubscriberId,
}

impl DimensionAttribute {
    /// Linkage attributes in physical column order (the table's fixed tail).
    pub const LINKAGE: [DimensionAttribute; 12] = [
        DimensionAttribute::SubscriptionType,
        DimensionAttribute::SubscriptionCost,
        DimensionAttribute::SubscriptionFreeMinutes,
        DimensionAttribute::SubscriptionData,
        DimensionAttribute::Zip,
        DimensionAttribute::City,
        DimensionAttribute::State,
        DimensionAttribute::Country,
        DimensionAttribute::Region,
        DimensionAttribute::Category,
        DimensionAttribute::ValueType,
        DimensionAttribute::ValueThreshold,
    ];

    /// Attributes drawn together from one subscription sample.
    pub const SUBSCRIPTION: [DimensionAttribute; 4] = [
        DimensionAttribute::SubscriptionType,
        DimensionAttribute::SubscriptionCost,
        DimensionAttribute::SubscriptionFreeMinutes,
        DimensionAttribute::SubscriptionData,
    ];

    /// Attributes drawn together from one location sample.
    pub const LOCATION: [DimensionAttribute; 5] = [
        DimensionAttribute::Zip,
        DimensionAttribute::City,
        DimensionAttribute::State,
        DimensionAttribute::Country,
        DimensionAttribute::Region,
    ];

    /// Physical width in bytes.
    pub const fn width(&self) -> usize {
        match self {
            DimensionAttribute::SubscriberId => 8,
            DimensionAttribute::SubscriptionType
            | DimensionAttribute::SubscriptionCost
            | DimensionAttribute::SubscriptionFreeMinutes
            | DimensionAttribute::SubscriptionData
            | DimensionAttribute::Zip
            | DimensionAttribute::City
            | DimensionAttribute::State
            | DimensionAttribute::Country
            | DimensionAttribute::Region
            | DimensionAttribute::Category
            | DimensionAttribute::ValueType
            | DimensionAttribute::ValueThreshold => 2,
        }
    }

    /// Column holding this attribute in the wide table.
    pub const fn column_name(&self) -> &'static str {
        match self {
            DimensionAttribute::SubscriptionType => "subscription_type_id",
            DimensionAttribute::SubscriptionCost => "subscription_cost_id",
            DimensionAttribute::SubscriptionFreeMinutes => "subscription_free_call_mins_id",
            DimensionAttribute::SubscriptionData => "subscription_data_id",
            DimensionAttribute::Zip => "city_zip",
            DimensionAttribute::City => "region_cty_id",
            DimensionAttribute::State => "region_state_id",
            DimensionAttribute::Country => "region_country_id",
            DimensionAttribute::Region => "region_region_id",
            DimensionAttribute::Category => "category_id",
            DimensionAttribute::ValueType => "value_type_id",
            DimensionAttribute::ValueThreshold => "value_type_threshold_id",
            DimensionAttribute::SubscriberId => SUBSCRIBER_ID_FIELD,
        }
    }

    /// Position in the linkage tail, `None` for the subscriber key.
    pub fn linkage_index(&self) -> Option<usize> {
        Self::LINKAGE.iter().position(|a| a == self)
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::LINKAGE
            .iter()
            .chain(std::iter::once(&DimensionAttribute::SubscriberId))
            .find(|a| a.column_name() == name)
            .copied()
    }
}

impl fmt::Display for DimensionAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(DimensionAttribute::SubscriberId.width(), 8);
        for attr in DimensionAttribute::LINKAGE {
            assert_eq!(attr.width(), 2, "{} must be 2 bytes", attr);
        }
    }

    #[test]
    fn test_linkage_order() {
        let names: Vec<_> = DimensionAttribute::LINKAGE
            .iter()
            .map(|a| a.column_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "subscription_type_id",
                "subscription_cost_id",
                "subscription_free_call_mins_id",
                "subscription_data_id",
                "city_zip",
                "region_cty_id",
                "region_state_id",
                "region_country_id",
                "region_region_id",
                "category_id",
                "value_type_id",
                "value_type_threshold_id",
            ]
        );
    }

    #[test]
    fn test_column_name_lookup() {
        assert_eq!(
            DimensionAttribute::from_column_name("region_state_id"),
            Some(DimensionAttribute::State)
        );
        assert_eq!(
            DimensionAttribute::from_column_name(SUBSCRIBER_ID_FIELD),
            Some(DimensionAttribute::SubscriberId)
        );
        assert_eq!(DimensionAttribute::from_column_name("calls_sum_local_day"), None);
        assert_eq!(DimensionAttribute::Zip.linkage_index(), Some(4));
        assert_eq!(DimensionAttribute::SubscriberId.linkage_index(), None);
    }
}
