//! Built-in telecom reference dataset

use super::{Location, ReferenceData, SubscriptionProfile, ValueTypeSample};
use crate::Result;

/// (kind, monthly cost in cents, free call minutes, data allowance in MB)
const SUBSCRIPTIONS: [(&str, u32, u32, u32); 8] = [
    ("prepaid", 1000, 100, 500),
    ("prepaid", 1500, 200, 1000),
    ("student", 900, 300, 3000),
    ("contract", 2500, 500, 2000),
    ("contract", 3500, 1000, 5000),
    ("contract", 5000, 3000, 10000),
    ("business", 8000, 5000, 20000),
    ("business", 12000, 10000, 50000),
];

/// (zip, city, state, country, region)
const LOCATIONS: [(&str, &str, &str, &str, &str); 16] = [
    ("10001", "New York", "NY", "USA", "North America"),
    ("94105", "San Francisco", "CA", "USA", "North America"),
    ("90012", "Los Angeles", "CA", "USA", "North America"),
    ("60601", "Chicago", "IL", "USA", "North America"),
    ("73301", "Austin", "TX", "USA", "North America"),
    ("M5H 2N2", "Toronto", "ON", "Canada", "North America"),
    ("H2Y 1C6", "Montreal", "QC", "Canada", "North America"),
    ("8001", "Zurich", "ZH", "Switzerland", "Europe"),
    ("1201", "Geneva", "GE", "Switzerland", "Europe"),
    ("10115", "Berlin", "BE", "Germany", "Europe"),
    ("80331", "Munich", "BY", "Germany", "Europe"),
    ("75001", "Paris", "IDF", "France", "Europe"),
    ("69001", "Lyon", "ARA", "France", "Europe"),
    ("100-0001", "Tokyo", "Tokyo", "Japan", "Asia"),
    ("530-0001", "Osaka", "Osaka", "Japan", "Asia"),
    ("2000", "Sydney", "NSW", "Australia", "Oceania"),
];

const CATEGORIES: [&str; 5] = [
    "residential",
    "small-business",
    "enterprise",
    "government",
    "education",
];

/// (value type, threshold)
const VALUE_TYPES: [(&str, u32); 4] = [
    ("low", 50),
    ("medium", 150),
    ("high", 500),
    ("premium", 2000),
];

pub(super) fn dataset() -> Result<ReferenceData> {
    let mut builder = ReferenceData::builder();

    for (kind, cost_cents, free_minutes, data_mb) in SUBSCRIPTIONS {
        builder = builder.with_subscription(SubscriptionProfile {
            kind: kind.to_string(),
            cost_cents,
            free_minutes,
            data_mb,
        });
    }

    for (zip, city, state, country, region) in LOCATIONS {
        builder = builder.with_location(Location {
            zip: zip.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            country: country.to_string(),
            region: region.to_string(),
        });
    }

    for category in CATEGORIES {
        builder = builder.with_category(category);
    }

    for (name, threshold) in VALUE_TYPES {
        builder = builder.with_value_type(ValueTypeSample {
            name: name.to_string(),
            threshold,
        });
    }

    builder.build()
}
