//! # Feature Schema
//!
//! The eight block-group covariates of the California housing dataset, in the
//! column order used by the split CSVs, the model matrices and the prediction
//! API. Each covariate has an inclusive accepted range; the prediction service
//! rejects records outside it.
//!
//! Two cross-field relations are advisory only: rooms below bedrooms, or
//! occupancy above population, is reported by
//! [`HousingFeatures::consistency_warnings`] but never rejects a record whose
//! fields are all in range.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Number of covariates per record.
pub const N_FEATURES: usize = 8;

/// A record's covariates in [`FEATURE_NAMES`] order.
pub type FeatureVector = [f64; N_FEATURES];

/// Column name of the regression target in the split CSVs.
pub const TARGET_COLUMN: &str = "median_house_value";

/// Column names in model order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "MedInc",
    "HouseAge",
    "AveRooms",
    "AveBedrms",
    "Population",
    "AveOccup",
    "Latitude",
    "Longitude",
];

/// Name, meaning and accepted range of one covariate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    /// Column name.
    pub name: &'static str,
    /// Human-readable meaning, surfaced in the OpenAPI document.
    pub description: &'static str,
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
    /// Representative value taken from the first dataset row.
    pub example: f64,
}

impl FeatureSpec {
    /// Whether `value` lies within the accepted range.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn range_constraint(&self) -> String {
        format!("must be between {} and {}", self.min, self.max)
    }
}

/// Schema for every covariate, in [`FEATURE_NAMES`] order.
pub const FEATURE_SPECS: [FeatureSpec; N_FEATURES] = [
    FeatureSpec {
        name: "MedInc",
        description: "Median income in block group (tens of thousands of dollars)",
        min: 0.0,
        max: 20.0,
        example: 8.3252,
    },
    FeatureSpec {
        name: "HouseAge",
        description: "Median house age in block group (years)",
        min: 0.0,
        max: 100.0,
        example: 41.0,
    },
    FeatureSpec {
        name: "AveRooms",
        description: "Average number of rooms per household",
        min: 1.0,
        max: 50.0,
        example: 6.984127,
    },
    FeatureSpec {
        name: "AveBedrms",
        description: "Average number of bedrooms per household",
        min: 0.0,
        max: 10.0,
        example: 1.02381,
    },
    FeatureSpec {
        name: "Population",
        description: "Block group population",
        min: 1.0,
        max: 50000.0,
        example: 322.0,
    },
    FeatureSpec {
        name: "AveOccup",
        description: "Average number of household members",
        min: 1.0,
        max: 20.0,
        example: 2.555556,
    },
    FeatureSpec {
        name: "Latitude",
        description: "Block group latitude (degrees)",
        min: 32.0,
        max: 42.0,
        example: 37.88,
    },
    FeatureSpec {
        name: "Longitude",
        description: "Block group longitude (degrees)",
        min: -125.0,
        max: -114.0,
        example: -122.23,
    },
];

/// One validated prediction input.
///
/// Serializes with the dataset's column names so responses echo the request
/// shape back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HousingFeatures {
    /// Median income (tens of thousands of dollars).
    #[serde(rename = "MedInc")]
    pub med_inc: f64,
    /// Median house age (years).
    #[serde(rename = "HouseAge")]
    pub house_age: f64,
    /// Average rooms per household.
    #[serde(rename = "AveRooms")]
    pub ave_rooms: f64,
    /// Average bedrooms per household.
    #[serde(rename = "AveBedrms")]
    pub ave_bedrms: f64,
    /// Block group population.
    #[serde(rename = "Population")]
    pub population: f64,
    /// Average household members.
    #[serde(rename = "AveOccup")]
    pub ave_occup: f64,
    /// Latitude (degrees).
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    /// Longitude (degrees).
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

impl HousingFeatures {
    /// Build from a vector in [`FEATURE_NAMES`] order. Performs no validation.
    pub fn from_vector(v: FeatureVector) -> Self {
        Self {
            med_inc: v[0],
            house_age: v[1],
            ave_rooms: v[2],
            ave_bedrms: v[3],
            population: v[4],
            ave_occup: v[5],
            latitude: v[6],
            longitude: v[7],
        }
    }

    /// The covariates in [`FEATURE_NAMES`] order.
    pub fn to_vector(&self) -> FeatureVector {
        [
            self.med_inc,
            self.house_age,
            self.ave_rooms,
            self.ave_bedrms,
            self.population,
            self.ave_occup,
            self.latitude,
            self.longitude,
        ]
    }

    /// The representative record built from [`FeatureSpec::example`] values.
    pub fn example() -> Self {
        let mut v = [0.0; N_FEATURES];
        for (slot, spec) in v.iter_mut().zip(FEATURE_SPECS.iter()) {
            *slot = spec.example;
        }
        Self::from_vector(v)
    }

    /// Parse and validate an untyped JSON object.
    ///
    /// Fields are checked in column order and the first violation is
    /// returned. Numeric strings are accepted and coerced; unknown keys are
    /// ignored.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value
            .as_object()
            .ok_or_else(|| ValidationError::new("body", "expected a JSON object"))?;

        let mut v = [0.0; N_FEATURES];
        for (slot, spec) in v.iter_mut().zip(FEATURE_SPECS.iter()) {
            let raw = object
                .get(spec.name)
                .ok_or_else(|| ValidationError::new(spec.name, "field required"))?;
            *slot = coerce_numeric(spec.name, raw)?;
        }

        let features = Self::from_vector(v);
        features.validate()?;
        Ok(features)
    }

    /// Check that every field is finite and in range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (value, spec) in self.to_vector().into_iter().zip(FEATURE_SPECS.iter()) {
            if !value.is_finite() {
                return Err(ValidationError::new(spec.name, "value must be finite"));
            }
            if !spec.contains(value) {
                return Err(ValidationError::new(spec.name, spec.range_constraint()).with_value(value));
            }
        }
        Ok(())
    }

    /// Implausible but accepted combinations of in-range fields.
    pub fn consistency_warnings(&self) -> Vec<ValidationError> {
        let mut notes = Vec::new();
        if self.ave_rooms < self.ave_bedrms {
            notes.push(
                ValidationError::new("AveRooms", "average rooms below average bedrooms")
                    .with_value(self.ave_rooms),
            );
        }
        if self.ave_occup > self.population {
            notes.push(
                ValidationError::new("AveOccup", "average occupancy above total population")
                    .with_value(self.ave_occup),
            );
        }
        notes
    }
}

fn coerce_numeric(field: &str, raw: &Value) -> Result<f64, ValidationError> {
    match raw {
        Value::Null => Err(ValidationError::new(field, "value cannot be null")),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ValidationError::new(field, "value must be numeric").with_value(raw.clone())),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::new(field, "value must be numeric").with_value(raw.clone())),
        _ => Err(ValidationError::new(field, "value must be numeric").with_value(raw.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn valid_json() -> Value {
        json!({
            "MedInc": 8.3252,
            "HouseAge": 41.0,
            "AveRooms": 6.984127,
            "AveBedrms": 1.02381,
            "Population": 322.0,
            "AveOccup": 2.555556,
            "Latitude": 37.88,
            "Longitude": -122.23
        })
    }

    #[test]
    fn names_and_specs_agree() {
        for (name, spec) in FEATURE_NAMES.iter().zip(FEATURE_SPECS.iter()) {
            assert_eq!(*name, spec.name);
            assert!(spec.min < spec.max);
            assert!(spec.contains(spec.example), "{} example out of range", spec.name);
        }
    }

    #[test]
    fn parses_valid_record() {
        let f = HousingFeatures::from_json(&valid_json()).unwrap();
        assert_eq!(f, HousingFeatures::example());
        assert_eq!(f.to_vector()[7], -122.23);
    }

    #[test]
    fn serializes_with_column_names() {
        let json = serde_json::to_value(HousingFeatures::example()).unwrap();
        for name in FEATURE_NAMES {
            assert!(json.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn missing_field_is_named() {
        let mut body = valid_json();
        body.as_object_mut().unwrap().remove("HouseAge");
        let err = HousingFeatures::from_json(&body).unwrap_err();
        assert_eq!(err.field, "HouseAge");
        assert_eq!(err.constraint, "field required");
    }

    #[test]
    fn null_field_is_rejected() {
        let mut body = valid_json();
        body["Latitude"] = Value::Null;
        let err = HousingFeatures::from_json(&body).unwrap_err();
        assert_eq!(err.field, "Latitude");
        assert!(err.constraint.contains("null"));
    }

    #[test]
    fn numeric_string_is_coerced() {
        let mut body = valid_json();
        body["MedInc"] = json!(" 3.5 ");
        let f = HousingFeatures::from_json(&body).unwrap();
        assert_eq!(f.med_inc, 3.5);
    }

    #[test]
    fn non_numeric_string_is_rejected() {
        let mut body = valid_json();
        body["Population"] = json!("lots");
        let err = HousingFeatures::from_json(&body).unwrap_err();
        assert_eq!(err.field, "Population");
        assert_eq!(err.constraint, "value must be numeric");
        assert_eq!(err.value, Some(json!("lots")));
    }

    #[test]
    fn out_of_range_names_field_and_bounds() {
        let mut body = valid_json();
        body["MedInc"] = json!(25.0);
        let err = HousingFeatures::from_json(&body).unwrap_err();
        assert_eq!(err.field, "MedInc");
        assert_eq!(err.constraint, "must be between 0 and 20");
    }

    #[test]
    fn longitude_bounds_are_negative() {
        let mut body = valid_json();
        body["Longitude"] = json!(122.23);
        let err = HousingFeatures::from_json(&body).unwrap_err();
        assert_eq!(err.field, "Longitude");
        assert_eq!(err.constraint, "must be between -125 and -114");
    }

    #[test]
    fn rooms_below_bedrooms_is_accepted_with_a_warning() {
        let features = HousingFeatures::from_vector([3.0, 20.0, 1.5, 2.0, 322.0, 2.5, 37.0, -122.0]);
        features.validate().unwrap();
        let notes = features.consistency_warnings();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].field, "AveRooms");
    }

    #[test]
    fn occupancy_above_population_is_accepted_with_a_warning() {
        let mut body = valid_json();
        body["Population"] = json!(3.0);
        body["AveOccup"] = json!(5.0);
        let features = HousingFeatures::from_json(&body).unwrap();
        let notes = features.consistency_warnings();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].field, "AveOccup");
    }

    #[test]
    fn typical_record_has_no_warnings() {
        let features = HousingFeatures::from_json(&valid_json()).unwrap();
        assert!(features.consistency_warnings().is_empty());
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = HousingFeatures::from_json(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.field, "body");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut body = valid_json();
        body["ocean_proximity"] = json!("NEAR BAY");
        assert!(HousingFeatures::from_json(&body).is_ok());
    }

    fn in_range() -> impl Strategy<Value = FeatureVector> {
        let s = FEATURE_SPECS;
        (
            s[0].min..=s[0].max,
            s[1].min..=s[1].max,
            s[2].min..=s[2].max,
            s[3].min..=s[3].max,
            s[4].min..=s[4].max,
            s[5].min..=s[5].max,
            s[6].min..=s[6].max,
            s[7].min..=s[7].max,
        )
            .prop_map(|(a, b, c, d, e, f, g, h)| [a, b, c, d, e, f, g, h])
    }

    proptest! {
        #[test]
        fn every_in_range_record_validates(v in in_range()) {
            prop_assert!(HousingFeatures::from_vector(v).validate().is_ok());
        }

        #[test]
        fn pushing_one_field_out_of_range_names_it(v in in_range(), idx in 0usize..N_FEATURES, over in 0.001f64..100.0) {
            let mut v = v;
            v[idx] = FEATURE_SPECS[idx].max + over;
            let err = HousingFeatures::from_vector(v).validate().unwrap_err();
            prop_assert_eq!(err.field.as_str(), FEATURE_SPECS[idx].name);
        }
    }
}
