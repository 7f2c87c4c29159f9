//! Pipeline feature schemas
//!
//! Column order here is the column order of the trained artifacts.

use super::layout::{FeatureSchema, FeatureSpec, MissingPolicy};

/// Task assignment (binary): missing keys default to 0
pub const ASSIGNMENT_SCHEMA: FeatureSchema = FeatureSchema {
    name: "assignment",
    version: 1,
    missing: MissingPolicy::Lenient,
    features: &[
        FeatureSpec::numeric("storyPriority"),              // 0
        FeatureSpec::numeric("storyBusinessValue"),         // 1
        FeatureSpec::numeric("taskEffort"),                 // 2
        FeatureSpec::numeric("sprintNumber"),               // 3
        FeatureSpec::flag("isBug"),                         // 4
        FeatureSpec::numeric("developerPastTasksCompleted"), // 5
        FeatureSpec::numeric("developerPastDefectsFixed"),  // 6
    ],
};

/// Sprint risk (LOW / MEDIUM / HIGH): every key is mandatory
pub const RISK_SCHEMA: FeatureSchema = FeatureSchema {
    name: "risk",
    version: 1,
    missing: MissingPolicy::Strict,
    features: &[
        FeatureSpec::numeric("committedEffort"),    // 0
        FeatureSpec::numeric("teamCapacity"),       // 1
        FeatureSpec::numeric("historicalVelocity"), // 2
        FeatureSpec::numeric("missedStories"),      // 3
        FeatureSpec::numeric("teamChanges"),        // 4
        FeatureSpec::numeric("bugsOpen"),           // 5
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::layout::Coercion;

    #[test]
    fn test_feature_count() {
        assert_eq!(ASSIGNMENT_SCHEMA.len(), 7);
        assert_eq!(RISK_SCHEMA.len(), 6);
    }

    #[test]
    fn test_assignment_order_is_fixed() {
        let names: Vec<_> = ASSIGNMENT_SCHEMA.names().collect();
        assert_eq!(
            names,
            [
                "storyPriority",
                "storyBusinessValue",
                "taskEffort",
                "sprintNumber",
                "isBug",
                "developerPastTasksCompleted",
                "developerPastDefectsFixed",
            ]
        );
        assert_eq!(ASSIGNMENT_SCHEMA.features[4].coercion, Coercion::Flag);
    }

    #[test]
    fn test_risk_has_no_flags() {
        assert!(RISK_SCHEMA.features.iter().all(|f| f.coercion == Coercion::Numeric));
        assert_eq!(RISK_SCHEMA.index_of("bugsOpen"), Some(5));
    }

    #[test]
    fn test_schemas_hash_differently() {
        assert_ne!(ASSIGNMENT_SCHEMA.layout_hash(), RISK_SCHEMA.layout_hash());
    }
}
