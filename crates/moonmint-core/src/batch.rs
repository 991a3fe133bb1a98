//! Parallel batch generation
//!
//! Generation is a pure function of template and parameters, so a batch is a
//! rayon map over seeds. Results come back in seed order regardless of which
//! worker produced them.

use crate::error::Result;
use crate::mutation::{generate, GenerationParams, GenerationResult};
use crate::template::Template;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Seeds `"{prefix}-0"` through `"{prefix}-{count - 1}"`
pub fn seed_range(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}

/// Generate one variant per seed. `base` supplies every parameter except the
/// seed.
pub fn generate_batch(
    template: &Template,
    seeds: &[String],
    base: &GenerationParams,
) -> Vec<Result<GenerationResult>> {
    tracing::debug!(template = %template.id, count = seeds.len(), "batch generation");

    seeds
        .par_iter()
        .map(|seed| {
            let params = GenerationParams {
                seed: seed.clone(),
                ..base.clone()
            };
            generate(template, &params)
        })
        .collect()
}

/// How many variants in a batch share their art with another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionReport {
    pub total: usize,
    pub unique: usize,
    /// Variants whose art already appeared earlier in the batch
    pub duplicates: usize,
    /// `duplicates / total` in percent
    pub collision_rate: f64,
}

impl CollisionReport {
    /// Tally successful results; errors are ignored.
    pub fn from_results(results: &[Result<GenerationResult>]) -> Self {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for result in results.iter().flatten() {
            *seen.entry(result.art.as_str()).or_default() += 1;
        }

        let total: usize = seen.values().sum();
        let unique = seen.len();
        let duplicates = total - unique;
        let collision_rate = if total == 0 {
            0.0
        } else {
            duplicates as f64 * 100.0 / total as f64
        };

        Self {
            total,
            unique,
            duplicates,
            collision_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BuiltinCatalog, TemplateSource};
    use crate::error::CoreError;
    use crate::mutation::VariationLevel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seed_range() {
        assert_eq!(seed_range("mint", 3), vec!["mint-0", "mint-1", "mint-2"]);
        assert!(seed_range("mint", 0).is_empty());
    }

    #[test]
    fn test_batch_matches_sequential() {
        let template = BuiltinCatalog.load("crescent").unwrap();
        let seeds = seed_range("batch", 12);
        let base = GenerationParams::new("", "crescent").with_variation(VariationLevel::Dramatic);

        let results = generate_batch(&template, &seeds, &base);
        assert_eq!(results.len(), seeds.len());
        for (seed, result) in seeds.iter().zip(&results) {
            let expected = generate(&template, &GenerationParams {
                seed: seed.clone(),
                ..base.clone()
            })
            .unwrap();
            assert_eq!(result.as_ref().unwrap(), &expected);
        }
    }

    #[test]
    fn test_batch_propagates_errors() {
        let template = BuiltinCatalog.load("moon").unwrap();
        let base = GenerationParams::new("", "moon").with_complexity(11);
        let results = generate_batch(&template, &seed_range("bad", 2), &base);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(CoreError::InvalidParameter { .. }))));
        assert_eq!(CollisionReport::from_results(&results).total, 0);
    }

    #[test]
    fn test_collision_report_counts() {
        let template = BuiltinCatalog.load("moon").unwrap();
        let base = GenerationParams::new("same", "moon");
        // identical seeds always collide
        let seeds = vec!["same".to_string(); 4];
        let report = CollisionReport::from_results(&generate_batch(&template, &seeds, &base));
        assert_eq!(report.total, 4);
        assert_eq!(report.unique, 1);
        assert_eq!(report.duplicates, 3);
        assert_eq!(report.collision_rate, 75.0);
    }

    #[test]
    fn test_empty_report() {
        let report = CollisionReport::from_results(&[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.collision_rate, 0.0);
    }
}
