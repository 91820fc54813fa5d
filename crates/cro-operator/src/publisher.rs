//! Gauge publisher
//!
//! Writes returned samples onto the matching catalog gauge. Last write wins;
//! series that no pass refreshes keep their previous value.

use crate::catalog::MetricCatalog;
use crate::sample::GenericSample;

/// Outcome of one publish call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    pub published: usize,
    pub dropped: usize,
}

/// Set each sample's series on its catalog gauge. Samples whose name has no
/// catalog entry are dropped.
pub fn publish(catalog: &MetricCatalog, samples: &[GenericSample]) -> PublishStats {
    let mut stats = PublishStats::default();

    for sample in samples {
        match catalog.find(&sample.name) {
            Some(definition) => {
                definition
                    .gauge
                    .with_label_values(&sample.labels.values())
                    .set(sample.value);
                stats.published += 1;
            }
            None => stats.dropped += 1,
        }
    }

    stats
}
