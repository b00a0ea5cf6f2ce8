//! Fragment merge engine
//!
//! Folds a precedence chain of fragments into one effective fragment:
//! - The last (highest-precedence) fragment seeds the result
//! - Earlier fragments are folded in backwards, filling only what is missing
//!
//! Field behaviour is decided by the field's type through [`Merge`]:
//! - `Option<T>`: absent adopts the donor, present recurses into `T`
//! - Scalars: the present value is kept
//! - [`ReplaceableList`]: append missing donor items unless `replace` is set
//! - [`JobSet`]: upsert by job name, ambiguous names are an error
//! - `BTreeMap`: donor keys fill gaps, existing keys are never overwritten
//! - [`QueryList`]: structurally equal queries share one entry
//!
//! [`ReplaceableList`]: scheduler_schema::ReplaceableList
//! [`JobSet`]: scheduler_schema::JobSet
//! [`QueryList`]: scheduler_schema::QueryList

mod fragment;
mod rules;

pub use rules::fold_query;

use std::collections::BTreeMap;

use scheduler_schema::{Fragment, Job, JobSet};
use thiserror::Error;

/// Merge failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("ambiguous merge at '{path}': {count} jobs named '{name}' at the same precedence")]
    AmbiguousJob {
        path: String,
        name: String,
        count: usize,
    },
}

impl MergeError {
    /// Prefix the error location with the enclosing field name.
    pub(crate) fn within(self, field: &str) -> Self {
        match self {
            MergeError::AmbiguousJob { path, name, count } => MergeError::AmbiguousJob {
                path: if path.is_empty() {
                    field.to_string()
                } else {
                    format!("{}.{}", field, path)
                },
                name,
                count,
            },
        }
    }
}

/// Fill in whatever `self` is missing from a lower-precedence `donor`.
pub trait Merge {
    fn merge_from(&mut self, donor: &Self) -> Result<(), MergeError>;
}

/// Fold a precedence chain (lowest first) into one effective fragment.
///
/// An empty chain yields an empty fragment.
pub fn build(chain: &[Fragment]) -> Result<Fragment, MergeError> {
    let Some((seed, donors)) = chain.split_last() else {
        return Ok(Fragment::default());
    };

    let mut effective = seed.clone();
    for donor in donors.iter().rev() {
        effective.merge_from(donor)?;
    }
    Ok(effective)
}

/// Fold fragments that share one precedence level (lowest first).
///
/// Peers are folded like a chain, except that a job name defined with
/// different content by two peers is an [`MergeError::AmbiguousJob`].
pub fn build_peers(peers: &[Fragment]) -> Result<Fragment, MergeError> {
    let sections: [(&str, fn(&Fragment) -> Option<&JobSet>); 3] = [
        ("presubmits", |f| f.presubmits.as_ref()),
        ("postsubmits", |f| f.postsubmits.as_ref()),
        ("periodics", |f| f.periodics.as_ref()),
    ];

    for (section, jobs_of) in sections {
        let mut defined: BTreeMap<&str, Vec<&Job>> = BTreeMap::new();
        for set in peers.iter().filter_map(jobs_of) {
            for job in &set.items {
                defined.entry(job.name.as_str()).or_default().push(job);
            }
        }
        for (name, versions) in defined {
            if versions.iter().any(|job| *job != versions[0]) {
                return Err(MergeError::AmbiguousJob {
                    path: section.to_string(),
                    name: name.to_string(),
                    count: versions.len(),
                });
            }
        }
    }

    build(peers)
}
