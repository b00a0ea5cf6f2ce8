//! Merge rules for each field category.

use std::collections::BTreeMap;

use scheduler_schema::{JobSet, KeeperQuery, QueryList, ReplaceableList};

use super::{Merge, MergeError};

/// Optional fields: absent adopts the donor wholesale, present recurses.
impl<T: Merge + Clone> Merge for Option<T> {
    fn merge_from(&mut self, donor: &Self) -> Result<(), MergeError> {
        let Some(donor) = donor else {
            return Ok(());
        };
        match self {
            Some(effective) => effective.merge_from(donor),
            None => {
                *self = Some(donor.clone());
                Ok(())
            }
        }
    }
}

/// Scalars are atomic: once set, a lower-precedence value never replaces them.
macro_rules! atomic {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Merge for $ty {
                fn merge_from(&mut self, _donor: &Self) -> Result<(), MergeError> {
                    Ok(())
                }
            }
        )+
    };
}

atomic!(String, bool, u32);

impl<T: PartialEq + Clone> Merge for ReplaceableList<T> {
    fn merge_from(&mut self, donor: &Self) -> Result<(), MergeError> {
        if self.replace {
            return Ok(());
        }
        for item in &donor.items {
            if !self.items.contains(item) {
                self.items.push(item.clone());
            }
        }
        // A replacing donor still cuts off everything below it.
        self.replace = donor.replace;
        Ok(())
    }
}

impl Merge for JobSet {
    fn merge_from(&mut self, donor: &Self) -> Result<(), MergeError> {
        if self.replace {
            return Ok(());
        }
        for job in &donor.items {
            let matches = self.named(&job.name).count();
            match matches {
                0 => self.items.push(job.clone()),
                1 => {}
                count => {
                    return Err(MergeError::AmbiguousJob {
                        path: String::new(),
                        name: job.name.clone(),
                        count,
                    })
                }
            }
        }
        self.replace = donor.replace;
        Ok(())
    }
}

/// First writer wins: keys already present are never overwritten.
impl<K: Ord + Clone, V: Clone> Merge for BTreeMap<K, V> {
    fn merge_from(&mut self, donor: &Self) -> Result<(), MergeError> {
        for (key, value) in donor {
            self.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(())
    }
}

impl Merge for QueryList {
    fn merge_from(&mut self, donor: &Self) -> Result<(), MergeError> {
        for query in &donor.0 {
            fold_query(&mut self.0, query);
        }
        Ok(())
    }
}

/// Add a query to a list, sharing an existing entry with the same search.
///
/// Queries are compared ignoring their repository lists; on a match the new
/// query's repositories are appended to the existing entry.
pub fn fold_query(queries: &mut Vec<KeeperQuery>, query: &KeeperQuery) {
    match queries.iter_mut().find(|q| q.same_search(query)) {
        Some(existing) => {
            for repo in &query.repos {
                if !existing.repos.contains(repo) {
                    existing.repos.push(repo.clone());
                }
            }
        }
        None => queries.push(query.clone()),
    }
}
