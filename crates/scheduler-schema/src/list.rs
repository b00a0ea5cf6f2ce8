//! Override-aware list containers.

use serde::{Deserialize, Serialize};

use crate::job::Job;

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// An ordered list of items plus a `replace` flag.
///
/// When `replace` is set, items contributed by lower-precedence fragments are
/// discarded instead of appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceableList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub replace: bool,
}

impl<T> Default for ReplaceableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            replace: false,
        }
    }
}

impl<T> ReplaceableList<T> {
    /// A list whose items are appended to lower-precedence items.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            replace: false,
        }
    }

    /// A list whose items replace lower-precedence items.
    pub fn replacing(items: Vec<T>) -> Self {
        Self {
            items,
            replace: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> From<Vec<T>> for ReplaceableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

/// An ordered list of named jobs plus a `replace` flag.
///
/// Unlike [`ReplaceableList`], jobs are matched by name when lower-precedence
/// fragments are folded in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSet {
    #[serde(default)]
    pub items: Vec<Job>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub replace: bool,
}

impl JobSet {
    pub fn new(items: Vec<Job>) -> Self {
        Self {
            items,
            replace: false,
        }
    }

    pub fn replacing(items: Vec<Job>) -> Self {
        Self {
            items,
            replace: true,
        }
    }

    /// Jobs with the given name.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Job> + 'a {
        self.items.iter().filter(move |job| job.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|job| job.name.as_str()).collect()
    }
}
