//! Tag-based tool filtering.

use std::collections::BTreeSet;

/// Include/exclude tag sets. Empty `include` means "everything not excluded".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Allowed,
    /// One of the tool's tags is excluded. Exclusion wins over inclusion.
    Excluded(String),
    /// `include` is set and none of the tool's tags are in it.
    NotIncluded,
}

impl FilterDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, FilterDecision::Allowed)
    }
}

#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Split CLI-style tag lists. Each entry may hold several tags separated by commas or spaces.
#[must_use]
pub fn parse_tag_list<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|s| {
            s.as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .map(normalize_tag)
                .collect::<Vec<_>>()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn normalized_set<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}

impl TagFilter {
    pub fn new<I, J, S, T>(include: I, exclude: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            include: normalized_set(include),
            exclude: normalized_set(exclude),
        }
    }

    pub fn include(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(String::as_str)
    }

    pub fn exclude(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(String::as_str)
    }

    pub fn decide<I, S>(&self, tags: I) -> FilterDecision
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: Vec<String> = tags.into_iter().map(|t| normalize_tag(t.as_ref())).collect();

        if let Some(hit) = tags.iter().find(|t| self.exclude.contains(*t)) {
            return FilterDecision::Excluded(hit.clone());
        }
        if self.include.is_empty() || tags.iter().any(|t| self.include.contains(t)) {
            FilterDecision::Allowed
        } else {
            FilterDecision::NotIncluded
        }
    }

    pub fn allows<I, S>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.decide(tags).is_allowed()
    }
}
