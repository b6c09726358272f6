//! Candidate selection shared by every resolution tier.

use crate::types::ResourceRef;

/// How a candidate was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    CaseInsensitive,
}

/// Pick the single candidate whose name equals `queried`.
///
/// An exact match wins if it is unique. Otherwise a unique match after trimming
/// and lowercasing both sides wins. Duplicates at either level are not broken
/// by position: the result is `None`.
pub fn select_match<'a>(
    candidates: &'a [ResourceRef],
    queried: &str,
) -> Option<(&'a ResourceRef, MatchKind)> {
    if let Some(found) = unique(candidates.iter().filter(|c| c.name == queried)) {
        return Some((found, MatchKind::Exact));
    }

    let folded = fold(queried);
    unique(candidates.iter().filter(|c| fold(&c.name) == folded))
        .map(|found| (found, MatchKind::CaseInsensitive))
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

fn unique<'a>(mut matches: impl Iterator<Item = &'a ResourceRef>) -> Option<&'a ResourceRef> {
    let first = matches.next()?;
    match matches.next() {
        Some(_) => None,
        None => Some(first),
    }
}
