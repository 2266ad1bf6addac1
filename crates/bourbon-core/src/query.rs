//! Free-text search translation.
//!
//! A search such as `"weller sib"` becomes a [`Predicate`] tree that requires
//! every query item to appear in the bottle name, with synonym items widened
//! to any term of their group:
//!
//! ```text
//! (Bottle ~ "single barrel" | Bottle ~ "sib") & Bottle ~ "weller"
//! ```

use std::fmt;

use crate::synonyms;

/// Token extracted from a search string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryItem {
    /// A known synonym term, together with the group it expands to.
    Synonym {
        term: &'static str,
        group: &'static [&'static str],
    },
    /// A plain whitespace-separated word.
    Word(String),
}

impl QueryItem {
    pub fn as_str(&self) -> &str {
        match self {
            QueryItem::Synonym { term, .. } => *term,
            QueryItem::Word(word) => word.as_str(),
        }
    }

    fn to_predicate(&self) -> Predicate {
        match self {
            QueryItem::Synonym { group, .. } => {
                Predicate::AnyOf(group.iter().map(|term| Predicate::contains(term)).collect())
            }
            QueryItem::Word(word) => Predicate::contains(word),
        }
    }
}

/// Boolean filter over a bottle name. Matching is case-insensitive substring
/// containment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every name.
    All,
    /// Name contains the (lower-cased) needle.
    Contains(String),
    AnyOf(Vec<Predicate>),
    AllOf(Vec<Predicate>),
}

impl Predicate {
    pub fn contains(needle: &str) -> Self {
        Predicate::Contains(needle.to_lowercase())
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matches_lowered(&name.to_lowercase())
    }

    fn matches_lowered(&self, name: &str) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Contains(needle) => name.contains(needle.as_str()),
            Predicate::AnyOf(parts) => parts.iter().any(|part| part.matches_lowered(name)),
            Predicate::AllOf(parts) => parts.iter().all(|part| part.matches_lowered(name)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::All => write!(f, "*"),
            Predicate::Contains(needle) => write!(f, "Bottle ~ {needle:?}"),
            Predicate::AnyOf(parts) => {
                write!(f, "(")?;
                write_joined(f, parts, " | ")?;
                write!(f, ")")
            }
            Predicate::AllOf(parts) => write_joined(f, parts, " & "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{part}")?;
    }
    Ok(())
}

/// Result of translating one search string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatedQuery {
    pub items: Vec<QueryItem>,
    pub predicate: Predicate,
}

impl TranslatedQuery {
    pub fn matches(&self, name: &str) -> bool {
        self.predicate.matches(name)
    }
}

/// Translate a free-text search into a predicate over bottle names.
///
/// Synonym terms are pulled out of the search first (longest first, since
/// some contain spaces), then the leftover text is split on whitespace. An
/// empty search translates to [`Predicate::All`].
pub fn translate(search: &str) -> TranslatedQuery {
    let mut working = search.to_lowercase();
    let mut items = Vec::new();

    for term in synonyms::terms_longest_first() {
        if !working.contains(term) {
            continue;
        }
        working = working.replace(term, "");
        if let Some(group) = synonyms::group_for(term) {
            items.push(QueryItem::Synonym { term, group });
        }
    }

    items.extend(
        working
            .split_whitespace()
            .map(|word| QueryItem::Word(word.to_string())),
    );

    let predicate = if items.is_empty() {
        Predicate::All
    } else {
        Predicate::AllOf(items.iter().map(QueryItem::to_predicate).collect())
    };

    TranslatedQuery { items, predicate }
}
