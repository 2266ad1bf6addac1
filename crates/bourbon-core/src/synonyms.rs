//! Interchangeable bottle-label terms.
//!
//! Store listings abbreviate the common bourbon designations freely, so a
//! search for "sib" has to find "Single Barrel" and the other way round.

/// Groups of terms that name the same designation. Every term in a group is
/// interchangeable with every other term in that group.
pub const SYNONYM_GROUPS: &[&[&str]] = &[
    &["single barrel", "sib"],
    &["small batch", "smb"],
    &["barrel proof", "bp"],
    &["bottled in bond", "bib"],
    &["full proof", "fp"],
    &["store pick", "sp"],
];

/// Return the group a term belongs to, if any. The lookup is
/// case-insensitive and the returned group includes the term itself.
pub fn group_for(term: &str) -> Option<&'static [&'static str]> {
    let term = term.trim().to_lowercase();
    SYNONYM_GROUPS
        .iter()
        .copied()
        .find(|group| group.iter().any(|candidate| *candidate == term))
}

/// Every known term across all groups, deduplicated and ordered longest
/// first so multi-word terms are detected before anything shorter.
pub fn terms_longest_first() -> Vec<&'static str> {
    let mut terms: Vec<&'static str> = Vec::new();
    for group in SYNONYM_GROUPS {
        for term in group.iter() {
            if !terms.contains(term) {
                terms.push(term);
            }
        }
    }
    // Stable sort keeps declaration order between equal lengths.
    terms.sort_by(|a, b| b.len().cmp(&a.len()));
    terms
}
