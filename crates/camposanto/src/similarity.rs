//! String similarity used for free-text cemetery matching.
//!
//! Cemetery names are typed by hand in the filter box, so exact comparison is
//! too strict. A candidate matches when one normalised string contains the
//! other, or when the two are within [`CEMETERY_NAME_MAX_EDITS`] edits.

/// Largest Levenshtein distance still accepted as a typo of a cemetery name.
pub const CEMETERY_NAME_MAX_EDITS: usize = 3;

/// Levenshtein distance between `a` and `b`, counted in `char`s.
///
/// Classic dynamic programming over the full `(|a|+1) x (|b|+1)` table.
/// Comparison is case-sensitive; callers normalise first when they need to.
///
/// ```rust
/// use camposanto::edit_distance;
///
/// assert_eq!(edit_distance("kitten", "sitting"), 3);
/// assert_eq!(edit_distance("", "abc"), 3);
/// ```
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in table[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution = usize::from(a[i - 1] != b[j - 1]);
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + substitution);
        }
    }
    table[a.len()][b.len()]
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Whether a resolved cemetery name matches what the user typed.
///
/// `None` and blank candidates never match. Both sides are trimmed and
/// lowercased before comparing.
pub fn matches_cemetery_name(candidate: Option<&str>, query: &str) -> bool {
    let Some(candidate) = candidate.map(normalize).filter(|c| !c.is_empty()) else {
        return false;
    };
    let query = normalize(query);

    candidate.contains(&query)
        || query.contains(&candidate)
        || edit_distance(&candidate, &query) <= CEMETERY_NAME_MAX_EDITS
}
