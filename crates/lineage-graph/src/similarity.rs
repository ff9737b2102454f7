//! String heuristics behind title disambiguation.
//!
//! The mismatch check is deliberately coarse: after normalization, a
//! resolved title only counts as a match when one string contains the other.

/// Case-fold, trim, collapse whitespace and drop a trailing qualifier such as
/// `" (language)"` or `", Ireland"`.
pub fn normalize(text: &str) -> String {
    let mut text = text.trim().to_lowercase();

    if text.ends_with(')') {
        if let Some(open) = text.rfind('(') {
            if open > 0 {
                text.truncate(open);
            }
        }
    }
    if let Some(comma) = text.find(',') {
        if comma > 0 {
            text.truncate(comma);
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when neither normalized string contains the other
pub fn is_mismatch(query: &str, title: &str) -> bool {
    let query = normalize(query);
    let title = normalize(title);
    if query.is_empty() || title.is_empty() {
        return true;
    }
    !(query.contains(&title) || title.contains(&query))
}

/// Similarity in `[0, 1]` from the edit distance of the normalized strings
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_qualifiers() {
        assert_eq!(normalize("  Fingallian (language) "), "fingallian");
        assert_eq!(normalize("Dublin, Ireland"), "dublin");
        assert_eq!(normalize("Albert   Einstein"), "albert einstein");
        assert_eq!(normalize("(untitled)"), "(untitled)");
    }

    #[test]
    fn test_mismatch_is_containment_based() {
        assert!(!is_mismatch("Einstein", "Albert Einstein"));
        assert!(!is_mismatch("Latin (language)", "latin"));
        assert!(is_mismatch("Fingalian", "Fingallian"));
        assert!(!is_mismatch("Fingal", "Fingallian"));
        assert!(!is_mismatch("Mercury", "Freddie Mercury (singer)"));
        assert!(is_mismatch("", "Anything"));
    }

    #[test]
    fn test_similarity_ranks_closer_strings_higher() {
        assert_eq!(similarity("Lion", "lion"), 1.0);
        assert!(similarity("Fingalian", "Fingallian") > similarity("Fingalian", "Fingal"));
        assert!(similarity("Fingalian", "Fingal") > similarity("Fingalian", "Portuguese"));
    }

    #[test]
    fn test_levenshtein() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("same"), &chars("same")), 0);
    }
}
