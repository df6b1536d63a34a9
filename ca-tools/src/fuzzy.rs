//! Ratcliff/Obershelp string similarity for matching loose filename hints.

/// Similarity in `[0, 1]`: twice the matched character count over the total length.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_match(a, b);
    if size == 0 {
        return 0;
    }
    size + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + size..], &b[j + size..])
}

/// Longest common substring, earliest in `a` then earliest in `b` on ties.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let k = prev[j] + 1;
                cur[j + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        prev = cur;
    }
    best
}

/// Best candidate scoring at least `cutoff`. Equal scores resolve to the
/// lexicographically greater candidate.
pub fn close_match<'a, I>(word: &str, candidates: I, cutoff: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(f64, &'a str)> = None;
    for candidate in candidates {
        let score = ratio(word, candidate);
        if score < cutoff {
            continue;
        }
        let better = match best {
            None => true,
            Some((s, c)) => score > s || (score == s && candidate > c),
        };
        if better {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_matches_reference_values() {
        assert_eq!(ratio("abcd", "bcde"), 0.75);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("leave", "leave"), 1.0);
        // "abxcd" vs "abcd": blocks "ab" + "cd"
        assert!((ratio("abxcd", "abcd") - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn close_match_applies_cutoff() {
        let names = ["leave_policy.pdf", "travel_policy.pdf", "code_of_conduct.pdf"];
        assert_eq!(
            close_match("leave policy", names.iter().copied(), 0.5),
            Some("leave_policy.pdf")
        );
        assert_eq!(close_match("zzz", names.iter().copied(), 0.5), None);
    }

    #[test]
    fn close_match_breaks_ties_toward_greater_candidate() {
        assert_eq!(close_match("ab", ["ac", "ad"], 0.1), Some("ad"));
    }
}
