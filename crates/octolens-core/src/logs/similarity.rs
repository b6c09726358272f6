//! Edit-distance style similarity on a 0-100 scale.

/// Indel ratio: `round(100 * 2 * lcs / (len(a) + len(b)))`, where `lcs` is the
/// longest common subsequence of the two character sequences.
///
/// Empty input on either side scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let common = lcs_len(&a, &b);
    let total = a.len() + b.len();
    let score = (200.0 * common as f64 / total as f64).round();
    score.clamp(0.0, 100.0) as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    // Single rolling row over `b`.
    let mut row = vec![0_usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(ratio("deploy web app", "deploy web app"), 100);
    }

    #[test]
    fn disjoint_strings_score_0() {
        assert_eq!(ratio("abc", "xyz"), 0);
    }

    #[test]
    fn empty_side_scores_0() {
        assert_eq!(ratio("", "deploy"), 0);
        assert_eq!(ratio("deploy", ""), 0);
    }

    #[test]
    fn near_miss_scores_high() {
        // lcs("deploy", "deploi") = 5 -> 2*5/12
        assert_eq!(ratio("deploy", "deploi"), 83);
        assert!(ratio("run migrations", "run migration") >= 80);
    }

    #[test]
    fn is_symmetric() {
        assert_eq!(ratio("notify slack", "slack notify"), ratio("slack notify", "notify slack"));
    }
}
