//! Logical page derivation

/// Derive the logical page identifier from a URL path.
///
/// Quiz pages (`/quiz/page/<digits>`) map to their page number; the root
/// path maps to "home"; anything else is the path minus its leading slash.
/// Pure and re-evaluated per call, so it tracks reload-free navigation.
pub fn logical_page(path: &str) -> String {
    if let Some(idx) = path.find("/quiz/page/") {
        let digits: String = path[idx + "/quiz/page/".len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        return if digits.is_empty() {
            "home".to_string()
        } else {
            digits
        };
    }

    if path == "/" {
        "home".to_string()
    } else {
        path.strip_prefix('/').unwrap_or(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_page_number() {
        assert_eq!(logical_page("/quiz/page/42"), "42");
        assert_eq!(logical_page("/quiz/page/1"), "1");
    }

    #[test]
    fn test_root_is_home() {
        assert_eq!(logical_page("/"), "home");
    }

    #[test]
    fn test_plain_path_strips_leading_slash() {
        assert_eq!(logical_page("/leaderboard"), "leaderboard");
    }

    #[test]
    fn test_quiz_page_without_number_is_home() {
        assert_eq!(logical_page("/quiz/page/"), "home");
    }

    #[test]
    fn test_trailing_segment_ignored_after_digits() {
        assert_eq!(logical_page("/quiz/page/7/review"), "7");
    }
}
