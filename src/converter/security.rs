//! Blocked-substring screening for extracted commands.

/// Check a command's raw text against the configured blocklist. Returns
/// the first offending pattern, or None when the command is allowed.
pub fn blocked_pattern<'a>(command: &str, blocked_patterns: &'a [String]) -> Option<&'a str> {
    blocked_patterns
        .iter()
        .find(|pattern| command.contains(pattern.as_str()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> Vec<String> {
        vec!["rm -rf /".to_string(), "mkfs".to_string()]
    }

    #[test]
    fn safe_command_passes() {
        assert_eq!(blocked_pattern("kubectl get pods", &patterns()), None);
    }

    #[test]
    fn dangerous_command_names_the_pattern() {
        assert_eq!(
            blocked_pattern("sudo rm -rf / --no-preserve-root", &patterns()),
            Some("rm -rf /")
        );
    }

    #[test]
    fn substring_match_anywhere_in_text() {
        assert_eq!(
            blocked_pattern("echo setup && mkfs.ext4 /dev/sdb1", &patterns()),
            Some("mkfs")
        );
    }

    #[test]
    fn first_matching_pattern_wins() {
        let both = vec!["mkfs".to_string(), "ext4".to_string()];
        assert_eq!(blocked_pattern("mkfs.ext4", &both), Some("mkfs"));
    }

    #[test]
    fn empty_blocklist_allows_everything() {
        assert_eq!(blocked_pattern("rm -rf /", &[]), None);
    }
}
