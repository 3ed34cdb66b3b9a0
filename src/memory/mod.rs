pub mod forget;
pub mod maintenance;
pub mod search;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;

/// Truncate content to at most `max_chars` bytes on a char boundary, appending "..." if cut.
pub fn truncate(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        content.to_string()
    } else {
        let end = content
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_chars)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &content[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("hello world", 5), "hello...");
        // multi-byte chars are never split
        assert_eq!(truncate("héllo", 2), "h...");
    }
}
