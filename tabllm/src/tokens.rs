//! Token estimation.

/// Estimate the token cost of `text` as its whitespace-separated word count.
///
/// This is a rough proxy, not a model tokenizer: real tokenizers usually
/// produce more tokens than words, so budgets based on it are optimistic.
pub fn estimate(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate() {
        assert_eq!(estimate(""), 0);
        assert_eq!(estimate("   \n\t "), 0);
        assert_eq!(estimate("one"), 1);
        assert_eq!(estimate("Given the salary of 2, what is the square?"), 9);
        assert_eq!(estimate("  leading\tand\ntrailing  "), 3);
    }
}
