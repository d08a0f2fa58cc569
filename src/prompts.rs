/// Popular example questions offered on the welcome screen, in display order.
pub const EXAMPLE_PROMPTS: [&str; 6] = [
    "React useState example",
    "Python list comprehension example",
    "What is cloud computing?",
    "JavaScript async/await example",
    "Explain Docker containers",
    "React useEffect example",
];

/// Look up an example by its 1-based position
pub fn example(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|index| EXAMPLE_PROMPTS.get(index))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_is_one_based() {
        assert_eq!(example(1), Some("React useState example"));
        assert_eq!(example(6), Some("React useEffect example"));
        assert_eq!(example(0), None);
        assert_eq!(example(7), None);
    }
}
