// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Word extraction for the frequency driver.
//!
//! Unicode letters accumulate into the current word; a hyphen survives only
//! when the characters around it in the raw text are both letters; any
//! Unicode whitespace ends the current word. Every other character is
//! skipped without ending the word, so `don't` comes out as `dont`.
//! Finished words are lowercased before they are handed out.

/// Splits one chunk of text into normalized words.
///
/// # Examples
///
/// ```
/// use quadmap::words::words;
///
/// assert_eq!(vec!["well-known", "dash", "trailing"], words("well-known -dash trailing-"));
/// assert_eq!(vec!["coração"], words("CORAÇÃO!"));
/// ```
#[must_use]
pub fn words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphabetic() {
            current.push(c);
        } else if c == '-'
            && i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_alphabetic()
            && chars[i + 1].is_alphabetic()
        {
            current.push(c);
        } else if c.is_whitespace() && !current.is_empty() {
            out.push(current.to_lowercase());
            current.clear();
        }
    }

    if !current.is_empty() {
        out.push(current.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::words;
    use test_log::test;

    #[test]
    fn words_split_on_whitespace() {
        assert_eq!(vec!["the", "cat", "and", "the", "dog"], words("the cat and the dog"));
    }

    #[test]
    fn words_lowercase_unicode() {
        assert_eq!(vec!["maçã", "étude"], words("MAÇÃ Étude"));
    }

    #[test]
    fn words_keep_internal_hyphens_only() {
        assert_eq!(
            vec!["well-known", "dash", "trailing"],
            words("well-known -dash trailing-"),
        );
        assert_eq!(vec!["ab"], words("a--b"));
    }

    #[test]
    fn words_skip_digits_and_punctuation() {
        assert_eq!(vec!["dont", "stop", "me"], words("don't stop42 me!!!"));
    }

    #[test]
    fn words_flush_on_tabs_and_newlines() {
        assert_eq!(vec!["one", "two", "three"], words("one\ttwo\nthree"));
    }

    #[test]
    fn words_empty_input() {
        assert!(words("").is_empty());
        assert!(words("  \t\n ").is_empty());
        assert!(words("123 !!! --").is_empty());
    }
}
