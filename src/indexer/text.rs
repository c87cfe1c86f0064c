use std::sync::LazyLock;

use regex::Regex;

/// A run of non-terminator characters closed by `.`, `!` or `?` (or by the
/// end of the text, so a trailing fragment is not lost).
static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").unwrap());

/// Splits text into trimmed, non-empty sentences.
///
/// Text without any sentence content (e.g. only punctuation) is returned as
/// a single sentence.
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    let sentences: Vec<&str> = SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![trimmed];
    }

    sentences
}

/// Greedily packs sentences into chunks of at most `chunk_size` characters
/// (using `char` count).
///
/// When the next sentence does not fit, the current chunk is closed and the
/// new one starts with the last `overlap` characters of the chunk just
/// closed, minus any leading whitespace, so the carried text can be shorter
/// than `overlap`. Sentences are never cut: one longer than `chunk_size`
/// becomes an oversized chunk of its own.
pub fn split_into_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_into_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len > 0 && current_len + 1 + sentence_len > chunk_size {
            let finished = std::mem::take(&mut current);
            current_len = 0;

            let seed = tail_chars(&finished, overlap).trim_start();
            if !seed.is_empty() {
                current.push_str(seed);
                current_len = seed.chars().count();
            }
            chunks.push(finished);
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += sentence_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}

/// The last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    s.char_indices()
        .nth(count - n)
        .map_or(s, |(idx, _)| &s[idx..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_into_sentences("Hello world. How are you? Great!  Bye");
        assert_eq!(sentences, vec!["Hello world.", "How are you?", "Great!", "Bye"]);
    }

    #[test]
    fn test_split_sentences_without_terminators() {
        assert_eq!(split_into_sentences("no punctuation at all"), vec![
            "no punctuation at all"
        ]);
        assert_eq!(split_into_sentences("..."), vec!["..."]);
        assert!(split_into_sentences("  ").is_empty());
    }

    #[test]
    fn test_split_sentences_keeps_runs_of_terminators() {
        let sentences = split_into_sentences("Really?! Yes... ok.");
        assert_eq!(sentences, vec!["Really?!", "Yes...", "ok."]);
    }

    #[test]
    fn test_split_short_text() {
        let chunks = split_into_chunks("One. Two. Three.", 1000, 200);
        assert_eq!(chunks, vec!["One. Two. Three."]);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_into_chunks("", 1000, 200).is_empty());
        assert!(split_into_chunks(" \n\t ", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunks_carry_overlap() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
        let chunks = split_into_chunks(text, 20, 6);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Alpha beta gamma.");
        // Seeded with the last 6 characters of the previous chunk
        assert_eq!(chunks[1], "gamma. Delta epsilon zeta.");
        assert_eq!(chunks[2], "zeta. Eta theta iota.");
    }

    #[test]
    fn test_overlap_tail_drops_leading_whitespace() {
        // The last 7 characters of the first chunk are " gamma."
        let text = "Alpha beta gamma. Delta epsilon zeta.";
        let chunks = split_into_chunks(text, 20, 7);
        assert_eq!(chunks, vec!["Alpha beta gamma.", "gamma. Delta epsilon zeta."]);

        let text = "One two three. Four five six. Seven eight nine. Ten eleven.".repeat(3);
        for overlap in 0..12 {
            let chunks = split_into_chunks(&text, 30, overlap);
            for pair in chunks.windows(2) {
                let next = &pair[1];
                assert!(!next.starts_with(char::is_whitespace), "{next:?}");
                assert!(!next.contains("  "), "{next:?}");

                let seed = tail_chars(&pair[0], overlap).trim_start();
                assert!(seed.chars().count() <= overlap);
                assert!(next.starts_with(seed), "{next:?} should start with {seed:?}");
            }
        }
    }

    #[test]
    fn test_no_overlap() {
        let text = "Alpha beta gamma. Delta epsilon zeta.";
        let chunks = split_into_chunks(text, 20, 0);
        assert_eq!(chunks, vec!["Alpha beta gamma.", "Delta epsilon zeta."]);
    }

    #[test]
    fn test_oversized_sentence_is_kept_whole() {
        let long = format!("{}.", "word ".repeat(50).trim());
        let text = format!("{long} Short one.");
        let chunks = split_into_chunks(&text, 40, 0);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], long);
        assert_eq!(chunks[1], "Short one.");
    }

    #[test]
    fn test_sentences_never_split() {
        let text = "The quick brown fox jumps. Over the lazy dog! Does it really? \
                    Nobody knows for sure. But the dog seems fine with it."
            .repeat(4);
        let chunks = split_into_chunks(&text, 50, 10);

        assert!(chunks.len() > 1);
        for sentence in split_into_sentences(&text) {
            assert!(
                chunks.iter().any(|c| c.contains(sentence)),
                "sentence {sentence:?} was split across chunks"
            );
        }
    }

    #[test]
    fn test_multibyte_overlap() {
        let text = "日本語のテストです. 次の文もテストです.";
        let chunks = split_into_chunks(text, 12, 3);
        assert_eq!(chunks, vec!["日本語のテストです.", "です. 次の文もテストです."]);
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 3), "ab");
        assert_eq!(tail_chars("ab", 0), "");
        assert_eq!(tail_chars("日本語", 2), "本語");
    }
}
