/// Split text into overlapping character windows.
///
/// Boundaries are positional, not semantic: windows ignore sentence and
/// paragraph breaks, and every window after the first repeats exactly
/// `overlap` characters of its predecessor. Splits always land on UTF-8
/// character boundaries.
pub fn split_chars(text: &str, window: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if window == 0 || overlap >= window || chars.len() <= window {
        return vec![text.to_string()];
    }

    let step = window - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + window).min(chars.len());
        chunks.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Truncate to the first `max_words` whitespace-separated words.
///
/// Returns the (whitespace-normalized) text and whether truncation
/// happened. A hard cap: sentence boundaries are not respected.
pub fn truncate_words(text: &str, max_words: usize) -> (String, bool) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        (words.join(" "), false)
    } else {
        (words[..max_words].join(" "), true)
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
