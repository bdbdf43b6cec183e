/// Default chunk size, in characters
pub const MAX_CHUNK_SIZE: usize = 30_000;

/// How far back from a cut point to look for a sentence end
pub const SEARCH_WINDOW: usize = 200;

const SENTENCE_ENDS: [char; 6] = ['。', '.', '！', '？', '!', '?'];

fn is_sentence_end(c: char) -> bool {
    SENTENCE_ENDS.contains(&c)
}

/// Split text into trimmed chunks of at most `max_size` characters, cutting
/// after the nearest sentence end within the search window when there is one.
pub fn split_into_chunks(text: &str, max_size: usize) -> Vec<String> {
    let max_size = max_size.max(1);
    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= max_size {
        return push_trimmed(Vec::new(), text);
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + max_size).min(chars.len());

        if end < chars.len() {
            let search_start = end.saturating_sub(SEARCH_WINDOW).max(start);
            if let Some(pos) = (search_start..end)
                .rev()
                .find(|&i| is_sentence_end(chars[i]))
                .filter(|&pos| pos > start)
            {
                end = pos + 1;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        chunks = push_trimmed(chunks, &chunk);
        start = end;
    }

    chunks
}

fn push_trimmed(mut chunks: Vec<String>, chunk: &str) -> Vec<String> {
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
    chunks
}
