//! Separator-hierarchy splitting and overlap-aware merging.
//!
//! Lengths are measured in characters, not bytes.

/// Paragraph, line, sentence punctuation, word, character.
pub const DEFAULT_SEPARATORS: [&str; 7] = ["\n\n", "\n", ".", "!", "?", " ", ""];

/// Split `text` with the first separator in `separators` that occurs in it,
/// recursing into pieces that are still too long with the finer separators.
pub(crate) fn split_recursive(
    text: &str,
    separators: &[String],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let mut separator = separators.last().map(String::as_str).unwrap_or("");
    let mut finer: &[String] = &[];
    for (i, candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            separator = "";
            break;
        }
        if text.contains(candidate.as_str()) {
            separator = candidate;
            finer = &separators[i + 1..];
            break;
        }
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut short: Vec<&str> = Vec::new();

    for piece in split_keep_start(text, separator) {
        if char_len(piece) < chunk_size {
            short.push(piece);
            continue;
        }

        if !short.is_empty() {
            chunks.extend(merge_pieces(&short, chunk_size, chunk_overlap));
            short.clear();
        }
        if finer.is_empty() {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        } else {
            chunks.extend(split_recursive(piece, finer, chunk_size, chunk_overlap));
        }
    }

    if !short.is_empty() {
        chunks.extend(merge_pieces(&short, chunk_size, chunk_overlap));
    }

    chunks
}

/// Split on `separator`, keeping it at the start of the following piece.
/// An empty separator splits into single characters. Empty pieces are dropped.
fn split_keep_start<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > last {
            pieces.push(&text[last..idx]);
        }
        last = idx;
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }
    pieces
}

/// Greedily join consecutive pieces into chunks of at most `chunk_size`
/// characters, carrying up to `chunk_overlap` characters into the next chunk.
fn merge_pieces(pieces: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut window: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
    let mut total = 0usize;

    for &piece in pieces {
        let len = char_len(piece);

        if total + len > chunk_size {
            if total > chunk_size {
                tracing::warn!(total, chunk_size, "created a chunk longer than the target size");
            }
            if !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(dropped) => total -= char_len(dropped),
                        None => break,
                    }
                }
            }
        }

        window.push_back(piece);
        total += len;
    }

    push_joined(&mut chunks, &window);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &std::collections::VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
