//! Splitting normalized text into numbered chunks that fit the channel limit.
//!
//! All lengths are in characters, not bytes.

use docsnap_core::MessageChunk;
use tracing::debug;

/// Sent when there is nothing to say.
pub const EMPTY_REPLY: &str = "No content available";

const PARAGRAPH_SEP: &str = "\n\n";

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn part_marker(index: usize, total: usize) -> String {
    format!("Part {index}/{total}\n\n")
}

fn digits(n: usize) -> usize {
    n.to_string().len()
}

/// Greedy accumulator: pieces are appended to the current chunk until the
/// next one would overflow `budget`.
struct ChunkBuilder {
    budget: usize,
    chunks: Vec<String>,
    current: String,
    current_len: usize,
}

impl ChunkBuilder {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            chunks: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    fn push(&mut self, piece: &str, separator: &str) {
        let piece_len = char_len(piece);
        if self.current.is_empty() {
            self.current.push_str(piece);
            self.current_len = piece_len;
            return;
        }
        if self.current_len + char_len(separator) + piece_len <= self.budget {
            self.current.push_str(separator);
            self.current.push_str(piece);
            self.current_len += char_len(separator) + piece_len;
        } else {
            self.flush();
            self.current.push_str(piece);
            self.current_len = piece_len;
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
            self.current_len = 0;
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

/// `1.` at the start of a line numbers a list item rather than ending a sentence.
fn is_list_ordinal(line_so_far: &str) -> bool {
    let head = line_so_far.trim_start();
    !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit())
}

/// Split on `.`, `!` or `?` followed by whitespace. Each sentence comes with
/// the whitespace that preceded it, so line breaks survive rejoining.
fn sentences(paragraph: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut gap_start = 0;
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?')
            || !chars.peek().is_some_and(|(_, next)| next.is_whitespace())
        {
            continue;
        }
        let line_start = paragraph[start..i].rfind('\n').map_or(start, |nl| start + nl + 1);
        if c == '.' && is_list_ordinal(&paragraph[line_start..i]) {
            continue;
        }
        let end = i + c.len_utf8();
        out.push((&paragraph[gap_start..start], &paragraph[start..end]));
        while chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            chars.next();
        }
        gap_start = end;
        start = chars.peek().map_or(paragraph.len(), |(j, _)| *j);
    }
    if start < paragraph.len() {
        out.push((&paragraph[gap_start..start], &paragraph[start..]));
    }
    out
}

/// Greedy paragraph packing with sentence fallback.
fn pack(text: &str, budget: usize) -> Vec<String> {
    let mut builder = ChunkBuilder::new(budget);
    for paragraph in text.split(PARAGRAPH_SEP).map(str::trim).filter(|p| !p.is_empty()) {
        if char_len(paragraph) <= budget {
            builder.push(paragraph, PARAGRAPH_SEP);
            continue;
        }
        // Oversized paragraph: packed sentence by sentence into the running
        // chunk. A single sentence over budget goes out whole.
        for (n, (gap, sentence)) in sentences(paragraph).into_iter().enumerate() {
            let separator = if n == 0 { PARAGRAPH_SEP } else { gap };
            builder.push(sentence, separator);
        }
    }
    builder.finish()
}

/// Split `text` into chunks of at most `max_len` characters.
///
/// Text that fits is returned as a single unmarked chunk. Otherwise every chunk
/// starts with `Part i/N` and a blank line, and the marker counts against
/// `max_len`. Empty text yields one [`EMPTY_REPLY`] chunk.
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<MessageChunk> {
    let text = text.trim();
    if text.is_empty() {
        return vec![MessageChunk::new(0, EMPTY_REPLY)];
    }
    if char_len(text) <= max_len {
        return vec![MessageChunk::new(0, text)];
    }

    // The marker width depends on the chunk count, so pack until the count's
    // digit width stops growing.
    let mut assumed_total = 2;
    let mut pieces = Vec::new();
    for _ in 0..8 {
        let reserve = char_len(&part_marker(assumed_total, assumed_total));
        let budget = max_len.saturating_sub(reserve).max(1);
        pieces = pack(text, budget);
        if digits(pieces.len()) <= digits(assumed_total) {
            break;
        }
        assumed_total = pieces.len();
    }

    let total = pieces.len();
    debug!(total, max_len, chars = char_len(text), "split reply into chunks");
    if total == 1 {
        return pieces.into_iter().map(|piece| MessageChunk::new(0, piece)).collect();
    }
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| MessageChunk::new(i, format!("{}{piece}", part_marker(i + 1, total))))
        .collect()
}
