/// Splits `text` into windows of at most `chunk_size` characters, each overlapping the
/// previous one by roughly `chunk_overlap` characters. Cuts prefer whitespace so words are
/// not split unless a single word is longer than the window.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars = text.trim().chars().collect::<Vec<_>>();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let overlap = chunk_overlap.min(chunk_size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end == chars.len() || chars[hard_end].is_whitespace() {
            hard_end
        } else {
            chars[start..hard_end]
                .iter()
                .rposition(|ch| ch.is_whitespace())
                .filter(|offset| *offset > 0)
                .map(|offset| start + offset)
                .unwrap_or(hard_end)
        };

        let chunk = chars[start..end].iter().collect::<String>();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end == chars.len() {
            break;
        }

        let mut next = end.saturating_sub(overlap).max(start + 1);
        while next < end && !chars[next - 1].is_whitespace() {
            next += 1;
        }
        start = next;
    }

    chunks
}
