/// Split a document into passages.
///
/// Documents with depth-2 or depth-3 heading lines are split at those
/// boundaries; the heading text (markers stripped) becomes the first line
/// of its chunk, and any content before the first heading forms its own
/// chunk. Documents without such headings fall back to blank-line
/// paragraph splitting. Empty chunks are discarded.
pub fn chunk_document(content: &str) -> Vec<String> {
    let has_headings = content.lines().any(is_heading);
    if !has_headings {
        return content
            .split("\n\n")
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if is_heading(line) {
            flush(&mut current, &mut chunks);
            current.push(line.trim_start_matches('#').trim());
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut chunks);

    chunks
}

fn flush(lines: &mut Vec<&str>, chunks: &mut Vec<String>) {
    let text = lines.join("\n").trim().to_string();
    if !text.is_empty() {
        chunks.push(text);
    }
    lines.clear();
}

fn is_heading(line: &str) -> bool {
    line.starts_with("## ") || line.starts_with("### ")
}
