pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Normalizes raw model output so every non-blank line becomes its own paragraph,
/// separated by exactly one blank line.
///
/// Idempotent. Whitespace-only input normalizes to an empty string. Trailing
/// whitespace, including any run of carriage returns, is dropped from every line.
pub fn format(raw: &str) -> String {
    raw.trim()
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR)
}

/// Paragraphs of normalized content, in order, for rendering.
///
/// Never yields empty strings, so content-less replies render nothing.
pub fn paragraphs(content: &str) -> impl Iterator<Item = &str> {
    content
        .split(PARAGRAPH_SEPARATOR)
        .filter(|paragraph| !paragraph.trim().is_empty())
}
