//! Answer formatting
//!
//! Puts each sentence of an answer on its own paragraph and normalizes blank
//! lines. Fenced code blocks are passed through apart from trailing
//! whitespace. Formatting an already formatted text leaves it unchanged.

const FENCE: &str = "```";

/// Normalize whitespace and paragraphing of a model answer
pub fn format_response(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.split('\n').map(str::trim_end) {
        if line.trim_start().starts_with(FENCE) {
            in_fence = !in_fence;
            out.push(line);
            continue;
        }

        if in_fence {
            out.push(line);
            continue;
        }

        if line.is_empty() {
            push_blank(&mut out);
            continue;
        }

        for (i, sentence) in split_sentences(line).into_iter().enumerate() {
            if i > 0 {
                push_blank(&mut out);
            }
            out.push(sentence);
        }
    }

    while out.last().is_some_and(|line| line.is_empty()) {
        out.pop();
    }

    out.join("\n")
}

fn push_blank(out: &mut Vec<&str>) {
    if out.last().is_some_and(|line| !line.is_empty()) {
        out.push("");
    }
}

fn split_sentences(line: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut rest = line;

    while let Some((end, next)) = find_boundary(rest) {
        sentences.push(&rest[..end]);
        rest = &rest[next..];
    }
    sentences.push(rest);
    sentences
}

/// Byte offsets of the end of the first sentence and the start of the next
fn find_boundary(text: &str) -> Option<(usize, usize)> {
    for (i, _) in text.match_indices(". ") {
        if i == 0 {
            continue;
        }

        let before = &text[..i];
        if before.ends_with(char::is_whitespace) {
            continue;
        }

        // "1. First item" is a list marker, not a sentence
        let sentence = before.trim_start();
        if sentence.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let remainder = text[i + 1..].trim_start();
        if remainder.is_empty() || remainder.starts_with('`') {
            continue;
        }

        return Some((i + 1, text.len() - remainder.len()));
    }
    None
}
