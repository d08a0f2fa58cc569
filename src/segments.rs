//! Splitting answers into prose and fenced code segments.

const FENCE: &str = "```";

/// A contiguous piece of an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    Code {
        language: Option<String>,
        body: String,
    },
}

/// Whether the text contains at least one fenced code block
pub fn contains_code(text: &str) -> bool {
    text.lines().any(|line| line.trim_start().starts_with(FENCE))
}

/// Split `text` into ordered prose and code segments.
///
/// A fence line opens a code block and the language tag, if any, follows
/// the backticks. An unterminated block runs to the end of the text. Prose
/// segments that are only whitespace are dropped.
pub fn split_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut prose = String::new();
    let mut code: Option<(Option<String>, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if let Some(rest) = trimmed.strip_prefix(FENCE) {
            match code.take() {
                Some((language, lines)) => {
                    segments.push(Segment::Code {
                        language,
                        body: lines.join("\n"),
                    });
                }
                None => {
                    flush_prose(&mut segments, &mut prose);
                    let tag = rest.trim();
                    let language = (!tag.is_empty()).then(|| tag.to_string());
                    code = Some((language, Vec::new()));
                }
            }
            continue;
        }

        match code.as_mut() {
            Some((_, lines)) => lines.push(line),
            None => {
                if !prose.is_empty() {
                    prose.push('\n');
                }
                prose.push_str(line);
            }
        }
    }

    if let Some((language, lines)) = code {
        segments.push(Segment::Code {
            language,
            body: lines.join("\n"),
        });
    }
    flush_prose(&mut segments, &mut prose);

    segments
}

fn flush_prose(segments: &mut Vec<Segment>, prose: &mut String) {
    if !prose.trim().is_empty() {
        segments.push(Segment::Prose(prose.trim_end().to_string()));
    }
    prose.clear();
}
