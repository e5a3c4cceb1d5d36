//! Marker-delimited README splicing.
//!
//! Only the bytes strictly between the begin and end marker lines change.
//! Markers must match whole lines exactly; there is no fuzzy fallback.

use thiserror::Error;

pub const DEFAULT_BEGIN_MARKER: &str = "<!-- WCG_STATS_START -->";
pub const DEFAULT_END_MARKER: &str = "<!-- WCG_STATS_END -->";

/// The pair of sentinel lines delimiting the generated region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub begin: String,
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            begin: DEFAULT_BEGIN_MARKER.to_string(),
            end: DEFAULT_END_MARKER.to_string(),
        }
    }
}

/// Template problems. All of them abort the run before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    #[error("begin marker `{0}` not found")]
    MissingBegin(String),

    #[error("end marker `{0}` not found after the begin marker")]
    MissingEnd(String),

    #[error("end marker `{end}` appears before begin marker `{begin}`")]
    Misordered { begin: String, end: String },

    #[error("rendered section contains a marker line")]
    MarkerInBody,
}

/// A line of the template with its byte span.
struct Line<'a> {
    /// Content without `\n` / `\r\n`.
    text: &'a str,
    start: usize,
    /// Offset just past the line terminator.
    end: usize,
}

fn lines(contents: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    contents.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let text = raw.strip_suffix('\n').unwrap_or(raw);
        let text = text.strip_suffix('\r').unwrap_or(text);
        Line {
            text,
            start,
            end: offset,
        }
    })
}

/// Replace the region between the markers with `body`.
///
/// The marker lines and everything outside them are kept byte for byte.
/// A newline is appended to `body` if it lacks one so the end marker stays
/// on its own line.
pub fn splice(contents: &str, markers: &Markers, body: &str) -> Result<String, SpliceError> {
    if lines(body).any(|l| l.text == markers.begin || l.text == markers.end) {
        return Err(SpliceError::MarkerInBody);
    }

    let mut begin_end: Option<usize> = None;
    let mut end_start: Option<usize> = None;
    let mut end_before_begin = false;

    for line in lines(contents) {
        if begin_end.is_none() {
            if line.text == markers.begin {
                begin_end = Some(line.end);
            } else if line.text == markers.end {
                end_before_begin = true;
            }
        } else if line.text == markers.end {
            end_start = Some(line.start);
            break;
        }
    }

    let begin_end = begin_end.ok_or_else(|| SpliceError::MissingBegin(markers.begin.clone()))?;
    if end_before_begin {
        return Err(SpliceError::Misordered {
            begin: markers.begin.clone(),
            end: markers.end.clone(),
        });
    }
    let end_start = end_start.ok_or_else(|| SpliceError::MissingEnd(markers.end.clone()))?;

    let mut output = String::with_capacity(contents.len() + body.len());
    output.push_str(&contents[..begin_end]);
    output.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(&contents[end_start..]);

    Ok(output)
}
