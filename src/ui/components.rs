//! Display-ready view of a verdict
//!
//! Everything the result box shows is derived here so the drawing code only
//! has to lay it out.

use crate::verify::VerificationResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub verified: bool,
    pub heading: &'static str,
    pub reason: String,
    /// Gauge fill, clamped to 0.0..=1.0
    pub ratio: f64,
    /// Percentage with one decimal, e.g. "87.0%"
    pub percent_label: String,
    /// Empty when the server sent none; the section is hidden then
    pub similar_titles: Vec<String>,
}

impl ResultView {
    pub fn from_result(result: &VerificationResult) -> Self {
        let probability = if result.probability.is_finite() {
            result.probability
        } else {
            0.0
        };

        Self {
            verified: result.verified,
            heading: if result.verified { "Title Verified" } else { "Verification Failed" },
            reason: result.reason.clone(),
            ratio: probability.clamp(0.0, 1.0),
            percent_label: format!("{:.1}%", probability * 100.0),
            similar_titles: result.similar_titles.clone().unwrap_or_default(),
        }
    }

    pub fn has_similar_titles(&self) -> bool {
        !self.similar_titles.is_empty()
    }
}

/// The part of the query that fits the input row.
///
/// Long queries scroll so the tail stays in view; one column is kept free for
/// the cursor, which sits right after the last visible character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputWindow<'a> {
    pub visible: &'a str,
    /// Cursor column relative to the start of the text, always < `width`
    pub cursor: u16,
}

impl<'a> InputWindow<'a> {
    pub fn new(query: &'a str, width: u16) -> Self {
        let room = usize::from(width.saturating_sub(1));
        let len = query.chars().count();
        let skip = len.saturating_sub(room);
        let start = query
            .char_indices()
            .nth(skip)
            .map(|(i, _)| i)
            .unwrap_or(query.len());

        Self {
            visible: &query[start..],
            cursor: u16::try_from(len - skip).unwrap_or(u16::MAX),
        }
    }
}
