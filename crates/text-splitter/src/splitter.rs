use crate::config::SplitterConfig;
use crate::error::{Result, SplitterError};
use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

/// Recursive character splitter.
///
/// Splits on the first configured separator present in the text, packs the
/// pieces into segments of at most `chunk_size` characters and recurses with
/// the remaining separators into pieces that are still too long.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl TextSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self> {
        config.validate().map_err(SplitterError::invalid_config)?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Segments of `text` in document order. Whitespace-only input yields none.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        let segments = self.split_with(text, &self.config.separators);
        log::debug!(
            "Split {} chars into {} segments",
            char_len(text),
            segments.len()
        );
        segments
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = "";
        let mut rest: &[String] = &[];
        for (idx, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                rest = &[];
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                rest = &separators[idx + 1..];
                break;
            }
            separator = candidate.as_str();
        }

        let pieces: Vec<&str> = if separator.is_empty() || !text.contains(separator) {
            if separator.is_empty() {
                text.graphemes(true).collect()
            } else {
                vec![text]
            }
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut segments = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.config.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                segments.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if rest.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    segments.push(trimmed.to_string());
                }
            } else {
                segments.extend(self.split_with(piece, rest));
            }
        }
        if !fitting.is_empty() {
            segments.extend(self.merge(&fitting, separator));
        }
        segments
    }

    /// Packs small pieces into segments, keeping up to `chunk_overlap`
    /// trailing characters of each segment at the start of the next.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut segments = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        let joined_len = |total: usize, window: &VecDeque<(&str, usize)>, len: usize| {
            total + len + if window.is_empty() { 0 } else { sep_len }
        };

        for &piece in pieces {
            let len = char_len(piece);
            if joined_len(total, &window, len) > chunk_size && !window.is_empty() {
                push_segment(&mut segments, &window, separator);
                while total > overlap
                    || (total > 0 && joined_len(total, &window, len) > chunk_size)
                {
                    let Some((_, front_len)) = window.pop_front() else {
                        break;
                    };
                    total -= front_len + if window.is_empty() { 0 } else { sep_len };
                }
            }
            total = joined_len(total, &window, len);
            window.push_back((piece, len));
        }
        push_segment(&mut segments, &window, separator);
        segments
    }
}

fn push_segment(segments: &mut Vec<String>, window: &VecDeque<(&str, usize)>, separator: &str) {
    let joined = window
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}
