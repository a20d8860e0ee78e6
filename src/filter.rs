//! Content selection filters applied to extracted content.

use crate::model::Content;

/// Which of the extracted content items to download.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ContentSelection {
    /// Only the highest-quality variant of each content id.
    #[default]
    Best,
    /// Every extracted item.
    All,
    /// Items whose quality and/or mime type equal the given values.
    Matching {
        /// Required quality.
        quality: Option<f64>,
        /// Required mime type (case-insensitive).
        mime_type: Option<String>,
    },
}

impl ContentSelection {
    /// Applies the selection, preserving extraction order.
    #[must_use]
    pub fn apply(&self, content: Vec<Content>) -> Vec<Content> {
        match self {
            Self::Best => best_content(content),
            Self::All => content,
            Self::Matching { quality, mime_type } => {
                matching_content(content, *quality, mime_type.as_deref())
            }
        }
    }
}

/// Keeps the highest-quality item of every run of consecutive items sharing
/// an id. Ties keep the earliest item.
#[must_use]
pub fn best_content(content: Vec<Content>) -> Vec<Content> {
    let mut selected: Vec<Content> = Vec::new();
    for item in content {
        match selected.last_mut() {
            Some(best) if best.id == item.id => {
                if item.quality > best.quality {
                    *best = item;
                }
            }
            _ => selected.push(item),
        }
    }
    selected
}

/// Keeps items matching every given condition; `None` conditions match all.
#[must_use]
pub fn matching_content(
    content: Vec<Content>,
    quality: Option<f64>,
    mime_type: Option<&str>,
) -> Vec<Content> {
    content
        .into_iter()
        .filter(|item| quality.is_none_or(|quality| (item.quality - quality).abs() < f64::EPSILON))
        .filter(|item| mime_type.is_none_or(|mime| item.mime_type.eq_ignore_ascii_case(mime)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, quality: f64, mime_type: &str) -> Content {
        let mut content = Content::new(
            id,
            format!("{id}@{quality}"),
            "https://example.com".parse().unwrap(),
            mime_type,
            Vec::new(),
        );
        content.quality = quality;
        content
    }

    fn names(content: &[Content]) -> Vec<&str> {
        content.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_best_content_per_consecutive_group() {
        let content = vec![
            item("a", 1.0, "video/mp4"),
            item("a", 3.0, "video/mp4"),
            item("a", 2.0, "video/mp4"),
            item("b", 1.0, "audio/mpeg"),
            item("a", 0.5, "video/mp4"),
        ];
        let best = best_content(content);
        assert_eq!(names(&best), vec!["a@3", "b@1", "a@0.5"]);
    }

    #[test]
    fn test_best_content_ties_keep_first() {
        let mut first = item("a", 2.0, "video/mp4");
        first.name = "first".to_string();
        let mut second = item("a", 2.0, "video/mp4");
        second.name = "second".to_string();
        assert_eq!(names(&best_content(vec![first, second])), vec!["first"]);
    }

    #[test]
    fn test_matching_content_filters_by_all_conditions() {
        let content = vec![
            item("a", 1.0, "video/mp4"),
            item("a", 2.0, "video/mp4"),
            item("a", 2.0, "video/webm"),
        ];
        let matched = matching_content(content.clone(), Some(2.0), Some("VIDEO/MP4"));
        assert_eq!(names(&matched), vec!["a@2"]);
        assert_eq!(matched[0].mime_type, "video/mp4");

        let by_type = matching_content(content.clone(), None, Some("video/webm"));
        assert_eq!(by_type.len(), 1);

        assert_eq!(matching_content(content, None, None).len(), 3);
    }

    #[test]
    fn test_selection_apply() {
        let content = vec![item("a", 1.0, "video/mp4"), item("a", 2.0, "video/mp4")];
        assert_eq!(ContentSelection::Best.apply(content.clone()).len(), 1);
        assert_eq!(ContentSelection::All.apply(content.clone()).len(), 2);
        let matching = ContentSelection::Matching {
            quality: Some(1.0),
            mime_type: None,
        };
        assert_eq!(names(&matching.apply(content)), vec!["a@1"]);
    }
}
