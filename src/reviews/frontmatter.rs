//! Review front-matter parsing
//!
//! Review files carry a small `---`-delimited YAML header with capitalized
//! keys, followed by markdown.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Front-matter of a review file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewFrontMatter {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Slug")]
    pub slug: Option<String>,
    #[serde(rename = "Published")]
    pub published: Option<String>,
}

impl ReviewFrontMatter {
    /// Parse front-matter from file content, returning it with the body.
    ///
    /// A file without a header is all body with default front-matter.
    pub fn parse(content: &str) -> Result<(Self, &str)> {
        let trimmed = content.trim_start_matches(['\n', '\r']);
        let Some(rest) = trimmed.strip_prefix("---") else {
            return Ok((Self::default(), content));
        };

        let Some(end) = rest.find("\n---") else {
            return Ok((Self::default(), content));
        };

        let yaml = &rest[..end];
        let body = rest[end + 4..].trim_start_matches(['\n', '\r']);

        let fm: ReviewFrontMatter = serde_yaml::from_str(yaml)?;
        Ok((fm, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_header() {
        let content = r#"---
Title: Project Hail Mary
Slug: project-hail-mary
Published: 2024-03-02
---

Great book about an amnesiac in space.
"#;
        let (fm, body) = ReviewFrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Project Hail Mary"));
        assert_eq!(fm.slug.as_deref(), Some("project-hail-mary"));
        assert_eq!(fm.published.as_deref(), Some("2024-03-02"));
        assert!(body.starts_with("Great book"));
    }

    #[test]
    fn test_parse_no_header() {
        let content = "Just markdown, no header.";
        let (fm, body) = ReviewFrontMatter::parse(content).unwrap();
        assert!(fm.title.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn test_parse_unclosed_header_is_body() {
        let content = "---\nTitle: Oops\nno closing fence";
        let (fm, body) = ReviewFrontMatter::parse(content).unwrap();
        assert!(fm.title.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn test_parse_partial_header() {
        let content = "---\nTitle: Only Title\n---\nbody";
        let (fm, body) = ReviewFrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Only Title"));
        assert!(fm.slug.is_none());
        assert_eq!(body, "body");
    }
}
