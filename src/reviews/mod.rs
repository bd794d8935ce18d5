//! Locally authored markdown book reviews

mod frontmatter;
mod markdown;

pub use frontmatter::ReviewFrontMatter;
pub use markdown::MarkdownRenderer;

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A fully rendered review
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub title: String,
    pub slug: String,
    pub published: String,
    /// Rendered HTML
    pub content: String,
}

/// Listing entry for the reviews index
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub title: String,
    pub slug: String,
    pub published: String,
}

/// Loads reviews from the reviews directory.
///
/// The directory is re-walked on each call so newly dropped files show up
/// without a restart; review sets are small enough that this is fine.
pub struct ReviewLibrary {
    reviews_dir: PathBuf,
    renderer: MarkdownRenderer,
}

impl ReviewLibrary {
    pub fn new<P: AsRef<Path>>(reviews_dir: P) -> Self {
        Self {
            reviews_dir: reviews_dir.as_ref().to_path_buf(),
            renderer: MarkdownRenderer::new(),
        }
    }

    /// List all reviews, newest first
    pub fn list(&self) -> Result<Vec<ReviewSummary>> {
        let mut summaries: Vec<ReviewSummary> = self
            .load_all()?
            .into_iter()
            .map(|review| ReviewSummary {
                title: review.title,
                slug: review.slug,
                published: review.published,
            })
            .collect();

        // ISO dates, so lexicographic descending is newest first
        summaries.sort_by(|a, b| b.published.cmp(&a.published));
        Ok(summaries)
    }

    /// Find one review by slug
    pub fn get(&self, slug: &str) -> Result<Option<Review>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|review| review.slug == slug))
    }

    fn load_all(&self) -> Result<Vec<Review>> {
        if !self.reviews_dir.exists() {
            return Ok(Vec::new());
        }

        let mut reviews = Vec::new();

        for entry in WalkDir::new(&self.reviews_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_markdown_file(path) {
                match self.load_review(path) {
                    Ok(review) => reviews.push(review),
                    Err(e) => {
                        tracing::warn!("Failed to load review {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(reviews)
    }

    fn load_review(&self, path: &Path) -> Result<Review> {
        let content = std::fs::read_to_string(path)?;
        let (fm, body) = ReviewFrontMatter::parse(&content)?;

        let title = fm.title.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Untitled")
                .to_string()
        });
        let slug = fm.slug.unwrap_or_else(|| slug::slugify(&title));
        let published = fm.published.unwrap_or_default();

        let content = self.renderer.render(body)?;

        Ok(Review {
            title,
            slug,
            published,
            content,
        })
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_review(dir: &Path, name: &str, header: &str, body: &str) {
        fs::write(dir.join(name), format!("---\n{}---\n\n{}", header, body)).unwrap();
    }

    #[test]
    fn test_list_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_review(
            dir.path(),
            "old.md",
            "Title: Old Book\nSlug: old-book\nPublished: 2023-01-01\n",
            "old",
        );
        write_review(
            dir.path(),
            "new.md",
            "Title: New Book\nSlug: new-book\nPublished: 2024-06-15\n",
            "new",
        );

        let library = ReviewLibrary::new(dir.path());
        let list = library.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].slug, "new-book");
        assert_eq!(list[1].slug, "old-book");
    }

    #[test]
    fn test_get_by_slug_renders_markdown() {
        let dir = tempfile::tempdir().unwrap();
        write_review(
            dir.path(),
            "r.md",
            "Title: A Book\nSlug: a-book\nPublished: 2024-01-01\n",
            "# Verdict\n\nworth reading",
        );

        let library = ReviewLibrary::new(dir.path());
        let review = library.get("a-book").unwrap().unwrap();
        assert_eq!(review.title, "A Book");
        assert!(review.content.contains("<h1>Verdict</h1>"));
        assert!(review.content.contains("worth reading"));
    }

    #[test]
    fn test_missing_slug_falls_back_to_title() {
        let dir = tempfile::tempdir().unwrap();
        write_review(
            dir.path(),
            "r.md",
            "Title: Some Long Title\nPublished: 2024-01-01\n",
            "body",
        );

        let library = ReviewLibrary::new(dir.path());
        assert!(library.get("some-long-title").unwrap().is_some());
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        // invalid yaml header
        fs::write(dir.path().join("bad.md"), "---\n\t: {]\n---\nbody").unwrap();
        write_review(
            dir.path(),
            "good.md",
            "Title: Good\nSlug: good\nPublished: 2024-01-01\n",
            "fine",
        );

        let library = ReviewLibrary::new(dir.path());
        let list = library.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].slug, "good");
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let library = ReviewLibrary::new("/nonexistent/path/for/sure");
        assert!(library.list().unwrap().is_empty());
    }
}
