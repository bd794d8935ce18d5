//! Notion API models
//!
//! Only the fields the blog renders are modeled; serde skips the rest of the
//! API payload. Blocks are kept as raw JSON in the cache and parsed lazily,
//! so one malformed block never poisons a whole page.

use serde::{Deserialize, Serialize};

/// Inline link inside a rich text span
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextLink {
    #[serde(default)]
    pub url: String,
}

/// The `text` payload of a rich text span
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    pub content: String,
    pub link: Option<TextLink>,
}

/// Style annotations on a rich text span
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

/// A single rich text span
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RichText {
    pub plain_text: String,
    pub href: Option<String>,
    pub annotations: Annotations,
    pub text: TextContent,
}

impl RichText {
    /// Link target for this span, if any
    pub fn link_url(&self) -> Option<&str> {
        self.text
            .link
            .as_ref()
            .map(|l| l.url.as_str())
            .or(self.href.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Common rich-text payload shared by paragraph, headings and list items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPayload {
    pub rich_text: Vec<RichText>,
}

/// Payload of a `to_do` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoPayload {
    pub rich_text: Vec<RichText>,
    pub checked: bool,
}

/// Payload of a `code` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodePayload {
    pub rich_text: Vec<RichText>,
    pub language: String,
}

/// A hosted or external file reference
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRef {
    pub url: String,
}

/// Payload of an `image` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePayload {
    pub file: Option<FileRef>,
    pub external: Option<FileRef>,
    pub caption: Vec<RichText>,
}

impl ImagePayload {
    /// Image URL, whichever hosting variant the block uses
    pub fn url(&self) -> Option<&str> {
        self.file
            .as_ref()
            .or(self.external.as_ref())
            .map(|f| f.url.as_str())
            .filter(|u| !u.is_empty())
    }
}

/// Payload of a `child_page` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildPagePayload {
    pub title: String,
}

/// Block content, discriminated by the API's `type` field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockData {
    #[serde(rename = "paragraph")]
    Paragraph { paragraph: TextPayload },
    #[serde(rename = "heading_1")]
    Heading1 { heading_1: TextPayload },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: TextPayload },
    #[serde(rename = "heading_3")]
    Heading3 { heading_3: TextPayload },
    #[serde(rename = "bulleted_list_item")]
    BulletedListItem { bulleted_list_item: TextPayload },
    #[serde(rename = "numbered_list_item")]
    NumberedListItem { numbered_list_item: TextPayload },
    #[serde(rename = "to_do")]
    ToDo { to_do: TodoPayload },
    #[serde(rename = "code")]
    Code { code: CodePayload },
    #[serde(rename = "image")]
    Image { image: ImagePayload },
    #[serde(rename = "divider")]
    Divider,
    #[serde(rename = "child_page")]
    ChildPage { child_page: ChildPagePayload },
    /// Anything this blog does not render
    #[serde(other)]
    Unsupported,
}

/// A content block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub object: String,
    pub id: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub data: BlockData,
}

/// `slug` property of a database row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlugProperty {
    pub rich_text: Vec<RichText>,
}

/// `Name` property of a database row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NameProperty {
    pub title: Vec<RichText>,
}

/// Database row properties the blog reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub slug: SlugProperty,
    #[serde(rename = "Name")]
    pub name: NameProperty,
}

/// One row of a database query
#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    pub id: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Database query response page
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDatabaseResponse {
    #[serde(default)]
    pub results: Vec<PageEntry>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// Block children response page; results stay raw for caching
#[derive(Debug, Clone, Deserialize)]
pub struct BlockChildrenResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A post listing entry reduced from a database row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlugEntry {
    pub id: String,
    pub title: String,
    pub created_time: String,
    pub slug: String,
}

/// One book on the reading-now page, assembled from divider-separated blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingNowBook {
    pub title: String,
    pub author: String,
    pub progress: String,
    pub image_url: String,
    pub comments: String,
}

impl ReadingNowBook {
    /// A group with no content at all is dropped, not rendered as a blank card
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.author.is_empty()
            && self.progress.is_empty()
            && self.image_url.is_empty()
            && self.comments.is_empty()
    }
}
