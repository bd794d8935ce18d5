//! Notion integration - API client, block models, HTML rendering

mod client;
mod model;
mod render;

pub use client::NotionClient;
pub use model::{Block, BlockData, PageEntry, ReadingNowBook, RichText, SlugEntry};
pub use render::{collect_reading_now, render_blocks};
