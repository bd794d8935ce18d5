//! Configuration module

mod site;

pub use site::CacheConfig;
pub use site::MangaConfig;
pub use site::NotionConfig;
pub use site::Secrets;
pub use site::ServerConfig;
pub use site::SiteConfig;
pub use site::StravaConfig;
