//! Embedded blog templates using the Tera template engine
//!
//! All templates are compiled into the binary, so a deployed server is a
//! single file plus its static assets.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

/// Template renderer with embedded blog templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Disable autoescaping: handlers inject pre-rendered, pre-escaped
        // HTML fragments
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("home.html", include_str!("blog/home.html")),
            ("entries.html", include_str!("blog/entries.html")),
            ("post.html", include_str!("blog/post.html")),
            ("reviews_list.html", include_str!("blog/reviews_list.html")),
            ("review.html", include_str!("blog/review.html")),
            ("strava.html", include_str!("blog/strava.html")),
            ("manga.html", include_str!("blog/manga.html")),
        ])?;

        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: format an ISO timestamp or date string
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "YYYY-MM-DD".to_string(),
    };

    // Notion timestamps look like 2023-05-30T12:00:00.000Z; the leading ten
    // characters are always the date
    if format == "LL" && s.len() >= 10 {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d") {
            return Ok(tera::Value::String(date.format("%B %d, %Y").to_string()));
        }
    }

    if s.len() >= 10 {
        return Ok(tera::Value::String(s[..10].to_string()));
    }
    Ok(tera::Value::String(s))
}

/// Data structures for template context

/// One strava activity row, preformatted for display
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRow {
    pub date: String,
    pub distance_km: String,
    pub duration: String,
}

impl ActivityRow {
    pub fn from_activity(activity: &crate::strava::Activity) -> Self {
        let date = activity
            .start_date_local
            .get(..10)
            .unwrap_or(&activity.start_date_local)
            .to_string();
        let minutes = activity.moving_time / 60;
        Self {
            date,
            distance_km: format!("{:.1}", activity.distance / 1000.0),
            duration: format!("{}h {:02}m", minutes / 60, minutes % 60),
        }
    }
}
