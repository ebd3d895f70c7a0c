use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::error::Result;
use crate::row::IndexRow;
use crate::settings::{Settings, USER_AGENT};

const CARD_SELECTOR: &str = "main div.merch-card";
const TITLE_SELECTOR: &str = r#"head > meta[property="og:title"]"#;
const TAGS_SELECTOR: &str = r#"head > meta[property="article:tag"]"#;

/// Source of rendered resources to index.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// `Ok(None)` when the page is unavailable or carries no merch card.
    async fn fetch(&self, path: &str) -> Result<Option<IndexRow>>;
}

/// Reads rendered pages from the preview origin.
pub struct ResourceFetcher {
    http: reqwest::Client,
    base_url: String,
    admin_key: String,
}

impl ResourceFetcher {
    pub fn new(http: reqwest::Client, settings: &Settings) -> Self {
        ResourceFetcher {
            http,
            base_url: settings.preview_base_url.clone(),
            admin_key: settings.admin_key.clone(),
        }
    }
}

impl PageSource for ResourceFetcher {
    async fn fetch(&self, path: &str) -> Result<Option<IndexRow>> {
        info!("{}, path: {}", chrono::Local::now().to_rfc2822(), path);
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("token {}", self.admin_key))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            warn!("Failed to fetch card: {} ({})", url, response.status());
            return Ok(None);
        }

        let html = response.text().await?;
        let row = parse_index_row(path, &html);
        if row.is_none() {
            warn!("Merch card not found in the dom: {}", path);
        }
        Ok(row)
    }
}

/// Extract the index row for `path` from rendered page markup.
pub fn parse_index_row(path: &str, html: &str) -> Option<IndexRow> {
    let document = Html::parse_document(html);
    let card_sel = Selector::parse(CARD_SELECTOR).ok()?;
    let card = document.select(&card_sel).next()?;

    let meta_content = |selector: &str| -> String {
        let Ok(sel) = Selector::parse(selector) else {
            return String::new();
        };
        document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .unwrap_or_default()
            .to_string()
    };

    Some(IndexRow {
        path: path.to_string(),
        title: meta_content(TITLE_SELECTOR),
        card_content: card.html(),
        card_classes: class_list_json(card.value().attr("class").unwrap_or_default()),
        tags: meta_content(TAGS_SELECTOR),
        ..Default::default()
    })
}

/// Class attribute as a JSON array, first occurrence of each token kept.
fn class_list_json(class_attr: &str) -> String {
    let mut classes: Vec<&str> = Vec::new();
    for class in class_attr.split_whitespace() {
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    serde_json::to_string(&classes).unwrap_or_else(|_| "[]".to_string())
}
