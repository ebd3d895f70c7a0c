use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{ReindexError, Result};
use crate::locator::VisibleView;
use crate::row::IndexRow;
use crate::settings::{Settings, USER_AGENT};
use crate::token::TokenProvider;

const SHEET_RAW_INDEX: &str = "raw_index";
const TABLE_NAME: &str = "Table1";
const FILTER_COLUMN: u32 = 8;
const SESSION_HEADER: &str = "workbook-session-id";

/// Non-persisting workbook session. Lives until the server times it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
}

/// Spreadsheet-backed index table.
#[allow(async_fn_in_trait)]
pub trait IndexSheet {
    async fn item_id(&self, index_path: &str) -> Result<Option<String>>;
    async fn create_session(&self, item_id: &str) -> Result<Session>;
    async fn clear_filter(&self, item_id: &str, session: &Session) -> Result<()>;
    async fn apply_filter(&self, item_id: &str, session: &Session, path: &str) -> Result<()>;
    async fn visible_rows(&self, item_id: &str, session: &Session) -> Result<VisibleView>;
    async fn add_row(&self, item_id: &str, row: &IndexRow) -> Result<()>;
    async fn update_row(&self, item_id: &str, row: &IndexRow, index: usize) -> Result<()>;
}

#[derive(Deserialize)]
struct IdBody {
    id: String,
}

/// Graph workbook client for the raw index table of one drive.
pub struct WorkbookClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    base_url: String,
    drive_id: String,
}

impl WorkbookClient {
    pub fn new(http: reqwest::Client, tokens: TokenProvider, settings: &Settings) -> Self {
        WorkbookClient {
            http,
            tokens,
            base_url: settings.graph_base_url.clone(),
            drive_id: settings.drive_id.clone(),
        }
    }

    fn table_url(&self, item_id: &str, rest: &str) -> String {
        format!(
            "{}/drives/{}/items/{}/workbook/worksheets/{}/tables/{}/{}",
            self.base_url, self.drive_id, item_id, SHEET_RAW_INDEX, TABLE_NAME, rest
        )
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        session: Option<&Session>,
    ) -> Result<RequestBuilder> {
        let token = self.tokens.get_token().await?;
        let mut builder = self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, token.bearer())
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, &session.id);
        }
        Ok(builder)
    }
}

/// Log the outcome of a workbook action and turn failures into errors.
fn respond(response: Response, action: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        info!("Action \"{}\" successful : {}", action, status);
        Ok(response)
    } else {
        warn!("Action \"{}\" failed: {}", action, status);
        Err(ReindexError::Api {
            action,
            status: status.as_u16(),
        })
    }
}

impl IndexSheet for WorkbookClient {
    async fn item_id(&self, index_path: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/drives/{}/root:/{}",
            self.base_url,
            self.drive_id,
            index_path.trim_start_matches('/')
        );
        info!("Get item id: {}", url);
        let response = self.request(Method::GET, &url, None).await?.send().await?;
        info!("Check if document exists: {}", response.status());
        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }
        let body: IdBody = response
            .json()
            .await
            .map_err(|e| ReindexError::Decode(e.to_string()))?;
        Ok(Some(body.id))
    }

    async fn create_session(&self, item_id: &str) -> Result<Session> {
        let url = format!(
            "{}/drives/{}/items/{}/workbook/createSession",
            self.base_url, self.drive_id, item_id
        );
        let response = self
            .request(Method::POST, &url, None)
            .await?
            .json(&json!({ "persistChanges": false }))
            .send()
            .await?;
        let body: IdBody = respond(response, "create session")?
            .json()
            .await
            .map_err(|e| ReindexError::Decode(e.to_string()))?;
        Ok(Session { id: body.id })
    }

    async fn clear_filter(&self, item_id: &str, session: &Session) -> Result<()> {
        let url = self.table_url(item_id, &format!("columns/{}/filter/clear", FILTER_COLUMN));
        let response = self
            .request(Method::POST, &url, Some(session))
            .await?
            .json(&json!({}))
            .send()
            .await?;
        respond(response, "clear filter").map(|_| ())
    }

    async fn apply_filter(&self, item_id: &str, session: &Session, path: &str) -> Result<()> {
        let url = self.table_url(item_id, "columns('path')/filter/apply");
        let body = json!({
            "criteria": {
                "filterOn": "custom",
                "criterion1": format!("={}", path),
                "operator": "or",
                "criterion2": null,
            }
        });
        let response = self
            .request(Method::POST, &url, Some(session))
            .await?
            .json(&body)
            .send()
            .await?;
        respond(response, "apply filter").map(|_| ())
    }

    async fn visible_rows(&self, item_id: &str, session: &Session) -> Result<VisibleView> {
        let url = self.table_url(item_id, "range/visibleView/rows");
        let response = self
            .request(Method::GET, &url, Some(session))
            .await?
            .send()
            .await?;
        respond(response, "get visible view")?
            .json()
            .await
            .map_err(|e| ReindexError::Decode(e.to_string()))
    }

    async fn add_row(&self, item_id: &str, row: &IndexRow) -> Result<()> {
        let url = self.table_url(item_id, "rows/add");
        let response = self
            .request(Method::POST, &url, None)
            .await?
            .json(&json!({ "index": null, "values": [row.values()] }))
            .send()
            .await?;
        respond(response, "add row").map(|_| ())
    }

    async fn update_row(&self, item_id: &str, row: &IndexRow, index: usize) -> Result<()> {
        let url = self.table_url(item_id, &format!("rows/itemAt(index={})", index));
        let response = self
            .request(Method::PATCH, &url, None)
            .await?
            .json(&json!({ "index": index, "values": [row.values()] }))
            .send()
            .await?;
        respond(response, "update row").map(|_| ())
    }
}
