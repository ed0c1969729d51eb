// Client for the transit operator's public bus API.
//
// Two endpoints are used: the list of bus lines and the live positions of the
// units currently running on one line.

use std::time::Duration;

pub mod models;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use crate::models::{Line, Position};

pub const DEFAULT_BASE_URL: &str = "https://www.jaha.com.py";

const LINES_PATH: &str = "/bus/lineas";
const POSITIONS_PATH: &str = "/api/posicionColectivos";

#[derive(Debug, Error)]
pub enum TransitError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct TransitOptions {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TransitOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitClient {
    options: TransitOptions,
    http: Client,
}

impl TransitClient {
    pub fn new(options: TransitOptions) -> Result<Self, TransitError> {
        let http = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { options, http })
    }

    pub fn base_url(&self) -> &str {
        self.options.base_url.trim_end_matches('/')
    }

    /// Fetch every line the operator currently publishes.
    pub async fn fetch_lines(&self) -> Result<Vec<Line>, TransitError> {
        let url = format!("{}{}", self.base_url(), LINES_PATH);
        let response = self.http.get(url).send().await?;
        read_list(response, "line").await
    }

    /// Fetch the live positions of the units running on `line_id`.
    ///
    /// The operator exposes this as a POST with the line passed in the
    /// query string and an empty body.
    pub async fn fetch_positions(&self, line_id: &str) -> Result<Vec<Position>, TransitError> {
        let url = format!("{}{}", self.base_url(), POSITIONS_PATH);
        let response = self
            .http
            .post(url)
            .query(&[("linea", line_id)])
            .send()
            .await?;
        read_list(response, "position").await
    }
}

/// Read a JSON array body.
///
/// The body as a whole must be an array; elements that do not decode are
/// skipped with a warning so one bad entry does not hide its siblings.
async fn read_list<T: DeserializeOwned>(
    response: Response,
    kind: &'static str,
) -> Result<Vec<T>, TransitError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransitError::Status { status, body });
    }

    let bytes = response.bytes().await?;
    decode_list(&bytes, kind)
}

fn decode_list<T: DeserializeOwned>(bytes: &[u8], kind: &'static str) -> Result<Vec<T>, TransitError> {
    let elements: Vec<Value> = serde_json::from_slice(bytes)?;

    Ok(elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value::<T>(element.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(kind, element = %element, error = %e, "Skipping undecodable entry");
                None
            }
        })
        .collect())
}
