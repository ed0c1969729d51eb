use axum::response::Html;

const INDEX_PAGE: &str = r#"<h1>Available Routes</h1>
<ul>
  <li><a href="/status" target="_blank">GET /status</a> - Check server status.</li>
  <li><a href="/csv-info" target="_blank">GET /csv-info</a> - Check row counts of all stored days.</li>
  <li><a href="/positions" target="_blank">GET /positions</a> - Latest 100 positions.</li>
  <li><a href="/errors" target="_blank">GET /errors</a> - Latest 100 errors.</li>
  <li><a href="/health" target="_blank">GET /health</a> - Storage health check.</li>
</ul>
"#;

/// Human-readable list of the available routes
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
