use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use quick_xml::escape::escape;
use sf_core::{Error, SiteMetadata};
use sf_scrapers::Logger;

use crate::AppState;

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Error answered to an HTTP client. Unknown sites are 404, runs over the
/// time limit 504, anything else 500.
#[derive(Debug)]
pub struct WebError(pub Error);

impl From<Error> for WebError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::UnknownSite(_) => StatusCode::NOT_FOUND,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn list_sites(State(state): State<Arc<AppState>>) -> Json<Vec<SiteMetadata>> {
    Json(state.manager.sites())
}

/// Serves the feed of one site. With `?debug` the answer is an HTML page with
/// the run's timing trace followed by the indented feed.
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(site): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let feed = state.manager.get(&site)?;
    let is_debug = params.contains_key("debug");
    tracing::info!(site = %feed.metadata().id, debug = is_debug, "Feed requested");
    let logger = feed.logger(is_debug);

    let xml = if state.refresh_on_request {
        feed.sync_and_render_within(&logger, is_debug, state.run_timeout)
            .await?
            .1
    } else {
        let xml = feed.render(is_debug).await?;
        logger.info("Rendered feed from store");
        xml
    };

    if is_debug {
        Ok(Html(diagnostics_page(&logger, &xml)).into_response())
    } else {
        Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml).into_response())
    }
}

fn diagnostics_page(logger: &Logger, xml: &str) -> String {
    let mut page = String::new();
    for line in logger.trace_lines() {
        page.push_str(&format!(
            "<code>[{:.3} s]</code> {}<br>\n",
            line.elapsed.as_secs_f64(),
            escape(line.message.as_str())
        ));
    }
    page.push_str("<hr>\n<pre style=\"white-space: pre-wrap;\">");
    page.push_str(&escape(xml));
    page.push_str("</pre>\n");
    page
}
