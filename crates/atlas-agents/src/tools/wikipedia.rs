use atlas_base::DecisionHook;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::http::{client, get_json, truncate, urlenc};
use super::{Tool, ToolError, str_arg};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const REST_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const MAX_EXTRACT_CHARS: usize = 2000;
const MAX_PAGES: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    title: String,
    #[serde(default)]
    extract: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

/// Search English Wikipedia and return summaries of the best matches.
pub struct WikipediaTool {
    client: Client,
}

impl WikipediaTool {
    pub fn new(timeout_secs: u64) -> Result<Self, ToolError> {
        Ok(Self { client: client(timeout_secs)? })
    }

    fn search(&self, query: &str) -> Result<Vec<String>, ToolError> {
        let url = format!(
            "{}?action=query&list=search&format=json&srlimit={}&srsearch={}",
            API_URL,
            MAX_PAGES,
            urlenc(query)
        );
        let resp: SearchResponse = get_json(&self.client, &url)?;
        Ok(resp.query.map(|q| q.search.into_iter().map(|h| h.title).collect()).unwrap_or_default())
    }

    fn summary(&self, title: &str) -> Result<PageSummary, ToolError> {
        let url = format!("{}/{}", REST_URL, urlenc(&title.replace(' ', "_")));
        get_json(&self.client, &url)
    }
}

fn format_summary(page: &PageSummary) -> String {
    let mut out = format!("{}\n{}", page.title, truncate(page.extract.trim(), MAX_EXTRACT_CHARS));
    if let Some(url) = page.content_urls.as_ref().and_then(|u| u.desktop.as_ref()) {
        out.push_str(&format!("\nSource: {}", url.page));
    }
    out
}

impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "Wikipedia"
    }

    fn description(&self) -> &str {
        "Search factual and historical information, including biography, history, politics, geography, society, culture, science, technology, people, animal species, mathematics, and other subjects."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Name of the Wikipedia page, for example 'New York'" }
            },
            "required": ["query"]
        })
    }

    fn run(&self, input: &Value, _hook: &dyn DecisionHook) -> Result<String, ToolError> {
        let query = str_arg(input, "query")?;
        let titles = self.search(query)?;
        if titles.is_empty() {
            return Err(ToolError::NotFound(query.to_string()));
        }

        let mut sections = Vec::new();
        for title in &titles {
            match self.summary(title) {
                Ok(page) if !page.extract.trim().is_empty() => sections.push(format_summary(&page)),
                Ok(_) => {}
                Err(e) => tracing::debug!(%title, error = %e, "summary fetch failed"),
            }
        }
        if sections.is_empty() {
            return Err(ToolError::NotFound(query.to_string()));
        }
        Ok(sections.join("\n\n"))
    }
}
