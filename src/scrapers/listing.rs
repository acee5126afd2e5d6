//! Essay list scraper.
//!
//! The site publishes every essay as a relative link on a single list page
//! (`articles.html`). Each linked page is then fetched once to find its
//! publication date.

use crate::config::SiteSettings;
use crate::error::ScrapeError;
use crate::models::{IndexEntry, UNKNOWN_DATE};
use crate::scrapers::dates::find_date;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Pages linked from the list page that are not essays.
const NON_ARTICLE_PAGES: [&str; 2] = ["articles.html", "index.html"];

/// A link found on the list page.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleLink {
    pub title: String,
    pub url: String,
    pub filename: String,
}

/// Extract essay links from the list page HTML.
///
/// Keeps relative `.html` links with a title longer than one character,
/// dropping navigation pages and duplicate filenames.
pub fn parse_article_links(html: &str, base: &Url) -> Result<Vec<ArticleLink>, ScrapeError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").map_err(|e| ScrapeError::Selector(e.to_string()))?;

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let title = element.text().collect::<String>().trim().to_string();
        if !href.ends_with(".html")
            || href.starts_with("http")
            || NON_ARTICLE_PAGES.contains(&href)
            || title.chars().count() <= 1
        {
            continue;
        }
        let url = base.join(href)?;
        links.push(ArticleLink {
            title,
            url: url.to_string(),
            filename: href.to_string(),
        });
    }

    Ok(links
        .into_iter()
        .unique_by(|l| l.filename.clone())
        .collect())
}

/// Fetch a page body, failing on non-success statuses.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, ScrapeError> {
    Ok(client.get(url).send().await?.error_for_status()?.text().await?)
}

/// Publication date of one essay, or [`UNKNOWN_DATE`].
#[instrument(level = "debug", skip(client))]
pub async fn fetch_article_date(client: &Client, url: &str) -> String {
    match fetch_page(client, url).await {
        Ok(page) => find_date(&page).unwrap_or_else(|| {
            warn!(%url, "No publication date found");
            UNKNOWN_DATE.to_string()
        }),
        Err(e) => {
            warn!(%url, error = %e, "Failed to fetch article for its date");
            UNKNOWN_DATE.to_string()
        }
    }
}

/// Index the list page and date every essay, in discovery order.
///
/// Ids are left at zero; [`crate::index::order_index`] assigns them.
#[instrument(level = "info", skip_all, fields(base = %site.base_url))]
pub async fn index_articles(client: &Client, site: &SiteSettings) -> Result<Vec<IndexEntry>, ScrapeError> {
    let base = Url::parse(&site.base_url)?;
    let list_url = base.join(&site.list_page)?;
    let html = fetch_page(client, list_url.as_str()).await?;
    let links = parse_article_links(&html, &base)?;
    info!(count = links.len(), source = %list_url, "Indexed article links");

    let total = links.len();
    let delay = site.request_delay();
    let entries: Vec<IndexEntry> = stream::iter(links.into_iter().enumerate())
        .then(move |(i, link)| async move {
            let date = fetch_article_date(client, &link.url).await;
            debug!(progress = %format!("{}/{}", i + 1, total), title = %link.title, %date, "Dated article");
            if !delay.is_zero() {
                sleep(delay).await;
            }
            IndexEntry {
                title: link.title,
                url: link.url,
                filename: link.filename,
                date,
                id: 0,
            }
        })
        .collect()
        .await;

    let dated = entries.iter().filter(|e| e.date != UNKNOWN_DATE).count();
    info!(total, dated, "Fetched publication dates");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIST_PAGE: &str = r#"<html><body><table>
        <tr><td><a href="index.html">Home</a></td></tr>
        <tr><td><a href="articles.html">Essays</a></td></tr>
        <tr><td><a href="greatwork.html">How to Do Great Work</a></td></tr>
        <tr><td><a href="https://example.com/other.html">Elsewhere</a></td></tr>
        <tr><td><a href="x.html">X</a></td></tr>
        <tr><td><a href="rss.xml">RSS</a></td></tr>
        <tr><td><a href="field.html">  Crazy New Ideas </a></td></tr>
        <tr><td><a href="greatwork.html">How to Do Great Work</a></td></tr>
    </table></body></html>"#;

    #[test]
    fn test_parse_article_links_filters() {
        let base = Url::parse("https://www.paulgraham.com/").unwrap();
        let links = parse_article_links(LIST_PAGE, &base).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].filename, "greatwork.html");
        assert_eq!(links[0].url, "https://www.paulgraham.com/greatwork.html");
        assert_eq!(links[1].title, "Crazy New Ideas");
    }

    #[tokio::test]
    async fn test_index_articles_dates_each_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/articles.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LIST_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/greatwork.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>July 2023</p><p>Body</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/field.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let site = SiteSettings {
            base_url: format!("{}/", server.uri()),
            request_delay_ms: 0,
            ..SiteSettings::default()
        };
        let client = http_client(&site).unwrap();
        let entries = index_articles(&client, &site).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, "2023-07-01");
        assert_eq!(entries[1].date, UNKNOWN_DATE);
    }
}
