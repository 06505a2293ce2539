//! Link ranking, bounded site crawling, and single-page scraping.
//!
//! This crate provides:
//! - [`ranker`]: TF-IDF relevance ranking of candidate link URLs
//! - [`engine`]: breadth-first, depth- and count-bounded [`SiteCrawler`]
//! - [`scrape`]: [`HttpScraper`], one-shot paragraph text extraction
//! - [`extract`]: HTML helpers shared by the crawler and the scraper

pub mod engine;
pub mod extract;
pub mod ranker;
pub mod scrape;

pub use engine::{LINKS_PER_PAGE, SiteCrawler};
pub use extract::{USER_AGENT, build_client, paragraph_text, same_host_links};
pub use ranker::rank_links;
pub use scrape::HttpScraper;

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;
    use url::Url;

    fn load_fixture(name: &str) -> Html {
        let path = format!("../../../fixtures/html/{name}");
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing fixture: {path}"));
        Html::parse_document(&content)
    }

    #[test]
    fn article_fixture_text() {
        let doc = load_fixture("article.html");
        let text = paragraph_text(&doc);
        assert!(text.starts_with("India and the United States"));
        assert!(text.contains("tariff"));
        // Navigation and footer text live outside <p> elements
        assert!(!text.contains("Subscribe"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn homepage_fixture_links_rank_topic_first() {
        let doc = load_fixture("homepage.html");
        let base = Url::parse("https://news.example.com/").unwrap();
        let links = same_host_links(&doc, &base, "news.example.com");

        assert!(links.iter().all(|l| l.starts_with("https://news.example.com/")));
        assert!(!links.iter().any(|l| l.contains('#')));

        let ranked = rank_links(&links, "india us trade deal", LINKS_PER_PAGE);
        assert!(ranked.len() <= LINKS_PER_PAGE);
        assert_eq!(
            ranked[0],
            "https://news.example.com/world/india-us-trade-deal"
        );
    }
}
