//! Query decomposition: research question → typed research plan.
//!
//! The generator is asked for a fixed set of `Key: value` lines. The answer
//! is parsed line by line into a [`QueryPlan`]; every field has a fallback,
//! so a missing, malformed or failed response still yields a usable plan.

use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use researcher_shared::TextGenerator;

const FALLBACK_INTENT: &str = "unknown";
const FALLBACK_INFO_TYPES: &str = "general";
const FALLBACK_TIME_RANGE: &str = "none";

// ---------------------------------------------------------------------------
// QueryPlan
// ---------------------------------------------------------------------------

/// Structured research plan derived from the user's question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Kind of question (news, facts, comparison, timeline, ...).
    pub intent: String,
    /// Flat keyword string suitable for a single search.
    pub keywords: String,
    /// Kinds of information worth gathering.
    pub info_types: String,
    /// Time constraint, `none` when unconstrained.
    pub time_range: String,
    /// Groups of related phrases; each group becomes one search query.
    pub keyword_clusters: Vec<Vec<String>>,
}

impl QueryPlan {
    /// The plan used when nothing could be parsed.
    pub fn fallback(query: &str) -> Self {
        Self {
            intent: FALLBACK_INTENT.into(),
            keywords: query.into(),
            info_types: FALLBACK_INFO_TYPES.into(),
            time_range: FALLBACK_TIME_RANGE.into(),
            keyword_clusters: vec![vec![query.to_string()]],
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Ask `generator` for a research plan for `query`.
///
/// Never fails: a generation error produces [`QueryPlan::fallback`].
#[instrument(skip_all, fields(query = %query))]
pub async fn analyze_query<G: TextGenerator>(query: &str, generator: &G) -> QueryPlan {
    match generator.generate(&build_query_prompt(query)).await {
        Ok(response) => {
            let plan = parse_query_plan(&response, query);
            debug!(
                intent = %plan.intent,
                clusters = plan.keyword_clusters.len(),
                "query analysed"
            );
            plan
        }
        Err(e) => {
            warn!(error = %e, "query analysis failed, using fallback plan");
            QueryPlan::fallback(query)
        }
    }
}

/// Research-planning prompt for `query`.
pub fn build_query_prompt(query: &str) -> String {
    format!(
        r#"Analyze the following user query and return a structured plan for web research.

User Query:
"""
{query}
"""

Extract:
1. Query Intent (e.g., 'news', 'facts', 'comparison', 'timeline')
2. Suggested Search Keywords
3. Required Information Types (e.g., statistics, recent news, official sources)
4. Any Time Constraints (e.g., past week, this year)
5. Keyword Clusters: 2 to 4 groups of closely related search phrases. Each group is searched as one query.

Format your output exactly like this:
Intent: ...
Keywords: ...
Info Types: ...
Time Range: ...
Keyword Clusters: [["phrase one", "phrase two"], ["phrase three"]]
"#
    )
}

/// Parse a generator response into a plan, falling back field by field.
pub fn parse_query_plan(response: &str, query: &str) -> QueryPlan {
    let mut plan = QueryPlan::fallback(query);
    let mut seen_intent = false;
    let mut seen_keywords = false;
    let mut seen_info = false;
    let mut seen_time = false;
    let mut seen_clusters = false;

    let lines: Vec<&str> = response.lines().collect();
    for (idx, raw) in lines.iter().enumerate() {
        let line = clean_line(raw);
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "intent" if !seen_intent => {
                seen_intent = true;
                if !value.is_empty() {
                    plan.intent = value.to_string();
                }
            }
            "keywords" if !seen_keywords => {
                seen_keywords = true;
                if !value.is_empty() {
                    plan.keywords = value.to_string();
                }
            }
            "info types" if !seen_info => {
                seen_info = true;
                if !value.is_empty() {
                    plan.info_types = value.to_string();
                }
            }
            "time range" if !seen_time => {
                seen_time = true;
                if !value.is_empty() {
                    plan.time_range = value.to_string();
                }
            }
            "keyword clusters" if !seen_clusters => {
                seen_clusters = true;
                // The list may continue over the following lines.
                let mut rest = value.to_string();
                for next in &lines[idx + 1..] {
                    rest.push('\n');
                    rest.push_str(next);
                }
                match parse_keyword_clusters(&rest) {
                    Some(clusters) => plan.keyword_clusters = clusters,
                    None => warn!("unparseable keyword clusters, searching the raw query"),
                }
            }
            _ => {}
        }
    }

    plan
}

/// Strip list markers and `**` emphasis from a response line.
fn clean_line(raw: &str) -> String {
    let unbolded = raw.replace("**", "");
    let mut line = unbolded.trim();

    line = line.trim_start_matches(['-', '*', '•']).trim_start();

    // Numbered markers: "1." or "2)"
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            line = stripped.trim_start();
        }
    }

    line.to_string()
}

// ---------------------------------------------------------------------------
// Keyword cluster list parser
// ---------------------------------------------------------------------------

/// Parse the first bracketed list of lists of quoted strings in `text`.
///
/// Accepts only brackets, commas, whitespace and `'`/`"` quoted strings with
/// backslash escapes. Phrases are trimmed; empty phrases and clusters are
/// dropped. Returns `None` when the list is malformed or ends up empty.
pub fn parse_keyword_clusters(text: &str) -> Option<Vec<Vec<String>>> {
    let start = text.find('[')?;
    let mut parser = ClusterParser {
        chars: text[start..].chars().peekable(),
    };
    let raw = parser.outer_list()?;

    let clusters: Vec<Vec<String>> = raw
        .into_iter()
        .map(|cluster| {
            cluster
                .into_iter()
                .map(|phrase| phrase.trim().to_string())
                .filter(|phrase| !phrase.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|cluster| !cluster.is_empty())
        .collect();

    if clusters.is_empty() {
        None
    } else {
        Some(clusters)
    }
}

struct ClusterParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl ClusterParser<'_> {
    fn outer_list(&mut self) -> Option<Vec<Vec<String>>> {
        self.list(Self::inner_list)
    }

    fn inner_list(&mut self) -> Option<Vec<String>> {
        self.list(Self::string)
    }

    /// `[ item (, item)* ,? ]` or `[]`.
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Option<T>) -> Option<Vec<T>> {
        self.expect('[')?;
        let mut items = Vec::new();

        self.skip_ws();
        if self.chars.peek() == Some(&']') {
            self.chars.next();
            return Some(items);
        }

        loop {
            self.skip_ws();
            items.push(item(self)?);
            self.skip_ws();
            match self.chars.next()? {
                ',' => {
                    self.skip_ws();
                    if self.chars.peek() == Some(&']') {
                        self.chars.next();
                        return Some(items);
                    }
                }
                ']' => return Some(items),
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = match self.chars.next()? {
            q @ ('"' | '\'') => q,
            _ => return None,
        };

        let mut out = String::new();
        loop {
            match self.chars.next()? {
                '\\' => match self.chars.next()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    other => out.push(other),
                },
                c if c == quote => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn expect(&mut self, want: char) -> Option<()> {
        self.skip_ws();
        (self.chars.next()? == want).then_some(())
    }

    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    const QUERY: &str = "India US trade deal";

    #[test]
    fn test_parse_full_response() {
        let response = r#"Intent: news
Keywords: India US trade agreement 2025
Info Types: official statements, statistics
Time Range: past month
Keyword Clusters: [["india us trade deal", "bilateral trade agreement"], ['tariff negotiations']]"#;

        let plan = parse_query_plan(response, QUERY);
        assert_eq!(plan.intent, "news");
        assert_eq!(plan.keywords, "India US trade agreement 2025");
        assert_eq!(plan.info_types, "official statements, statistics");
        assert_eq!(plan.time_range, "past month");
        assert_eq!(
            plan.keyword_clusters,
            vec![
                vec!["india us trade deal".to_string(), "bilateral trade agreement".to_string()],
                vec!["tariff negotiations".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_markdown_decorations_and_case() {
        let response = "Here is the plan:\n\n- **Intent:** comparison\n2. **KEYWORDS**: ev battery prices\n* time range: this year\n";
        let plan = parse_query_plan(response, QUERY);
        assert_eq!(plan.intent, "comparison");
        assert_eq!(plan.keywords, "ev battery prices");
        assert_eq!(plan.time_range, "this year");
        assert_eq!(plan.info_types, "general");
        assert_eq!(plan.keyword_clusters, vec![vec![QUERY.to_string()]]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let response = "Intent: news\nIntent: timeline\nKeywords:\nKeywords: late value";
        let plan = parse_query_plan(response, QUERY);
        assert_eq!(plan.intent, "news");
        // An empty first value still counts and falls back to the query
        assert_eq!(plan.keywords, QUERY);
    }

    #[test]
    fn test_clusters_spanning_lines() {
        let response = "Intent: facts\nKeyword Clusters:\n```\n[\n  [\"gdp growth\"],\n  [\"inflation rate\", \"cpi\"]\n]\n```";
        let plan = parse_query_plan(response, QUERY);
        assert_eq!(
            plan.keyword_clusters,
            vec![
                vec!["gdp growth".to_string()],
                vec!["inflation rate".to_string(), "cpi".to_string()],
            ]
        );
    }

    #[test]
    fn test_empty_response_is_fallback() {
        assert_eq!(parse_query_plan("", QUERY), QueryPlan::fallback(QUERY));
    }

    #[test]
    fn test_cluster_parser_accepts_escapes_and_trailing_commas() {
        let parsed = parse_keyword_clusters(r#"[["say \"hi\"", 'it\'s',], []]"#).unwrap();
        assert_eq!(parsed, vec![vec!["say \"hi\"".to_string(), "it's".to_string()]]);
    }

    #[test]
    fn test_cluster_parser_rejects_code_and_unbalanced_input() {
        assert!(parse_keyword_clusters(r#"[["a"], ["b"]"#).is_none());
        assert!(parse_keyword_clusters(r#"[["a"], __import__('os')]"#).is_none());
        assert!(parse_keyword_clusters(r#"[["a", 1]]"#).is_none());
        assert!(parse_keyword_clusters(r#"["flat", "list"]"#).is_none());
        assert!(parse_keyword_clusters("no brackets here").is_none());
        assert!(parse_keyword_clusters(r#"[["  "], []]"#).is_none());
    }

    #[test]
    fn test_malformed_clusters_fall_back() {
        let response = "Intent: news\nKeyword Clusters: [[\"unterminated]]";
        let plan = parse_query_plan(response, QUERY);
        assert_eq!(plan.intent, "news");
        assert_eq!(plan.keyword_clusters, vec![vec![QUERY.to_string()]]);
    }

    #[tokio::test]
    async fn test_analyze_query_uses_generator() {
        let generator = ScriptedGenerator::new(|_| {
            Ok("Intent: news\nKeyword Clusters: [[\"india us trade\"]]".to_string())
        });
        let plan = analyze_query(QUERY, &generator).await;
        assert_eq!(plan.intent, "news");
        assert_eq!(plan.keyword_clusters, vec![vec!["india us trade".to_string()]]);

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(QUERY));
    }

    #[tokio::test]
    async fn test_analyze_query_generation_failure() {
        let generator = ScriptedGenerator::failing();
        let plan = analyze_query(QUERY, &generator).await;
        assert_eq!(plan, QueryPlan::fallback(QUERY));
    }
}
