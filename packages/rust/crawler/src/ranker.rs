//! Query relevance ranking of candidate links.
//!
//! Each link URL is treated as its own document and weighted with smoothed
//! TF-IDF over the set `{query} ∪ links`. Links are ordered by cosine
//! similarity to the query; equal scores keep discovery order. Ranking is a
//! prioritisation heuristic only: when no features can be built the first
//! `top_k` links are returned unchanged.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Runs of two or more word characters.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token regex"));

type TermVector = HashMap<String, f64>;

/// Rank `links` against `query`, returning at most `top_k` distinct links.
pub fn rank_links(links: &[String], query: &str, top_k: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let unique: Vec<&String> = links
        .iter()
        .filter(|link| seen.insert(link.as_str()))
        .collect();

    if unique.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let Some(scores) = similarity_scores(query, &unique) else {
        debug!(links = unique.len(), "empty vocabulary, keeping discovery order");
        return unique.into_iter().take(top_k).cloned().collect();
    };

    let mut order: Vec<usize> = (0..unique.len()).collect();
    // `sort_by` is stable, so ties stay in discovery order
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    order
        .into_iter()
        .take(top_k)
        .map(|i| unique[i].clone())
        .collect()
}

/// Cosine similarity of the query against each link, or `None` when the
/// combined vocabulary is empty.
fn similarity_scores(query: &str, links: &[&String]) -> Option<Vec<f64>> {
    let docs: Vec<Vec<String>> = std::iter::once(query)
        .chain(links.iter().map(|l| l.as_str()))
        .map(tokenize)
        .collect();

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for tokens in &docs {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    if doc_freq.is_empty() {
        return None;
    }

    let n = docs.len() as f64;
    let idf: HashMap<&str, f64> = doc_freq
        .iter()
        .map(|(term, df)| (*term, ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0))
        .collect();

    let mut vectors = docs.iter().map(|tokens| weigh(tokens, &idf));
    let query_vec = vectors.next()?;

    Some(vectors.map(|link_vec| dot(&query_vec, &link_vec)).collect())
}

fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// L2-normalised TF-IDF vector of one document.
fn weigh(tokens: &[String], idf: &HashMap<&str, f64>) -> TermVector {
    let mut vector = TermVector::new();
    for token in tokens {
        let weight = idf.get(token.as_str()).copied().unwrap_or(0.0);
        *vector.entry(token.clone()).or_insert(0.0) += weight;
    }

    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
    vector
}

fn dot(a: &TermVector, b: &TermVector) -> f64 {
    a.iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum()
}
