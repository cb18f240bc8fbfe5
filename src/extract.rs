// src/extract.rs
//! Extraction of leaderboard rows, news cards and pagination labels from raw
//! page markup. Pure functions; malformed input yields empty output.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::types::{NewsItem, RankEntry};

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static RANK_ROWS: Lazy<Selector> = Lazy::new(|| selector("table.table-hover tbody tr"));
static ROW_CELLS: Lazy<Selector> = Lazy::new(|| selector("th"));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img"));
static NEWS_CARDS: Lazy<Selector> = Lazy::new(|| selector(".gb-sc-news-wrapper"));
static NEWS_TITLE: Lazy<Selector> = Lazy::new(|| selector(".gb-sc-news-title"));
static NEWS_TEXT: Lazy<Selector> = Lazy::new(|| selector("p"));
static PAGE_LINKS: Lazy<Selector> = Lazy::new(|| selector("ul.pagination li a.page-link"));

/// Concatenate text nodes and collapse whitespace.
fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_img_src(el: ElementRef<'_>) -> Option<String> {
    el.select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse one leaderboard page. Rows missing any of the five fields are skipped.
pub fn extract_ranking(html: &str) -> Vec<RankEntry> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for row in doc.select(&RANK_ROWS) {
        let cells: Vec<ElementRef<'_>> = row.select(&ROW_CELLS).collect();
        let [pos, icon, nick, gp, change, ..] = cells.as_slice() else {
            continue;
        };

        let Ok(position) = text_of(*pos).parse::<u32>() else {
            continue;
        };
        let Some(rank_icon_url) = first_img_src(*icon) else {
            continue;
        };
        let nickname = text_of(*nick);
        if nickname.is_empty() {
            continue;
        }

        out.push(RankEntry {
            position,
            nickname,
            gp: text_of(*gp),
            change: text_of(*change),
            rank_icon_url,
        });
    }

    out
}

/// Parse the news listing. Cards without a title are skipped.
pub fn extract_news(html: &str) -> Vec<NewsItem> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for card in doc.select(&NEWS_CARDS) {
        let title = card
            .select(&NEWS_TITLE)
            .next()
            .map(text_of)
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        out.push(NewsItem {
            url: card.value().attr("href").unwrap_or_default().trim().to_string(),
            image_url: first_img_src(card).unwrap_or_default(),
            title,
            description: card.select(&NEWS_TEXT).map(text_of).collect::<Vec<_>>().join(" "),
        });
    }

    out
}

/// Labels of the pagination control, in document order ("«", "1", "2", "»", ...).
pub fn extract_page_labels(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&PAGE_LINKS)
        .map(text_of)
        .filter(|s| !s.is_empty())
        .collect()
}
