// tests/common/mod.rs
//
// In-process stand-ins for the scraped site and the push provider, plus HTML
// builders matching the site's markup.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use gunbound_rank_relay::error::{NotifyError, ScrapeError};
use gunbound_rank_relay::notify::PushSender;
use gunbound_rank_relay::site::{PageSource, Site};
use gunbound_rank_relay::subscriptions::{MemorySubscriptionStore, SubscriptionStore};
use gunbound_rank_relay::types::HelperContact;
use gunbound_rank_relay::{assemble, AppState};

pub const REGION: &str = "EN";

#[derive(Clone)]
struct Page {
    body: Option<String>,
    delay: Duration,
}

/// Path → canned page. Unknown paths answer 404.
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, Page>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, path: &str, body: impl Into<String>) {
        self.set_delayed(path, body, Duration::ZERO);
    }

    pub fn set_delayed(&self, path: &str, body: impl Into<String>, delay: Duration) {
        self.pages.lock().insert(
            path.to_string(),
            Page {
                body: Some(body.into()),
                delay,
            },
        );
    }

    /// Make `path` answer with HTTP 503.
    pub fn fail(&self, path: &str) {
        self.pages.lock().insert(
            path.to_string(),
            Page {
                body: None,
                delay: Duration::ZERO,
            },
        );
    }

    /// Install a leaderboard: pagination on the index page, `per_page` rows per page.
    pub fn set_ranking(&self, nicks: &[&str], per_page: usize) {
        let pages: Vec<&[&str]> = nicks.chunks(per_page.max(1)).collect();
        self.set(&format!("/rank/{REGION}"), pagination_html(pages.len().max(1) as u32));
        for (i, chunk) in pages.iter().enumerate() {
            let first = (i * per_page) as u32 + 1;
            let rows: Vec<(u32, &str)> = chunk
                .iter()
                .enumerate()
                .map(|(j, n)| (first + j as u32, *n))
                .collect();
            self.set(&format!("/rank/{REGION}?page={}", i + 1), rank_page_html(&rows));
        }
    }

    pub fn set_news(&self, titles: &[&str]) {
        self.set(&format!("/news/{REGION}"), news_html(titles));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|p| p.as_str() == path).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for FakeSite {
    async fn fetch(&self, path: &str) -> Result<String, ScrapeError> {
        self.calls.lock().push(path.to_string());
        let page = self.pages.lock().get(path).cloned();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(p) = &page {
            if !p.delay.is_zero() {
                tokio::time::sleep(p.delay).await;
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match page {
            Some(Page { body: Some(b), .. }) => Ok(b),
            Some(Page { body: None, .. }) => Err(ScrapeError::Status {
                url: path.to_string(),
                status: 503,
            }),
            None => Err(ScrapeError::Status {
                url: path.to_string(),
                status: 404,
            }),
        }
    }
}

/// Records every delivery; tokens listed in `failing` are refused.
#[derive(Default)]
pub struct FakePush {
    pub sent: Mutex<Vec<(String, String, String)>>,
    failing: Mutex<Vec<String>>,
}

impl FakePush {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, token: &str) {
        self.failing.lock().push(token.to_string());
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PushSender for FakePush {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<Value, NotifyError> {
        if self.failing.lock().iter().any(|t| t == token) {
            return Err(NotifyError::Rejected("DeviceNotRegistered".into()));
        }
        self.sent
            .lock()
            .push((token.to_string(), title.to_string(), body.to_string()));
        Ok(json!({ "data": { "status": "ok", "id": "ticket-1" } }))
    }
}

pub struct Harness {
    pub site: Arc<FakeSite>,
    pub push: Arc<FakePush>,
    pub subs: Arc<MemorySubscriptionStore>,
    pub state: AppState,
}

pub fn harness() -> Harness {
    harness_with_concurrency(4)
}

pub fn harness_with_concurrency(max_pages: usize) -> Harness {
    let site = FakeSite::new();
    let push = FakePush::new();
    let subs = Arc::new(MemorySubscriptionStore::new());

    let reader = Arc::new(Site::new(site.clone(), REGION, max_pages));
    let helpers = vec![HelperContact {
        name: "Ana".into(),
        role: "Game master".into(),
        contact: "discord:ana".into(),
    }];
    let state = assemble(
        reader,
        subs.clone() as Arc<dyn SubscriptionStore>,
        push.clone(),
        helpers,
    );

    Harness {
        site,
        push,
        subs,
        state,
    }
}

pub fn pagination_html(pages: u32) -> String {
    let mut links = String::from(r#"<li class="page-item"><a class="page-link" href="?page=1">«</a></li>"#);
    for p in 1..=pages {
        links.push_str(&format!(
            r#"<li class="page-item"><a class="page-link" href="?page={p}">{p}</a></li>"#
        ));
    }
    links.push_str(r#"<li class="page-item"><a class="page-link" href="?page=2">»</a></li>"#);
    format!(r#"<html><body><ul class="pagination">{links}</ul></body></html>"#)
}

pub fn rank_page_html(rows: &[(u32, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(pos, nick)| {
            format!(
                r#"<tr><th>{pos}</th><th><img src="/img/rank/{pos}.png"></th><th>{nick}</th><th>{gp}</th><th>-</th></tr>"#,
                gp = 100_000 - pos * 10
            )
        })
        .collect();
    format!(r#"<html><body><table class="table table-hover"><tbody>{body}</tbody></table></body></html>"#)
}

pub fn news_html(titles: &[&str]) -> String {
    let cards: String = titles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                r#"<a class="gb-sc-news-wrapper" href="/news/{REGION}/{i}"><img src="/n/{i}.jpg"><div class="gb-sc-news-title">{t}</div><p>About {t}</p></a>"#
            )
        })
        .collect();
    format!("<html><body><div>{cards}</div></body></html>")
}

pub const TOKEN_A: &str = "ExponentPushToken[aaaa]";
pub const TOKEN_B: &str = "ExpoPushToken[bbbb]";
pub const TOKEN_C: &str = "ExponentPushToken[cccc]";
