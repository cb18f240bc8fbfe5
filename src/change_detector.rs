//! Diffing of consecutive snapshots.
//!
//! Ranking: only the top 10 is compared, and only entries present in the new
//! top 10 produce events (leaving the top 10 is silent).
//! News: titles not seen in the previous listing.

use std::collections::{HashMap, HashSet};

use crate::types::{ChangeEvent, NewsItem, RankEntry};

pub const TOP_N: usize = 10;

/// First `TOP_N` entries by position ascending.
pub fn top10(entries: &[RankEntry]) -> Vec<&RankEntry> {
    let mut sorted: Vec<&RankEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.position);
    sorted.truncate(TOP_N);
    sorted
}

/// Events in new-top-10 order (current rank ascending).
pub fn detect_ranking_changes(old: &[RankEntry], new: &[RankEntry]) -> Vec<ChangeEvent> {
    let previous: HashMap<&str, &RankEntry> = top10(old)
        .into_iter()
        .map(|e| (e.nickname.as_str(), e))
        .collect();

    let mut events = Vec::new();
    for cur in top10(new) {
        match previous.get(cur.nickname.as_str()) {
            Some(prev) if cur.position < prev.position => events.push(ChangeEvent::RankUp {
                player: cur.nickname.clone(),
                old_position: prev.position,
                new_position: cur.position,
                gp: cur.gp.clone(),
            }),
            Some(prev) if cur.position > prev.position => events.push(ChangeEvent::RankDown {
                player: cur.nickname.clone(),
                old_position: prev.position,
                new_position: cur.position,
                gp: cur.gp.clone(),
            }),
            Some(_) => {}
            None => events.push(ChangeEvent::NewTop10 {
                player: cur.nickname.clone(),
                position: cur.position,
                gp: cur.gp.clone(),
            }),
        }
    }
    events
}

/// Items of `new` whose title is absent from `old`. Empty when either side is
/// empty, so the very first listing never looks like a flood of news.
pub fn detect_news_changes(old: &[NewsItem], new: &[NewsItem]) -> Vec<NewsItem> {
    if old.is_empty() || new.is_empty() {
        return Vec::new();
    }
    let seen: HashSet<&str> = old.iter().map(|n| n.title.as_str()).collect();
    new.iter()
        .filter(|n| !seen.contains(n.title.as_str()))
        .cloned()
        .collect()
}

/// The events worth announcing.
pub fn significant(events: &[ChangeEvent]) -> Vec<&ChangeEvent> {
    events.iter().filter(|e| e.is_significant()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(pos: u32, nick: &str) -> RankEntry {
        RankEntry {
            position: pos,
            nickname: nick.to_string(),
            gp: format!("{}", 10_000 - pos),
            change: String::new(),
            rank_icon_url: String::new(),
        }
    }

    fn n(title: &str) -> NewsItem {
        NewsItem {
            url: format!("https://example.com/{title}"),
            image_url: String::new(),
            title: title.to_string(),
            description: String::new(),
        }
    }

    fn board(nicks: &[&str]) -> Vec<RankEntry> {
        nicks
            .iter()
            .enumerate()
            .map(|(i, nick)| e(i as u32 + 1, nick))
            .collect()
    }

    #[test]
    fn identical_top10_yields_nothing() {
        let old = board(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]);
        let new = old.clone();
        assert!(detect_ranking_changes(&old, &new).is_empty());
    }

    #[test]
    fn swap_emits_up_then_down() {
        let old = vec![e(1, "A"), e(2, "B")];
        let new = vec![e(1, "B"), e(2, "A")];
        let events = detect_ranking_changes(&old, &new);
        assert_eq!(
            events,
            vec![
                ChangeEvent::RankUp {
                    player: "B".into(),
                    old_position: 2,
                    new_position: 1,
                    gp: new[0].gp.clone(),
                },
                ChangeEvent::RankDown {
                    player: "A".into(),
                    old_position: 1,
                    new_position: 2,
                    gp: new[1].gp.clone(),
                },
            ]
        );
        assert_eq!(significant(&events).len(), 1);
    }

    #[test]
    fn newcomer_gets_exactly_one_event() {
        let old = board(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "z"]);
        // z climbs from 11th into 10th, j drops out.
        let new = board(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "z", "j"]);
        let events = detect_ranking_changes(&old, &new);
        assert_eq!(
            events,
            vec![ChangeEvent::NewTop10 {
                player: "z".into(),
                position: 10,
                gp: new[9].gp.clone(),
            }]
        );
    }

    #[test]
    fn leaving_top10_is_silent() {
        let old = board(&["a", "b", "c"]);
        let new = board(&["a", "b"]);
        assert!(detect_ranking_changes(&old, &new).is_empty());
    }

    #[test]
    fn top10_orders_by_position_not_input_order() {
        let shuffled = vec![e(3, "c"), e(1, "a"), e(2, "b")];
        let top: Vec<&str> = top10(&shuffled).iter().map(|r| r.nickname.as_str()).collect();
        assert_eq!(top, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_old_ranking_makes_everyone_new() {
        let new = board(&["a", "b"]);
        let events = detect_ranking_changes(&[], &new);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|ev| matches!(ev, ChangeEvent::NewTop10 { .. })));
    }

    #[test]
    fn news_cold_start_is_suppressed() {
        let new = vec![n("x"), n("y")];
        assert!(detect_news_changes(&[], &new).is_empty());
    }

    #[test]
    fn news_diff_by_exact_title() {
        let old = vec![n("Patch 1.2"), n("Event")];
        let new = vec![n("Patch 1.3"), n("Patch 1.2"), n("event")];
        let fresh = detect_news_changes(&old, &new);
        let titles: Vec<&str> = fresh.iter().map(|x| x.title.as_str()).collect();
        assert_eq!(titles, vec!["Patch 1.3", "event"]);
    }
}
