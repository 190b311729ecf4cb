//! In-memory [`PageSource`] for tests

use crate::upstream::PageSource;
use crate::{HolonetError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use swapi::{id_from_url, Collection, Envelope};

const BASE: &str = "https://swapi.test/api";

pub(crate) struct FakeSource {
    data: HashMap<Collection, Vec<Value>>,
    page_size: usize,
    count_override: Option<u64>,
    failing: HashSet<(Collection, u32)>,
    reverse_latency: bool,
    page_calls: Mutex<HashMap<Collection, usize>>,
    entity_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn label(collection: Collection) -> &'static str {
    match collection {
        Collection::Films => "Film",
        Collection::People => "Person",
        Collection::Planets => "Planet",
        Collection::Species => "Species",
        Collection::Starships => "Starship",
        Collection::Vehicles => "Vehicle",
    }
}

fn url(collection: Collection, id: usize) -> String {
    format!("{}/{}/{}/", BASE, collection.key(), id)
}

/// Numbered entities `"<Label> 1"`..`"<Label> n"`
fn numbered(collection: Collection, n: usize) -> Vec<Value> {
    (1..=n)
        .map(|i| match collection {
            Collection::Films => json!({
                "title": format!("Film {}", i),
                "episode_id": i,
                "opening_crawl": "",
                "director": "George Lucas",
                "url": url(collection, i),
            }),
            _ => json!({
                "name": format!("{} {}", label(collection), i),
                "url": url(collection, i),
            }),
        })
        .collect()
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self {
            data: HashMap::new(),
            page_size: 10,
            count_override: None,
            failing: HashSet::new(),
            reverse_latency: false,
            page_calls: Mutex::new(HashMap::new()),
            entity_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_raw(mut self, collection: Collection, items: Vec<Value>) -> Self {
        self.data.insert(collection, items);
        self
    }

    pub(crate) fn with_numbered(self, collection: Collection, n: usize) -> Self {
        self.with_raw(collection, numbered(collection, n))
    }

    pub(crate) fn with_planets(self, n: usize) -> Self {
        self.with_numbered(Collection::Planets, n)
    }

    /// A few entities in every collection
    pub(crate) fn with_all_collections(mut self, n: usize) -> Self {
        for collection in Collection::ALL {
            self = self.with_numbered(collection, n);
        }
        self
    }

    pub(crate) fn with_films(self, films: &[(&str, &str)]) -> Self {
        let items = films
            .iter()
            .enumerate()
            .map(|(i, (title, crawl))| {
                json!({
                    "title": title,
                    "episode_id": i + 1,
                    "opening_crawl": crawl,
                    "url": url(Collection::Films, i + 1),
                })
            })
            .collect();
        self.with_raw(Collection::Films, items)
    }

    pub(crate) fn with_people(self, names: &[&str]) -> Self {
        let items = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"name": name, "url": url(Collection::People, i + 1)}))
            .collect();
        self.with_raw(Collection::People, items)
    }

    pub(crate) fn fail_page(mut self, collection: Collection, page: u32) -> Self {
        self.failing.insert((collection, page));
        self
    }

    pub(crate) fn overstate_count(mut self, count: u64) -> Self {
        self.count_override = Some(count);
        self
    }

    /// Make higher pages answer faster than lower ones
    pub(crate) fn reverse_latency(mut self) -> Self {
        self.reverse_latency = true;
        self
    }

    pub(crate) fn page_calls(&self, collection: Collection) -> usize {
        self.page_calls
            .lock()
            .unwrap()
            .get(&collection)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_page_calls(&self) -> usize {
        self.page_calls.lock().unwrap().values().sum()
    }

    pub(crate) fn entity_calls(&self) -> usize {
        self.entity_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn serve_page(&self, collection: Collection, page: u32) -> Result<Envelope<Value>> {
        if self.reverse_latency {
            let millis = 40u64.saturating_sub(page as u64 * 3).max(1);
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }

        if self.failing.contains(&(collection, page)) {
            return Err(HolonetError::UpstreamUnavailable(format!(
                "{} page {}: HTTP 500",
                collection, page
            )));
        }

        let items = self.data.get(&collection).cloned().unwrap_or_default();
        let count = self.count_override.unwrap_or(items.len() as u64);
        let start = (page as usize - 1) * self.page_size;
        if page > 1 && start >= items.len() {
            return Err(HolonetError::NotFound(format!("{} page {}", collection, page)));
        }

        let end = (start + self.page_size).min(items.len());
        let next = ((page as u64) * (self.page_size as u64) < count)
            .then(|| format!("{}/{}/?page={}", BASE, collection.key(), page + 1));

        Ok(Envelope {
            count,
            next,
            previous: None,
            results: items[start..end].to_vec(),
        })
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch_page(&self, collection: Collection, page: u32) -> Result<Envelope<Value>> {
        *self
            .page_calls
            .lock()
            .unwrap()
            .entry(collection)
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.serve_page(collection, page).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch_entity(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        self.entity_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self.data.get(&collection).and_then(|items| {
            items
                .iter()
                .find(|item| item["url"].as_str().and_then(id_from_url) == Some(id))
                .cloned()
        }))
    }
}
