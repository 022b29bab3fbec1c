use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::repo::{self as catalog, Product};
use crate::config::SearchConfig;
use crate::search::cache::SearchCache;
use crate::search::normalize;
use crate::search::provider::{RawProduct, SearchProvider};

/// Result of a resolve call. `Superseded` means a newer query for the same
/// field arrived while this one was in flight; its results must not be shown.
#[derive(Debug)]
pub enum SearchOutcome {
    Results(Vec<Product>),
    Superseded,
}

/// Orchestrates cache, catalog and remote lookups for type-ahead product
/// search. One logical search field per user; the newest call for a field
/// always wins.
pub struct SearchCoordinator {
    db: SqlitePool,
    provider: Arc<dyn SearchProvider>,
    cache: Arc<SearchCache>,
    config: SearchConfig,
    generations: Mutex<HashMap<Uuid, u64>>,
}

impl SearchCoordinator {
    pub fn new(
        db: SqlitePool,
        provider: Arc<dyn SearchProvider>,
        cache: Arc<SearchCache>,
        config: SearchConfig,
    ) -> Self {
        Self {
            db,
            provider,
            cache,
            config,
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, field: Uuid, query: &str) -> anyhow::Result<SearchOutcome> {
        self.resolve_with_partial(field, query, None).await
    }

    /// Full resolve pipeline. When `partial` is given, locally-known results
    /// are delivered through it as soon as they are available, before the
    /// remote lookup settles.
    pub async fn resolve_with_partial(
        &self,
        field: Uuid,
        query: &str,
        partial: Option<mpsc::UnboundedSender<Vec<Product>>>,
    ) -> anyhow::Result<SearchOutcome> {
        let folded = normalize::fold(query);
        // каждый новый ввод вытесняет предыдущий незавершённый поиск
        let generation = self.begin(field);

        if folded.chars().count() < 2 {
            return Ok(SearchOutcome::Results(Vec::new()));
        }

        if let Some(hit) = self.cache.get_exact(&folded) {
            debug!(query = %folded, hits = hit.len(), "exact cache hit");
            return Ok(SearchOutcome::Results(hit));
        }

        if let Some(filtered) = self.prefix_cache_lookup(&folded) {
            debug!(query = %folded, hits = filtered.len(), "prefix cache hit");
            return Ok(SearchOutcome::Results(filtered));
        }

        let local_fut = async {
            let found = match catalog::find_by_prefix(&self.db, &folded, self.config.local_limit)
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, query = %folded, "local catalog lookup failed");
                    Vec::new()
                }
            };
            if let Some(tx) = &partial {
                if !found.is_empty() {
                    let _ = tx.send(found.clone());
                }
            }
            found
        };

        let remote_fut = async {
            if folded.chars().count() < self.config.min_remote_chars {
                return Vec::new();
            }
            let deadline = Duration::from_millis(self.config.remote_timeout_ms);
            match timeout(deadline, self.provider.search(&folded)).await {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    warn!(error = %e, query = %folded, "food provider error");
                    Vec::new()
                }
                Err(_) => {
                    debug!(query = %folded, "food provider timed out");
                    Vec::new()
                }
            }
        };

        let (local, raw_remote) = tokio::join!(local_fut, remote_fut);

        let remote = convert_raw(raw_remote);
        let local_names: HashSet<String> =
            local.iter().map(|p| p.name.to_lowercase()).collect();
        let fresh_remote: Vec<Product> = remote
            .iter()
            .filter(|p| !local_names.contains(&p.name.to_lowercase()))
            .cloned()
            .collect();

        let mut merged = local;
        merged.extend(fresh_remote.iter().cloned());
        merged.truncate(self.config.result_cap);
        rank(&mut merged, &folded);

        // кэши можно пополнять даже из вытесненного вызова
        if !merged.is_empty() {
            self.populate_caches(&folded, &merged);
        }

        if !self.is_current(field, generation) {
            debug!(query = %folded, "search superseded");
            return Ok(SearchOutcome::Superseded);
        }

        self.persist_remote(&fresh_remote).await;

        Ok(SearchOutcome::Results(merged))
    }

    /// Resolves a picked suggestion without another search round trip.
    pub async fn resolve_selection(&self, name: &str) -> anyhow::Result<Option<Product>> {
        if let Some(product) = self.cache.get_by_name(&normalize::fold(name)) {
            return Ok(Some(product));
        }
        catalog::find_by_name(&self.db, name).await
    }

    /// Explicit cache invalidation.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    fn begin(&self, field: Uuid) -> u64 {
        let mut generations = self.generations.lock().unwrap();
        let entry = generations.entry(field).or_insert(0);
        *entry += 1;
        *entry
    }

    fn is_current(&self, field: Uuid, generation: u64) -> bool {
        self.generations.lock().unwrap().get(&field) == Some(&generation)
    }

    /// Longest matching prefix wins; its cached superset is narrowed to names
    /// containing the whole query.
    fn prefix_cache_lookup(&self, folded: &str) -> Option<Vec<Product>> {
        let chars: Vec<char> = folded.chars().collect();
        for len in (2..=chars.len()).rev() {
            let prefix: String = chars[..len].iter().collect();
            if let Some(cached) = self.cache.get_prefix(&prefix) {
                let filtered: Vec<Product> = cached
                    .into_iter()
                    .filter(|p| p.name.to_lowercase().contains(folded))
                    .collect();
                if !filtered.is_empty() {
                    return Some(filtered);
                }
            }
        }
        None
    }

    fn populate_caches(&self, folded: &str, merged: &[Product]) {
        self.cache.put_exact(folded.to_string(), merged.to_vec());

        let chars: Vec<char> = folded.chars().collect();
        for len in 2..=chars.len() {
            let prefix: String = chars[..len].iter().collect();
            let subset: Vec<Product> = merged
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&prefix))
                .cloned()
                .collect();
            if !subset.is_empty() {
                self.cache.put_prefix_if_absent(prefix, subset);
            }
        }

        for product in merged {
            self.cache
                .put_by_name_if_absent(product.name.to_lowercase(), product.clone());
        }
    }

    /// Remote-derived products become local catalog rows so the next
    /// identical query resolves without the network. Failures here never
    /// fail the search.
    async fn persist_remote(&self, fresh_remote: &[Product]) {
        for product in fresh_remote {
            if let Err(e) = catalog::insert_if_absent(&self.db, product).await {
                warn!(error = %e, name = %product.name, "failed to persist remote product");
            }
        }
    }
}

/// Normalizes provider hits, drops unusable candidates (no name, all-zero
/// nutrient placeholder) and deduplicates by normalized name, keeping the
/// first occurrence.
fn convert_raw(raw: Vec<RawProduct>) -> Vec<Product> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for hit in raw {
        let Some(raw_name) = hit.product_name else {
            continue;
        };
        let name = normalize::normalize(&raw_name);
        if name.is_empty() {
            continue;
        }
        let nutrients = hit.nutriments.unwrap_or_default();
        let calories = nutrients.energy_kcal_100g.unwrap_or(0.0);
        let protein = nutrients.proteins_100g.unwrap_or(0.0);
        let fat = nutrients.fat_100g.unwrap_or(0.0);
        let carbs = nutrients.carbohydrates_100g.unwrap_or(0.0);
        if calories == 0.0 && protein == 0.0 && fat == 0.0 && carbs == 0.0 {
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            continue;
        }
        out.push(Product {
            id: None,
            name,
            calories,
            protein,
            fat,
            carbs,
            brand: hit.brands,
            barcode: hit.code,
        });
    }
    out
}

/// Exact match, then starts-with, then contains; ties keep their order.
fn rank(products: &mut [Product], folded_query: &str) {
    products.sort_by_key(|p| {
        let name = p.name.to_lowercase();
        if name == folded_query {
            0
        } else if name.starts_with(folded_query) {
            1
        } else if name.contains(folded_query) {
            2
        } else {
            3
        }
    });
}
