use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::catalog::repo::Product;

const EXACT_CAPACITY: usize = 50;
const PREFIX_CAPACITY: usize = 100;
const BY_NAME_CAPACITY: usize = 200;

/// One bounded cache map. Insertion past capacity evicts the oldest entry by
/// insertion order; lookups do not refresh an entry's age.
struct Tier<V> {
    map: HashMap<String, V>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<V: Clone> Tier<V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        self.map.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: V) {
        if self.map.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
            while self.map.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
        }
    }

    fn insert_if_absent(&mut self, key: String, value: V) {
        if !self.map.contains_key(&key) {
            self.insert(key, value);
        }
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// The three search caches: full query -> ranked results, query prefix ->
/// result subset, normalized name -> product. Keys are case-folded. Each tier
/// takes its own lock so exact-hits never contend with prefix population.
pub struct SearchCache {
    exact: Mutex<Tier<Vec<Product>>>,
    prefix: Mutex<Tier<Vec<Product>>>,
    by_name: Mutex<Tier<Product>>,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchCache {
    pub fn new() -> Self {
        Self::with_capacities(EXACT_CAPACITY, PREFIX_CAPACITY, BY_NAME_CAPACITY)
    }

    pub fn with_capacities(exact: usize, prefix: usize, by_name: usize) -> Self {
        Self {
            exact: Mutex::new(Tier::new(exact)),
            prefix: Mutex::new(Tier::new(prefix)),
            by_name: Mutex::new(Tier::new(by_name)),
        }
    }

    pub fn get_exact(&self, query: &str) -> Option<Vec<Product>> {
        self.exact.lock().unwrap().get(query)
    }

    pub fn put_exact(&self, query: String, products: Vec<Product>) {
        self.exact.lock().unwrap().insert(query, products);
    }

    pub fn get_prefix(&self, prefix: &str) -> Option<Vec<Product>> {
        self.prefix.lock().unwrap().get(prefix)
    }

    pub fn put_prefix_if_absent(&self, prefix: String, products: Vec<Product>) {
        self.prefix.lock().unwrap().insert_if_absent(prefix, products);
    }

    pub fn get_by_name(&self, name: &str) -> Option<Product> {
        self.by_name.lock().unwrap().get(name)
    }

    pub fn put_by_name_if_absent(&self, name: String, product: Product) {
        self.by_name.lock().unwrap().insert_if_absent(name, product);
    }

    /// Drops every tier. Only called on explicit invalidation, never as part
    /// of the resolve path.
    pub fn clear(&self) {
        self.exact.lock().unwrap().clear();
        self.prefix.lock().unwrap().clear();
        self.by_name.lock().unwrap().clear();
    }
}
