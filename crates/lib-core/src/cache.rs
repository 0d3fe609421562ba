use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use lru::LruCache;
use regex::Regex;

use crate::errors::{Error, Result};

/// A keyed LRU whose misses are filled by a loader.
///
/// Load failures are returned to the caller and not cached.
pub struct Cache<T: Clone> {
    inner: Mutex<LruCache<String, T>>,
    load: Box<dyn Fn(&str) -> Result<T> + Send + Sync>,
}

impl<T: Clone> Cache<T> {
    pub fn new(capacity: usize, load: impl Fn(&str) -> Result<T> + Send + Sync + 'static) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            load: Box::new(load),
        }
    }

    pub fn get(&self, key: &str) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(hit) = inner.get(key) {
            return Ok(hit.clone());
        }
        let value = (self.load)(key)?;
        inner.put(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

const REGEX_CACHE_CAPACITY: usize = 50;

static REGEXES: OnceLock<Cache<Regex>> = OnceLock::new();

/// Compile a regex through the process-wide LRU.
pub fn regex(pattern: &str) -> Result<Regex> {
    REGEXES
        .get_or_init(|| {
            Cache::new(REGEX_CACHE_CAPACITY, |pattern| {
                Regex::new(pattern)
                    .map_err(|err| Error::InvalidArgument(format!("invalid regex {pattern:?}: {err}")))
            })
        })
        .get(pattern)
}
