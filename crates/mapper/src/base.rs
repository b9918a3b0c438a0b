use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::{QueryResult, Statement};
use tracing::{debug, instrument};

use crate::adapter::SharedAdapter;
use crate::cache::{CacheKey, CacheKeys, RuntimeCache};
use crate::errors::MapperError;
use crate::registry::AdapterRegistry;

/// Shared state of every mapper: the two adapters, the table name and a
/// runtime cache of `M` values.
///
/// Concrete mappers hold this privately (see [`crate::Mapper`]), which keeps
/// the cache reachable only from the mapper that owns it.
pub struct MapperBase<M> {
    write_adapter: SharedAdapter,
    read_adapter: SharedAdapter,
    table_name: Option<String>,
    cache: RuntimeCache<M>,
}

impl<M> MapperBase<M> {
    /// Resolve adapters and build the base.
    ///
    /// The write adapter is `write`, else the registry default; with neither
    /// this fails with [`MapperError::Configuration`]. The read adapter is
    /// `read`, else the write adapter itself.
    ///
    /// # Examples
    /// ```
    /// use mapper::{AdapterRegistry, MapperBase, SharedAdapter};
    /// use mapper::adapter::mock::RecordingAdapter;
    /// use std::sync::Arc;
    /// let primary: SharedAdapter = RecordingAdapter::shared("primary");
    /// let registry = AdapterRegistry::with_default(primary.clone());
    /// let base = MapperBase::<String>::new(None, None, &registry).unwrap();
    /// assert!(Arc::ptr_eq(base.write_adapter(), &primary));
    /// assert!(Arc::ptr_eq(base.read_adapter(), &primary));
    /// ```
    pub fn new(
        write: Option<SharedAdapter>,
        read: Option<SharedAdapter>,
        registry: &AdapterRegistry,
    ) -> Result<Self, MapperError> {
        let write_adapter = match write {
            Some(a) => a,
            None => {
                let a = registry.default_adapter().ok_or_else(MapperError::no_adapter)?;
                debug!(adapter = a.name(), "write adapter taken from registry default");
                a
            }
        };
        let read_adapter = read.unwrap_or_else(|| Arc::clone(&write_adapter));

        Ok(Self { write_adapter, read_adapter, table_name: None, cache: RuntimeCache::default() })
    }

    /// Same as [`MapperBase::new`] against the process-wide registry.
    pub fn from_global(write: Option<SharedAdapter>, read: Option<SharedAdapter>) -> Result<Self, MapperError> {
        Self::new(write, read, AdapterRegistry::global())
    }

    pub fn builder() -> MapperBaseBuilder<M> { MapperBaseBuilder::default() }

    pub fn read_adapter(&self) -> &SharedAdapter { &self.read_adapter }

    pub fn write_adapter(&self) -> &SharedAdapter { &self.write_adapter }

    pub fn table_name(&self) -> Option<&str> { self.table_name.as_deref() }

    pub fn set_table_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.table_name = Some(name.into());
        self
    }

    /// Run a read statement on the read adapter.
    #[instrument(skip(self, stmt), fields(table = ?self.table_name, adapter = self.read_adapter.name()))]
    pub async fn fetch_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, MapperError> {
        self.read_adapter.query(stmt).await
    }

    /// Run a mutating statement on the write adapter.
    #[instrument(skip(self, stmt), fields(table = ?self.table_name, adapter = self.write_adapter.name()))]
    pub async fn execute(&self, stmt: Statement) -> Result<u64, MapperError> {
        self.write_adapter.execute(stmt).await
    }
}

impl<M: Clone> MapperBase<M> {
    /// Cache `value` under each of `keys`; a single key or a list.
    pub fn set_cache_value(&mut self, value: M, keys: impl Into<CacheKeys>) -> &mut Self {
        self.cache.insert(value, keys);
        self
    }

    /// `None` on a miss. A cached `false`-like value is still `Some`.
    pub fn cache_value(&self, key: impl Into<CacheKey>) -> Option<&M> {
        self.cache.get(key)
    }

    pub fn cache_contains(&self, key: impl Into<CacheKey>) -> bool {
        self.cache.contains(key)
    }

    pub fn cache_len(&self) -> usize { self.cache.len() }
}

impl<M> fmt::Debug for MapperBase<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperBase")
            .field("write_adapter", &self.write_adapter.name())
            .field("read_adapter", &self.read_adapter.name())
            .field("table_name", &self.table_name)
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Chained construction of a [`MapperBase`].
pub struct MapperBaseBuilder<M> {
    write: Option<SharedAdapter>,
    read: Option<SharedAdapter>,
    table_name: Option<String>,
    _model: PhantomData<M>,
}

impl<M> Default for MapperBaseBuilder<M> {
    fn default() -> Self { Self { write: None, read: None, table_name: None, _model: PhantomData } }
}

impl<M> MapperBaseBuilder<M> {
    pub fn write_adapter(mut self, adapter: SharedAdapter) -> Self {
        self.write = Some(adapter);
        self
    }

    pub fn read_adapter(mut self, adapter: SharedAdapter) -> Self {
        self.read = Some(adapter);
        self
    }

    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn build(self, registry: &AdapterRegistry) -> Result<MapperBase<M>, MapperError> {
        let mut base = MapperBase::new(self.write, self.read, registry)?;
        base.table_name = self.table_name;
        Ok(base)
    }
}
