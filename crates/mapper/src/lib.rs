//! Data mapper base: read/write adapter resolution, a default-adapter
//! registry and a per-instance runtime cache.
//! - `MapperBase` owns the adapters and the cache.
//! - Concrete mappers wrap a `MapperBase` and implement [`Mapper`].
//! - Adapters are shared handles behind the [`DataAdapter`] trait.

pub mod adapter;
pub mod base;
pub mod bootstrap;
pub mod cache;
pub mod errors;
pub mod mapper;
pub mod registry;

pub use adapter::{DataAdapter, SeaOrmAdapter, SharedAdapter};
pub use base::{MapperBase, MapperBaseBuilder};
pub use cache::{CacheKey, CacheKeys, RuntimeCache};
pub use errors::MapperError;
pub use mapper::{build_mapper, build_mapper_global, BaseAccess, Mapper};
pub use registry::{default_adapter, set_default_adapter, AdapterRegistry};
