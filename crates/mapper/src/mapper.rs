//! Extension point for concrete mappers.
//!
//! A concrete mapper wraps a [`MapperBase`] in a private field and adds its
//! own table-specific methods. [`build_mapper`] resolves the adapters, wraps
//! the base and then calls [`Mapper::init`] exactly once before handing the
//! mapper back.
//!
//! The trait hooks take a [`BaseAccess`] token that only this crate can
//! create, so callers holding a mapper can neither reach its base (and
//! cache) nor assemble or re-initialise one outside [`build_mapper`].

use tracing::debug;

use crate::adapter::SharedAdapter;
use crate::base::MapperBase;
use crate::errors::MapperError;
use crate::registry::AdapterRegistry;

/// Capability passed to the [`Mapper`] hooks. Not constructible outside
/// this crate.
///
/// ```compile_fail
/// let access = mapper::BaseAccess(());
/// ```
#[derive(Debug)]
pub struct BaseAccess(());

impl BaseAccess {
    fn new() -> Self { BaseAccess(()) }
}

pub trait Mapper: Sized {
    /// Value type kept in the runtime cache, usually the mapped entity.
    type Model: Clone;

    fn from_base(base: MapperBase<Self::Model>, access: BaseAccess) -> Self;

    fn base(&self, access: &BaseAccess) -> &MapperBase<Self::Model>;

    /// Runs once after the adapters are assigned. No-op by default.
    fn init(&mut self, _access: &BaseAccess) {}

    fn read_adapter(&self) -> &SharedAdapter { self.base(&BaseAccess::new()).read_adapter() }

    fn write_adapter(&self) -> &SharedAdapter { self.base(&BaseAccess::new()).write_adapter() }

    fn table_name(&self) -> Option<&str> { self.base(&BaseAccess::new()).table_name() }
}

/// Build `T` with adapters resolved against `registry`.
///
/// # Examples
/// ```
/// use mapper::{build_mapper, AdapterRegistry, BaseAccess, Mapper, MapperBase};
/// use mapper::adapter::mock::RecordingAdapter;
///
/// struct TagMapper { base: MapperBase<String> }
///
/// impl Mapper for TagMapper {
///     type Model = String;
///     fn from_base(base: MapperBase<String>, _: BaseAccess) -> Self { Self { base } }
///     fn base(&self, _: &BaseAccess) -> &MapperBase<String> { &self.base }
///     fn init(&mut self, _: &BaseAccess) { self.base.set_table_name("tags"); }
/// }
///
/// let registry = AdapterRegistry::with_default(RecordingAdapter::shared("primary"));
/// let tags: TagMapper = build_mapper(None, None, &registry).unwrap();
/// assert_eq!(tags.table_name(), Some("tags"));
/// ```
///
/// Outside code cannot skip `init` by wrapping a base itself:
///
/// ```compile_fail
/// use mapper::{AdapterRegistry, BaseAccess, Mapper, MapperBase};
/// use mapper::adapter::mock::RecordingAdapter;
///
/// struct TagMapper { base: MapperBase<String> }
///
/// impl Mapper for TagMapper {
///     type Model = String;
///     fn from_base(base: MapperBase<String>, _: BaseAccess) -> Self { Self { base } }
///     fn base(&self, _: &BaseAccess) -> &MapperBase<String> { &self.base }
/// }
///
/// let registry = AdapterRegistry::with_default(RecordingAdapter::shared("primary"));
/// let base = MapperBase::new(None, None, &registry).unwrap();
/// let tags = TagMapper::from_base(base, BaseAccess(()));
/// ```
pub fn build_mapper<T: Mapper>(
    write: Option<SharedAdapter>,
    read: Option<SharedAdapter>,
    registry: &AdapterRegistry,
) -> Result<T, MapperError> {
    let base = MapperBase::new(write, read, registry)?;
    let access = BaseAccess::new();
    let mut mapper = T::from_base(base, BaseAccess::new());
    mapper.init(&access);
    debug!(
        mapper = std::any::type_name::<T>(),
        table = ?mapper.table_name(),
        write = mapper.write_adapter().name(),
        read = mapper.read_adapter().name(),
        "mapper ready"
    );
    Ok(mapper)
}

/// [`build_mapper`] against the process-wide registry.
pub fn build_mapper_global<T: Mapper>(
    write: Option<SharedAdapter>,
    read: Option<SharedAdapter>,
) -> Result<T, MapperError> {
    build_mapper(write, read, AdapterRegistry::global())
}
