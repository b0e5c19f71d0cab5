use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, TryLockError};

use und_utils::TypeIdMap;

use crate::error::{CodecError, MetaError};
use crate::info::StructInfo;

// -----------------------------------------------------------------------------
// UndStruct

/// A struct whose fields are described by a [`StructInfo`].
///
/// Usually implemented with `#[derive(UndStruct)]`; a hand-written impl
/// assembles the table with [`StructInfo::builder`].
///
/// ```
/// use und_meta::info::{FieldInfo, StructInfo};
/// use und_meta::{MetaError, MetaRegistry, UndStruct};
/// use und_types::Und;
///
/// #[derive(Default)]
/// struct Patch {
///     name: Und<String>,
/// }
///
/// impl UndStruct for Patch {
///     fn build_info(registry: &MetaRegistry) -> Result<StructInfo<Self>, MetaError> {
///         StructInfo::builder(registry, "patch")
///             .field(FieldInfo::new("name", |p: &Patch| &p.name, |p| &mut p.name))
///             .build()
///     }
/// }
///
/// let registry = MetaRegistry::new();
/// let patch: Patch = registry.decode_json(r#"{"name":null}"#).unwrap();
/// assert!(patch.name.is_null());
/// assert_eq!(registry.encode_json(&Patch::default()).unwrap(), "{}");
/// ```
pub trait UndStruct: Sized + 'static {
    fn build_info(registry: &MetaRegistry) -> Result<StructInfo<Self>, MetaError>;
}

// -----------------------------------------------------------------------------
// Build tracking

std::thread_local! {
    // Types whose tables are being built on this thread.
    static BUILDING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

struct BuildGuard(TypeId);

impl BuildGuard {
    fn is_building() -> bool {
        BUILDING.with_borrow(|stack| !stack.is_empty())
    }

    fn enter(id: TypeId) -> Option<Self> {
        BUILDING.with_borrow_mut(|stack| {
            if stack.contains(&id) {
                None
            } else {
                stack.push(id);
                Some(BuildGuard(id))
            }
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with_borrow_mut(|stack| {
            if let Some(pos) = stack.iter().rposition(|id| *id == self.0) {
                stack.remove(pos);
            }
        });
    }
}

// -----------------------------------------------------------------------------
// MetaRegistry

/// Counters describing registry activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Published tables.
    pub entries: usize,
    /// Builds whose table was published. Never exceeds one per type
    /// between clears.
    pub builds: usize,
    /// Failed builds.
    pub failures: usize,
    /// Callers that reused a table published by a concurrent build.
    pub waits: usize,
}

/// A concurrent, lazily filled store of [`StructInfo`] tables.
///
/// Lookups of published tables take a shared read lock only. The first
/// build of each type is serialized through a per-type gate, so a table is
/// published at most once and every caller observes the same `Arc`. Builds
/// of different types proceed in parallel. A build that needs another
/// type whose gate is held by a different thread does not wait for it: it
/// builds its own copy and keeps whichever table was published first, so
/// mutually flattening types fail with [`MetaError::Cycle`] instead of
/// deadlocking. Failed builds publish nothing and are retried by the next
/// caller.
///
/// Tests can create isolated registries with [`MetaRegistry::new`];
/// [`MetaRegistry::global`] is the process-wide instance used by the
/// free functions in [`json`](crate::json) and [`xml`](crate::xml).
pub struct MetaRegistry {
    ready: RwLock<TypeIdMap<Arc<dyn Any + Send + Sync>>>,
    gates: Mutex<TypeIdMap<Arc<Mutex<()>>>>,
    builds: AtomicUsize,
    failures: AtomicUsize,
    waits: AtomicUsize,
}

impl Default for MetaRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for MetaRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MetaRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

impl MetaRegistry {
    /// An empty registry.
    #[inline]
    pub const fn new() -> Self {
        Self {
            ready: RwLock::new(TypeIdMap::new()),
            gates: Mutex::new(TypeIdMap::new()),
            builds: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
        }
    }

    /// The process-wide registry.
    #[inline]
    pub fn global() -> &'static MetaRegistry {
        static GLOBAL: MetaRegistry = MetaRegistry::new();
        &GLOBAL
    }

    /// Returns the published table of `S`, if any.
    pub fn get<S: UndStruct>(&self) -> Option<Arc<StructInfo<S>>> {
        let ready = self.ready.read().unwrap_or_else(PoisonError::into_inner);
        let entry = Arc::clone(ready.get(&TypeId::of::<S>())?);
        drop(ready);
        entry.downcast::<StructInfo<S>>().ok()
    }

    /// Returns the table of `S`, building and publishing it first if needed.
    ///
    /// A type that flattens itself, directly or through other types, fails
    /// with [`MetaError::Cycle`].
    pub fn get_or_build<S: UndStruct>(&self) -> Result<Arc<StructInfo<S>>, MetaError> {
        if let Some(info) = self.get::<S>() {
            return Ok(info);
        }

        let id = TypeId::of::<S>();
        let type_path = type_name::<S>();
        let nested = BuildGuard::is_building();
        let Some(_building) = BuildGuard::enter(id) else {
            return Err(MetaError::Cycle { type_path });
        };

        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(gates.get_or_insert(id, || Arc::new(Mutex::new(()))))
        };
        // A thread already holding a gate never blocks on another one.
        let _gate = if nested {
            match gate.try_lock() {
                Ok(guard) => Some(guard),
                Err(TryLockError::Poisoned(err)) => Some(err.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    log::trace!("`{type_path}` is being built elsewhere, building a local copy");
                    None
                }
            }
        } else {
            Some(gate.lock().unwrap_or_else(PoisonError::into_inner))
        };

        if let Some(info) = self.get::<S>() {
            self.waits.fetch_add(1, Ordering::Relaxed);
            log::trace!("reusing concurrently built metadata for `{type_path}`");
            return Ok(info);
        }

        match S::build_info(self) {
            Ok(info) => {
                let info = Arc::new(info);
                let erased: Arc<dyn Any + Send + Sync> = info.clone();
                let published = Arc::clone(
                    self.ready
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get_or_insert(id, || Arc::clone(&erased)),
                );
                if Arc::ptr_eq(&published, &erased) {
                    self.builds.fetch_add(1, Ordering::Relaxed);
                    log::debug!("built metadata for `{type_path}` ({} fields)", info.len());
                    return Ok(info);
                }
                // Lost the race: the first published table wins.
                self.waits.fetch_add(1, Ordering::Relaxed);
                Ok(published.downcast::<StructInfo<S>>().unwrap_or(info))
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("cannot build metadata for `{type_path}`: {err}");
                Err(err)
            }
        }
    }

    #[inline]
    pub fn contains<S: UndStruct>(&self) -> bool {
        self.ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_type::<S>()
    }

    /// Number of published tables.
    #[inline]
    pub fn len(&self) -> usize {
        self.ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Drops every published table and resets the counters.
    ///
    /// Tables already handed out stay valid.
    pub fn clear(&self) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        self.ready
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        gates.clear();
        self.builds.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.waits.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            entries: self.len(),
            builds: self.builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
        }
    }

    /// [`json::to_string`](crate::json::to_string) against this registry.
    pub fn encode_json<S: UndStruct>(&self, value: &S) -> Result<alloc::string::String, CodecError> {
        Ok(crate::json::encode_struct(value, self)?.to_string())
    }

    /// [`json::from_str`](crate::json::from_str) against this registry.
    pub fn decode_json<S: UndStruct + Default>(&self, text: &str) -> Result<S, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let mut target = S::default();
        crate::json::decode_into(&mut target, &value, self)?;
        Ok(target)
    }
}

// -----------------------------------------------------------------------------
// Tests
