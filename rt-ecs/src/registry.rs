use crate::entity::Entity;
use crate::error::EcsError;
use crate::storage::{AnyStorage, SparseSet};
use hashbrown::HashMap;
use std::any::TypeId;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Marker for types storable as components. Blanket-implemented; nothing to configure per type.
pub trait Component: 'static + Send + Sync {}
impl<T: 'static + Send + Sync> Component for T {}

pub(crate) struct Inner {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
}

impl Inner {
    fn is_alive(&self, e: Entity) -> bool {
        let idx = e.index_usize();
        idx < self.generations.len() && self.generations[idx] == e.generation() && self.alive[idx]
    }

    pub(crate) fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .map(|s| s.as_any().downcast_ref::<SparseSet<T>>().expect("storage type mismatch"))
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .map(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>().expect("storage type mismatch"))
    }
}

/// Entity and component store. Owns one reader-writer lock: `spawn`/`kill`/`add`/`remove` take
/// the write side, `get`/`get_mut`/`view` take the read (or write, for `get_mut`) side for the
/// duration the caller holds the returned guard.
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            inner: RwLock::new(Inner {
                generations: Vec::new(),
                alive: Vec::new(),
                free: Vec::new(),
                storages: HashMap::new(),
            }),
        }
    }

    /// Registers a component type's storage. Idempotent; call before first `add::<T>`.
    pub fn register<T: Component>(&self) {
        let mut inner = self.inner.write().unwrap();
        inner
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));
    }

    pub fn spawn(&self) -> Result<Entity, EcsError> {
        let mut inner = self.inner.write().unwrap();

        if let Some(idx) = inner.free.pop() {
            inner.alive[idx as usize] = true;
            return Ok(Entity::new(idx, inner.generations[idx as usize]));
        }

        let idx = inner.generations.len();
        if idx > u32::MAX as usize {
            return Err(EcsError::RegistryFull);
        }

        inner.generations.push(0);
        inner.alive.push(true);
        Ok(Entity::new(idx as u32, 0))
    }

    /// Destroys `e`, bumping its generation and dropping every component it owned.
    pub fn kill(&self, e: Entity) {
        let mut inner = self.inner.write().unwrap();
        if !inner.is_alive(e) {
            return;
        }

        let idx = e.index_usize();
        inner.alive[idx] = false;
        inner.generations[idx] = inner.generations[idx].wrapping_add(1);
        inner.free.push(e.index());

        for storage in inner.storages.values_mut() {
            storage.remove_any(e);
        }
    }

    pub fn is_alive(&self, e: Entity) -> bool {
        self.inner.read().unwrap().is_alive(e)
    }

    pub fn add<T: Component>(&self, e: Entity, value: T) -> Result<(), EcsError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.is_alive(e) {
            return Err(EcsError::StaleEntity);
        }
        let storage = inner.storage_mut::<T>().ok_or(EcsError::ComponentTypeUnregistered)?;
        storage.insert(e, value);
        Ok(())
    }

    pub fn has<T: Component>(&self, e: Entity) -> bool {
        let inner = self.inner.read().unwrap();
        inner.is_alive(e) && inner.storage::<T>().map_or(false, |s| s.contains(e))
    }

    pub fn remove<T: Component>(&self, e: Entity) -> Result<T, EcsError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.is_alive(e) {
            return Err(EcsError::StaleEntity);
        }
        let storage = inner.storage_mut::<T>().ok_or(EcsError::ComponentTypeUnregistered)?;
        storage.remove(e).ok_or(EcsError::ComponentMissing)
    }

    pub fn get<T: Component>(&self, e: Entity) -> Result<ComponentRef<'_, T>, EcsError> {
        let guard = self.inner.read().unwrap();
        if !guard.is_alive(e) {
            return Err(EcsError::StaleEntity);
        }
        let ptr = guard
            .storage::<T>()
            .ok_or(EcsError::ComponentTypeUnregistered)?
            .get(e)
            .ok_or(EcsError::ComponentMissing)? as *const T;
        Ok(ComponentRef { guard, ptr, _marker: PhantomData })
    }

    pub fn get_mut<T: Component>(&self, e: Entity) -> Result<ComponentRefMut<'_, T>, EcsError> {
        let mut guard = self.inner.write().unwrap();
        if !guard.is_alive(e) {
            return Err(EcsError::StaleEntity);
        }
        let ptr = guard
            .storage_mut::<T>()
            .ok_or(EcsError::ComponentTypeUnregistered)?
            .get_mut(e)
            .ok_or(EcsError::ComponentMissing)? as *mut T;
        Ok(ComponentRefMut { guard, ptr, _marker: PhantomData })
    }

    pub(crate) fn lock_read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap()
    }
}

/// Shared borrow of a component, tied to the registry's read lock.
pub struct ComponentRef<'r, T> {
    #[allow(dead_code)]
    guard: RwLockReadGuard<'r, Inner>,
    ptr: *const T,
    _marker: PhantomData<&'r T>,
}

impl<'r, T> Deref for ComponentRef<'r, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: `ptr` was derived from a reference into `guard`, and the read lock guarantees
        // no concurrent mutation for as long as `guard` (and therefore `self`) is alive.
        unsafe { &*self.ptr }
    }
}

/// Exclusive borrow of a component, tied to the registry's write lock.
pub struct ComponentRefMut<'r, T> {
    #[allow(dead_code)]
    guard: RwLockWriteGuard<'r, Inner>,
    ptr: *mut T,
    _marker: PhantomData<&'r mut T>,
}

impl<'r, T> Deref for ComponentRefMut<'r, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.ptr }
    }
}

impl<'r, T> DerefMut for ComponentRefMut<'r, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: see ComponentRef::deref; we hold the write lock exclusively.
        unsafe { &mut *self.ptr }
    }
}
