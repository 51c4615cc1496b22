//! Joined iteration over two or more component storages.
//!
//! A view picks the smallest of its dense arrays as the driver, walks it once, and probes the
//! other storages by entity. This keeps iteration cost proportional to the rarest component
//! rather than to the total entity count.

use crate::entity::Entity;
use crate::registry::{Component, Inner, Registry};
use std::marker::PhantomData;
use std::sync::RwLockReadGuard;

/// A query over one or more component types, readable through [`Registry::view`].
pub trait ViewQuery<'r> {
    type Item;

    fn lengths(inner: &Inner) -> Vec<usize>;
    fn fetch(inner: &'r Inner, e: Entity) -> Option<Self::Item>;

    /// Entities of the shortest queried storage; the view iterates this slice and filters.
    fn driver_entities(inner: &'r Inner) -> &'r [Entity];
}

/// Holds the registry's read lock for the lifetime of a joined iteration.
pub struct View<'r, Q: ViewQuery<'r>> {
    #[allow(dead_code)]
    guard: RwLockReadGuard<'r, Inner>,
    inner: &'r Inner,
    entities: &'r [Entity],
    _marker: PhantomData<Q>,
}

impl<'r, Q: ViewQuery<'r>> View<'r, Q> {
    pub fn iter(&self) -> ViewIter<'r, Q> {
        ViewIter { inner: self.inner, entities: self.entities, cursor: 0, _marker: PhantomData }
    }
}

pub struct ViewIter<'r, Q: ViewQuery<'r>> {
    inner: &'r Inner,
    entities: &'r [Entity],
    cursor: usize,
    _marker: PhantomData<Q>,
}

impl<'r, Q: ViewQuery<'r>> Iterator for ViewIter<'r, Q> {
    type Item = (Entity, Q::Item);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.entities.len() {
            let e = self.entities[self.cursor];
            self.cursor += 1;
            if let Some(item) = Q::fetch(self.inner, e) {
                return Some((e, item));
            }
        }
        None
    }
}

impl Registry {
    pub fn view<'r, Q: ViewQuery<'r>>(&'r self) -> View<'r, Q> {
        let guard = self.lock_read();

        // SAFETY: `guard` is moved into the returned `View` and keeps the registry read-locked
        // for as long as the view exists, so no writer can touch `Inner` while this reference
        // (or anything derived from it) is alive. This sidesteps re-deriving the reference
        // through `&self.guard`, which would tie its lifetime to the borrow of `self` rather
        // than to the guard itself.
        let inner: &'r Inner = unsafe { &*(&*guard as *const Inner) };
        let entities = Q::driver_entities(inner);

        View { guard, inner, entities, _marker: PhantomData }
    }
}

macro_rules! impl_view_query {
    ($($t:ident),+) => {
        impl<'r, $($t: Component),+> ViewQuery<'r> for ($($t,)+) {
            type Item = ($(&'r $t,)+);

            fn lengths(inner: &Inner) -> Vec<usize> {
                vec![$(inner.storage::<$t>().map_or(0, |s| s.len())),+]
            }

            fn fetch(inner: &'r Inner, e: Entity) -> Option<Self::Item> {
                Some(($(inner.storage::<$t>()?.get(e)?,)+))
            }

            fn driver_entities(inner: &'r Inner) -> &'r [Entity] {
                let lens = Self::lengths(inner);
                let driver = lens
                    .iter()
                    .enumerate()
                    .min_by_key(|&(_, &len)| len)
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                impl_view_query!(@pick inner, driver, 0, $($t),+)
            }
        }
    };

    (@pick $inner:expr, $driver:expr, $i:expr, $head:ident $(, $tail:ident)*) => {
        if $driver == $i {
            $inner.storage::<$head>().map_or(&[], |s| s.entities())
        } else {
            impl_view_query!(@pick $inner, $driver, $i + 1, $($tail),*)
        }
    };
    (@pick $inner:expr, $driver:expr, $i:expr,) => {
        &[]
    };
}

impl_view_query!(A);
impl_view_query!(A, B);
impl_view_query!(A, B, C);
impl_view_query!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Pos(f32, f32);
    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Vel(f32, f32);

    #[test]
    fn view_joins_only_entities_with_all_components() {
        let reg = Registry::new();
        reg.register::<Pos>();
        reg.register::<Vel>();

        let moving = reg.spawn().unwrap();
        reg.add(moving, Pos(0.0, 0.0)).unwrap();
        reg.add(moving, Vel(1.0, 1.0)).unwrap();

        let still = reg.spawn().unwrap();
        reg.add(still, Pos(5.0, 5.0)).unwrap();

        let view = reg.view::<(Pos, Vel)>();
        let collected: Vec<_> = view.iter().map(|(e, (p, v))| (e, *p, *v)).collect();

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].0, moving);
        assert_eq!(collected[0].1, Pos(0.0, 0.0));
        assert_eq!(collected[0].2, Vel(1.0, 1.0));
    }

    #[test]
    fn view_drives_off_the_smaller_storage() {
        let reg = Registry::new();
        reg.register::<Pos>();
        reg.register::<Vel>();

        for _ in 0..100 {
            let e = reg.spawn().unwrap();
            reg.add(e, Pos(0.0, 0.0)).unwrap();
        }
        let tagged = reg.spawn().unwrap();
        reg.add(tagged, Pos(1.0, 1.0)).unwrap();
        reg.add(tagged, Vel(2.0, 2.0)).unwrap();

        let view = reg.view::<(Vel, Pos)>();
        let count = view.iter().count();
        assert_eq!(count, 1);
    }
}
