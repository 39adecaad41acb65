#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

#[repr(transparent)]
pub(crate) struct TableLock<T>(impl_::RwLock<T>);

#[repr(transparent)]
pub(crate) struct TableReadGuard<'a, T>(impl_::RwLockReadGuard<'a, T>);

#[repr(transparent)]
pub(crate) struct TableWriteGuard<'a, T>(impl_::RwLockWriteGuard<'a, T>);

impl<T> TableLock<T> {
    #[must_use]
    pub(crate) const fn new(value: T) -> Self {
        Self(impl_::RwLock::new(value))
    }

    #[inline]
    pub(crate) fn read(&self) -> TableReadGuard<'_, T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        #[cfg(feature = "std")]
        let guard = self.0.read().expect("unable to acquire registry lock");

        TableReadGuard(guard)
    }

    #[inline]
    pub(crate) fn write(&self) -> TableWriteGuard<'_, T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.write();

        #[cfg(feature = "std")]
        let guard = self.0.write().expect("unable to acquire registry lock");

        TableWriteGuard(guard)
    }
}

impl<T> core::ops::Deref for TableReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::Deref for TableWriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::DerefMut for TableWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
