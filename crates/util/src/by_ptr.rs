use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

/// Types whose identity is the address of the value they point to.
pub trait AsCmpPtr {
    /// The address that identifies `self`.
    fn as_cmp_ptr(&self) -> *const ();

    /// Compare two handles by identity.
    fn ptr_eq(this: &Self, other: &impl AsCmpPtr) -> bool {
        this.as_cmp_ptr() == other.as_cmp_ptr()
    }
}

/// A shared handle that compares, orders and hashes by the address it points to instead of by
/// its contents.
///
/// Two handles built from separate allocations are never equal, even when the pointees are.
/// Cloning keeps the identity.
#[repr(transparent)]
#[derive(Clone, Copy, Default)]
pub struct ByPtr<T>(T);

impl<T: AsCmpPtr> ByPtr<T> {
    pub fn new(t: T) -> Self {
        Self(t)
    }

    /// Unwrap this handle into its contents
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

impl<T> ByPtr<Rc<T>> {
    /// Allocate `value` and wrap the fresh pointer.
    pub fn alloc(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// How many handles share this allocation.
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl<T> Deref for ByPtr<Rc<T>> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> Deref for ByPtr<Arc<T>> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> Borrow<T> for ByPtr<T> {
    fn borrow(&self) -> &T {
        &self.0
    }
}

impl<T: AsCmpPtr> From<T> for ByPtr<T> {
    fn from(t: T) -> Self {
        Self::new(t)
    }
}

impl<T: AsCmpPtr, O: AsCmpPtr> PartialEq<O> for ByPtr<T> {
    fn eq(&self, other: &O) -> bool {
        self.0.as_cmp_ptr() == other.as_cmp_ptr()
    }
}

impl<T: AsCmpPtr> Eq for ByPtr<T> {}

impl<T: AsCmpPtr, O: AsCmpPtr> PartialOrd<O> for ByPtr<T> {
    fn partial_cmp(&self, other: &O) -> Option<std::cmp::Ordering> {
        self.0.as_cmp_ptr().partial_cmp(&other.as_cmp_ptr())
    }
}

impl<T: AsCmpPtr> Ord for ByPtr<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_cmp_ptr().cmp(&other.0.as_cmp_ptr())
    }
}

impl<T: AsCmpPtr> Hash for ByPtr<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_cmp_ptr().hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for ByPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: fmt::Display> fmt::Display for ByPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ====== Implementations =======

impl<T> AsCmpPtr for &T {
    fn as_cmp_ptr(&self) -> *const () {
        *self as *const T as *const ()
    }
}

impl<T> AsCmpPtr for Rc<T> {
    fn as_cmp_ptr(&self) -> *const () {
        Rc::as_ptr(self) as *const ()
    }
}

impl<T> AsCmpPtr for Arc<T> {
    fn as_cmp_ptr(&self) -> *const () {
        Arc::as_ptr(self) as *const ()
    }
}

impl<T: AsCmpPtr> AsCmpPtr for ByPtr<T> {
    fn as_cmp_ptr(&self) -> *const () {
        self.0.as_cmp_ptr()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::ByPtr;

    #[test]
    fn test_identity_not_contents() {
        let a = ByPtr::alloc(String::from("proc"));
        let b = ByPtr::alloc(String::from("proc"));
        let a2 = a.clone();

        assert!(a == a2, "clones share identity");
        assert!(a != b, "equal contents in separate allocations are distinct");
        assert_eq!(*a, *b);

        let set: HashSet<_> = [a.clone(), b.clone(), a2].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.share_count(), 3);
    }

    #[test]
    fn test_compare_against_raw_rc() {
        let rc = Rc::new(5);
        let wrapped = ByPtr::new(rc.clone());
        assert!(wrapped == rc);
        assert!(wrapped != Rc::new(5));
    }
}
