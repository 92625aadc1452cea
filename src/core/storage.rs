use std::collections::BTreeMap;
use crate::core::RawHandle;
use crate::error::HandsError;
use crate::Result;

/// Generic storage trait for solver objects
pub trait Storage<T, H> {
    /// Adds an item to the storage and returns its handle
    fn add(&mut self, item: T) -> H;

    /// Gets a reference to an item by its handle
    fn get(&self, handle: H) -> Option<&T>;

    /// Gets a mutable reference to an item by its handle
    fn get_mut(&mut self, handle: H) -> Option<&mut T>;

    /// Removes an item from the storage
    fn remove(&mut self, handle: H) -> Option<T>;

    /// Returns the number of items in the storage
    fn len(&self) -> usize;

    /// Returns whether the storage is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle-keyed storage. Handles are never reused and iteration follows
/// creation order, which keeps the reference world deterministic.
#[derive(Debug, Clone)]
pub struct HandleStorage<H, T> {
    items: BTreeMap<H, T>,
    next_id: u32,
}

impl<H: RawHandle, T> Default for HandleStorage<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: RawHandle, T> HandleStorage<H, T> {
    /// Creates a new empty storage
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1, // Start at 1, so 0 can represent invalid handle
        }
    }

    /// Iterates over all items in handle order
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.items.iter().map(|(h, item)| (*h, item))
    }

    /// Iterates mutably over all items in handle order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> + '_ {
        self.items.iter_mut().map(|(h, item)| (*h, item))
    }

    /// Gets an item by its handle, returning an error if not found
    pub fn get_or_err(&self, handle: H) -> Result<&T>
    where
        H: std::fmt::Debug,
    {
        self.items
            .get(&handle)
            .ok_or_else(|| HandsError::ResourceNotFound(format!("{:?} not found", handle)))
    }

    /// Gets a mutable item by its handle, returning an error if not found
    pub fn get_mut_or_err(&mut self, handle: H) -> Result<&mut T>
    where
        H: std::fmt::Debug,
    {
        self.items
            .get_mut(&handle)
            .ok_or_else(|| HandsError::ResourceNotFound(format!("{:?} not found", handle)))
    }
}

impl<H: RawHandle, T> Storage<T, H> for HandleStorage<H, T> {
    fn add(&mut self, item: T) -> H {
        let handle = H::from_id(self.next_id);
        self.next_id += 1;
        self.items.insert(handle, item);
        handle
    }

    fn get(&self, handle: H) -> Option<&T> {
        self.items.get(&handle)
    }

    fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.items.get_mut(&handle)
    }

    fn remove(&mut self, handle: H) -> Option<T> {
        self.items.remove(&handle)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
