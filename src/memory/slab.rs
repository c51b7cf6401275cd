use std::{
    collections::TryReserveError,
    iter::FusedIterator,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use thiserror::Error;

use crate::memory::EntityIndex;

/// A generational slab arena that manages fixed-sized objects.
///
/// Removed entries are put on a free list and reused by later insertions.
/// Every entry carries a generation which is bumped when the entry is freed,
/// so that keys to removed values do not resolve to the values that replace
/// them.
#[derive(Debug, Clone)]
pub struct Slab<K, V> {
    data: Vec<Entry<V>>,
    /// Index of the next free entry. Equals `data.len()` when there is none.
    free: usize,
    len: usize,
    /// Lowest generation no key has carried yet. New entries start here.
    generation_floor: u32,
    phantom: PhantomData<K>,
}

impl<K, V> Slab<K, V>
where
    K: EntityIndex,
{
    /// The maximum number of entries a slab can hold.
    pub const MAX_LEN: usize = u32::MAX as usize;

    /// Creates an empty [`Slab<K, V>`].
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            free: 0,
            len: 0,
            generation_floor: 0,
            phantom: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            free: 0,
            len: 0,
            generation_floor: 0,
            phantom: PhantomData,
        }
    }

    /// Returns the number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether there is no stored value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of values the slab can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Returns an upper bound on the slot of any valid key in this slab.
    #[inline]
    pub fn upper_bound(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a value, returning its key.
    ///
    /// # Errors
    ///
    ///  - When memory for a new entry can not be reserved.
    ///  - When the slab already holds [`Slab::MAX_LEN`] values.
    ///
    /// The slab is left unchanged when an error is returned.
    pub fn try_insert(&mut self, value: V) -> Result<K, AllocError> {
        let index = self.free;

        let generation = if index == self.data.len() {
            if index >= Self::MAX_LEN {
                return Err(AllocError::Exhausted(Self::MAX_LEN));
            }
            self.data.try_reserve(1)?;
            let generation = self.generation_floor;
            self.data.push(Entry::Full { value, generation });
            self.free += 1;
            generation
        } else {
            let Entry::Free { next, generation } = self.data[index] else {
                unreachable!("free list points to an occupied entry")
            };
            self.free = next;
            self.data[index] = Entry::Full { value, generation };
            generation
        };

        self.len += 1;
        self.generation_floor = self.generation_floor.max(generation.wrapping_add(1));

        Ok(K::new(index, generation))
    }

    /// Inserts a value, returning its key.
    ///
    /// # Panics
    ///
    /// Panics when the value can not be stored.
    pub fn insert(&mut self, value: V) -> K {
        match self.try_insert(value) {
            Ok(key) => key,
            Err(err) => panic!("failed to insert into slab: {err}"),
        }
    }

    /// Removes the value of a key, if it is present.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let index = key.index();
        let entry = self.data.get_mut(index)?;

        let generation = match entry {
            Entry::Full { generation, .. } if *generation == key.generation() => *generation,
            _ => return None,
        };

        let free = Entry::Free {
            next: self.free,
            generation: generation.wrapping_add(1),
        };
        let Entry::Full { value, .. } = std::mem::replace(entry, free) else {
            unreachable!()
        };

        self.free = index;
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&V> {
        match self.data.get(key.index()) {
            Some(Entry::Full { value, generation }) if *generation == key.generation() => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        match self.data.get_mut(key.index()) {
            Some(Entry::Full { value, generation }) if *generation == key.generation() => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Removes all values.
    ///
    /// Every slot is freed with a new generation, so keys handed out before
    /// the call stay invalid after the slots are reused.
    pub fn clear(&mut self) {
        for (index, entry) in self.data.iter_mut().enumerate() {
            let generation = match entry {
                Entry::Full { generation, .. } => generation.wrapping_add(1),
                Entry::Free { generation, .. } => *generation,
            };
            *entry = Entry::Free {
                next: index + 1,
                generation,
            };
        }

        self.free = 0;
        self.len = 0;
    }

    /// Reserves capacity for `additional` more values.
    ///
    /// Free entries count towards the reserved capacity.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        if let Some(extra) = additional.checked_sub(self.free_len()) {
            if self.data.len().saturating_add(extra) > Self::MAX_LEN {
                return Err(AllocError::Exhausted(Self::MAX_LEN));
            }
            self.data.try_reserve(extra)?;
        }

        Ok(())
    }

    /// Clones the slab, reporting allocation failure instead of aborting.
    pub fn try_clone(&self) -> Result<Self, AllocError>
    where
        V: Clone,
    {
        let mut data = Vec::new();
        data.try_reserve_exact(self.data.len())?;
        data.extend(self.data.iter().cloned());

        Ok(Self {
            data,
            free: self.free,
            len: self.len,
            generation_floor: self.generation_floor,
            phantom: PhantomData,
        })
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self)
    }

    /// Shrink the buffer to fit the present entries.
    ///
    /// Free entries are kept so that their generations survive.
    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit()
    }

    /// Compacts the slab by moving all entries to the front.
    ///
    /// Calls a `rekey` function with the old and new key for every entry.
    /// Every remaining entry gets a generation no key has carried before, so
    /// keys from before the call never resolve afterwards.
    pub fn compact<F>(&mut self, mut rekey: F)
    where
        F: FnMut(&mut V, K, K),
    {
        let mut old_index = 0;
        let mut new_index = 0;
        let floor = self.generation_floor;

        self.data.retain_mut(|entry| match entry {
            Entry::Free { .. } => {
                old_index += 1;
                false
            }
            Entry::Full { value, generation } => {
                rekey(value, K::new(old_index, *generation), K::new(new_index, floor));
                *generation = floor;
                old_index += 1;
                new_index += 1;
                true
            }
        });

        self.free = self.data.len();
        self.generation_floor = floor.wrapping_add(1);
    }

    /// Number of entries on the free list.
    fn free_len(&self) -> usize {
        self.data.len() - self.len
    }
}

impl<K, V> Index<K> for Slab<K, V>
where
    K: EntityIndex,
{
    type Output = V;

    fn index(&self, key: K) -> &Self::Output {
        self.get(key).expect("invalid key")
    }
}

impl<K, V> IndexMut<K> for Slab<K, V>
where
    K: EntityIndex,
{
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        self.get_mut(key).expect("invalid key")
    }
}

impl<K, V> Default for Slab<K, V>
where
    K: EntityIndex,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum Entry<V> {
    Free { next: usize, generation: u32 },
    Full { value: V, generation: u32 },
}

/// Error raised when a slab can not grow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("failed to reserve memory")]
    Reserve(#[from] TryReserveError),
    #[error("can not hold more than {0} entries")]
    Exhausted(usize),
}

pub struct Iter<'a, K, V> {
    entries: std::iter::Enumerate<std::slice::Iter<'a, Entry<V>>>,
    len: usize,
    phantom: PhantomData<K>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(slab: &'a Slab<K, V>) -> Self {
        Self {
            entries: slab.data.iter().enumerate(),
            len: slab.len,
            phantom: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: EntityIndex,
{
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, entry) in self.entries.by_ref() {
            if let Entry::Full { value, generation } = entry {
                self.len -= 1;
                return Some((K::new(index, *generation), value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V>
where
    K: EntityIndex,
{
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> where K: EntityIndex {}

pub struct IterMut<'a, K, V> {
    entries: std::iter::Enumerate<std::slice::IterMut<'a, Entry<V>>>,
    len: usize,
    phantom: PhantomData<K>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    fn new(slab: &'a mut Slab<K, V>) -> Self {
        Self {
            len: slab.len,
            entries: slab.data.iter_mut().enumerate(),
            phantom: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V>
where
    K: EntityIndex,
{
    type Item = (K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, entry) in self.entries.by_ref() {
            if let Entry::Full { value, generation } = entry {
                self.len -= 1;
                return Some((K::new(index, *generation), value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V>
where
    K: EntityIndex,
{
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, K, V> FusedIterator for IterMut<'a, K, V> where K: EntityIndex {}
