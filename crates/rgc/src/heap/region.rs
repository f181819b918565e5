//! Region Implementation - Free-Space Accounting
//!
//! Each region is a fixed-size block carved into allocation buffers by a
//! bump pointer. Retiring a buffer gives its unused tail back to the region.
//!
//! # Memory Ordering Model
//!
//! - **Buffer carving (`top`):** CAS with `AcqRel`, buffers may be carved
//!   by several mutators at once outside a pause.
//! - **Free/reclaimed counters:** `Relaxed`. Counters are read after the
//!   worker gang has joined, which already orders every update.

use crate::allocator::RetiredBuffer;
use crate::error::{PrepError, Result};
use crate::heap::HEAP_BASE;
use crate::runtime::ThreadId;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Region index type
pub type RegionIndex = usize;

/// Region - fixed-size block of heap space
pub struct Region {
    /// Region index in the table
    index: RegionIndex,

    /// Start address
    start: usize,

    /// End address (exclusive)
    end: usize,

    /// Bump pointer for carving buffers
    top: AtomicUsize,

    /// Bytes available to allocation
    free_bytes: AtomicUsize,

    /// Bytes returned by retired buffer tails
    reclaimed_bytes: AtomicUsize,

    /// Number of retired buffers reported against this region
    retired_buffers: AtomicUsize,
}

impl Region {
    fn new(index: RegionIndex, start: usize, size: usize) -> Self {
        Self {
            index,
            start,
            end: start + size,
            top: AtomicUsize::new(start),
            free_bytes: AtomicUsize::new(size),
            reclaimed_bytes: AtomicUsize::new(0),
            retired_buffers: AtomicUsize::new(0),
        }
    }

    /// Region index
    pub fn index(&self) -> RegionIndex {
        self.index
    }

    /// Start address
    pub fn start(&self) -> usize {
        self.start
    }

    /// End address (exclusive)
    pub fn end(&self) -> usize {
        self.end
    }

    /// Region capacity in bytes
    pub fn capacity(&self) -> usize {
        self.end - self.start
    }

    /// Check if address lies inside this region
    pub fn contains(&self, address: usize) -> bool {
        address >= self.start && address < self.end
    }

    /// Bytes currently available to allocation
    pub fn free_bytes(&self) -> usize {
        self.free_bytes.load(Ordering::Relaxed)
    }

    /// Bytes reclaimed from retired buffer tails
    pub fn reclaimed_bytes(&self) -> usize {
        self.reclaimed_bytes.load(Ordering::Relaxed)
    }

    /// Number of buffer retirements reported against this region
    pub fn retired_buffers(&self) -> usize {
        self.retired_buffers.load(Ordering::Relaxed)
    }

    /// Carve a buffer of `size` bytes from the region
    ///
    /// Returns `(start, end)` of the carved chunk, or None if the region is
    /// exhausted.
    pub fn carve(&self, size: usize) -> Option<(usize, usize)> {
        if size == 0 {
            return None;
        }

        let mut current = self.top.load(Ordering::Relaxed);
        loop {
            let new_top = current.checked_add(size)?;
            if new_top > self.end {
                return None;
            }

            match self.top.compare_exchange_weak(
                current,
                new_top,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.free_bytes.fetch_sub(size, Ordering::Relaxed);
                    return Some((current, new_top));
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Credit `bytes` back to the free space
    ///
    /// Returns None if that would leave more free bytes than the region holds.
    fn return_tail(&self, bytes: usize) -> Option<()> {
        let capacity = self.capacity();
        self.free_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |free| {
                free.checked_add(bytes).filter(|&total| total <= capacity)
            })
            .ok()?;
        self.reclaimed_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.retired_buffers.fetch_add(1, Ordering::Relaxed);
        Some(())
    }
}

/// RegionTable - all regions of the heap
///
/// Regions are laid out contiguously from [`HEAP_BASE`].
pub struct RegionTable {
    regions: Box<[Region]>,
    region_size: usize,
}

impl RegionTable {
    /// Create a table of `count` regions of `region_size` bytes each
    ///
    /// # Validation
    /// - `count` must be greater than 0
    /// - `region_size` must be a non-zero multiple of 4KB
    pub fn new(count: usize, region_size: usize) -> Result<Self> {
        const PAGE_SIZE: usize = 4096;

        if count == 0 {
            return Err(PrepError::InvalidArgument(
                "region count must be greater than 0".to_string(),
            ));
        }

        if region_size == 0 || region_size % PAGE_SIZE != 0 {
            return Err(PrepError::InvalidArgument(format!(
                "region_size ({}) must be a non-zero multiple of {}",
                region_size, PAGE_SIZE
            )));
        }

        let regions = (0..count)
            .map(|index| Region::new(index, HEAP_BASE + index * region_size, region_size))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            regions,
            region_size,
        })
    }

    /// Number of regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Check if table is empty
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region size in bytes
    pub fn region_size(&self) -> usize {
        self.region_size
    }

    /// Get region by index
    pub fn region(&self, index: RegionIndex) -> Option<&Region> {
        self.regions.get(index)
    }

    /// Iterate regions
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Return the unused tail of a buffer retired by `thread` to its region
    ///
    /// # Errors
    /// - `UnknownRegion` if the buffer names a region outside the table
    /// - `InconsistentBuffer` if the chunk is not inside that region, or the
    ///   tail would push the region's free space past its capacity
    pub fn return_tail(&self, thread: ThreadId, retired: &RetiredBuffer) -> Result<()> {
        let region = self.region(retired.region).ok_or(PrepError::UnknownRegion {
            region: retired.region,
            regions: self.regions.len(),
        })?;

        let inconsistent = |reason: String| PrepError::InconsistentBuffer { thread, reason };

        if !region.contains(retired.start) || retired.end > region.end() {
            return Err(inconsistent(format!(
                "chunk [{:#x}, {:#x}) outside region {} [{:#x}, {:#x})",
                retired.start,
                retired.end,
                region.index(),
                region.start(),
                region.end()
            )));
        }

        region.return_tail(retired.tail_bytes).ok_or_else(|| {
            inconsistent(format!(
                "tail of {} bytes overflows region {} ({} free of {})",
                retired.tail_bytes,
                region.index(),
                region.free_bytes(),
                region.capacity()
            ))
        })
    }

    /// Total bytes reclaimed from retired tails across all regions
    pub fn total_reclaimed(&self) -> usize {
        self.regions.iter().map(Region::reclaimed_bytes).sum()
    }

    /// Total free bytes across all regions
    pub fn total_free(&self) -> usize {
        self.regions.iter().map(Region::free_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION_SIZE: usize = 64 * 1024;

    #[test]
    fn test_table_layout() {
        let table = RegionTable::new(4, REGION_SIZE).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.region(0).unwrap().start(), HEAP_BASE);
        assert_eq!(table.region(3).unwrap().start(), HEAP_BASE + 3 * REGION_SIZE);
        assert_eq!(table.total_free(), 4 * REGION_SIZE);
    }

    #[test]
    fn test_invalid_table() {
        assert!(RegionTable::new(0, REGION_SIZE).is_err());
        assert!(RegionTable::new(1, 1000).is_err());
    }

    #[test]
    fn test_carve_until_exhausted() {
        let table = RegionTable::new(1, REGION_SIZE).unwrap();
        let region = table.region(0).unwrap();

        let (start, end) = region.carve(REGION_SIZE / 2).unwrap();
        assert_eq!(start, HEAP_BASE);
        assert_eq!(end, HEAP_BASE + REGION_SIZE / 2);
        assert!(region.carve(REGION_SIZE / 2).is_some());
        assert!(region.carve(8).is_none());
        assert_eq!(region.free_bytes(), 0);
    }

    fn retired(region: RegionIndex, start: usize, end: usize, tail_bytes: usize) -> RetiredBuffer {
        RetiredBuffer {
            region,
            start,
            end,
            used_bytes: end - start - tail_bytes,
            tail_bytes,
            refills: 1,
            allocated_bytes: end - start - tail_bytes,
        }
    }

    #[test]
    fn test_return_tail() {
        let table = RegionTable::new(2, REGION_SIZE).unwrap();
        let (start, end) = table.region(1).unwrap().carve(4096).unwrap();

        table.return_tail(1, &retired(1, start, end, 1024)).unwrap();
        let region = table.region(1).unwrap();
        assert_eq!(region.free_bytes(), REGION_SIZE - 4096 + 1024);
        assert_eq!(region.reclaimed_bytes(), 1024);
        assert_eq!(region.retired_buffers(), 1);
        assert_eq!(table.total_reclaimed(), 1024);
    }

    #[test]
    fn test_return_tail_unknown_region() {
        let table = RegionTable::new(2, REGION_SIZE).unwrap();
        let err = table.return_tail(1, &retired(5, 0, 8, 8)).unwrap_err();
        assert!(matches!(err, PrepError::UnknownRegion { region: 5, regions: 2 }));
    }

    #[test]
    fn test_return_tail_chunk_from_other_region() {
        let table = RegionTable::new(2, REGION_SIZE).unwrap();
        let (start, end) = table.region(1).unwrap().carve(4096).unwrap();

        let err = table.return_tail(3, &retired(0, start, end, 4096)).unwrap_err();
        assert!(matches!(err, PrepError::InconsistentBuffer { thread: 3, .. }));
        assert_eq!(table.region(0).unwrap().free_bytes(), REGION_SIZE);
        assert_eq!(table.total_reclaimed(), 0);
    }

    #[test]
    fn test_return_tail_chunk_past_region_end() {
        let table = RegionTable::new(2, REGION_SIZE).unwrap();
        let region = table.region(0).unwrap();
        let start = region.end() - 4096;

        let err = table
            .return_tail(4, &retired(0, start, start + 8192, 8192))
            .unwrap_err();
        assert!(matches!(err, PrepError::InconsistentBuffer { thread: 4, .. }));
    }

    #[test]
    fn test_return_tail_never_exceeds_capacity() {
        let table = RegionTable::new(1, REGION_SIZE).unwrap();
        let start = table.region(0).unwrap().start();

        // Never carved, so the whole region is still free
        let err = table
            .return_tail(2, &retired(0, start, start + 4096, 4096))
            .unwrap_err();
        assert!(matches!(err, PrepError::InconsistentBuffer { thread: 2, .. }));
        assert_eq!(table.region(0).unwrap().free_bytes(), REGION_SIZE);
        assert_eq!(table.region(0).unwrap().retired_buffers(), 0);
    }
}
