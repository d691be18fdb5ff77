// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Memory-mapped I/O region descriptor and address translation.
// Author: Lukas Bower
#![allow(unsafe_code)]

//! Memory-mapped I/O regions.
//!
//! An [`IoRegion`] describes a window of mapped memory: its virtual base, its
//! size, an optional table of physical page addresses and an operation table
//! choosing, per operation, whether the window is accessed as normal memory or
//! as device memory. Device memory is only ever touched with naturally aligned
//! accesses of at most one word, through the region's [`MemoryBus`].

mod barrier;
mod block;
mod bus;

use core::marker::PhantomData;
use core::ptr::NonNull;

use bitflags::bitflags;

pub use barrier::io_fence;
pub use bus::{IoWord, MemoryBus, VolatileBus};

bitflags! {
    /// Memory type attributes of a mapped region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemFlags: u32 {
        /// Mapped cacheable.
        const CACHED = 1 << 0;
        /// Mapped uncached.
        const UNCACHED = 1 << 1;
        /// Device memory with side effects on access.
        const DEVICE = 1 << 2;
        /// Shared with another processor or bus master.
        const SHARED = 1 << 3;
    }
}

/// How one operation touches the far side of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain memory copy or fill; ordering requests are ignored.
    Normal,
    /// Fenced, word-split access that never issues a misaligned or sub-word
    /// access straddling a device word.
    Device,
}

/// Operation table of a region. `None` marks the operation unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoOps {
    /// Strategy for reads from the region.
    pub read: Option<Strategy>,
    /// Strategy for writes into the region.
    pub write: Option<Strategy>,
    /// Strategy for fills of the region.
    pub fill: Option<Strategy>,
}

impl IoOps {
    /// Every operation as normal memory.
    pub const NORMAL: Self = Self::uniform(Strategy::Normal);
    /// Every operation as device memory.
    pub const DEVICE: Self = Self::uniform(Strategy::Device);
    /// No operation supported.
    pub const NONE: Self = Self {
        read: None,
        write: None,
        fill: None,
    };

    const fn uniform(strategy: Strategy) -> Self {
        Self {
            read: Some(strategy),
            write: Some(strategy),
            fill: Some(strategy),
        }
    }

    /// Operation table matching the memory type in `flags`.
    #[must_use]
    pub const fn for_flags(flags: MemFlags) -> Self {
        if flags.contains(MemFlags::DEVICE) {
            Self::DEVICE
        } else {
            Self::NORMAL
        }
    }
}

impl Default for IoOps {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// A mapped memory window with its translation data and operation table.
pub struct IoRegion<'a, B = VolatileBus> {
    virt: NonNull<u8>,
    size: usize,
    physmap: &'a [usize],
    page_shift: u32,
    page_mask: usize,
    flags: MemFlags,
    ops: IoOps,
    bus: B,
    _mem: PhantomData<&'a mut [u8]>,
}

impl<B> core::fmt::Debug for IoRegion<'_, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IoRegion")
            .field("virt", &self.virt)
            .field("size", &self.size)
            .field("pages", &self.physmap.len())
            .field("page_shift", &self.page_shift)
            .field("flags", &self.flags)
            .field("ops", &self.ops)
            .finish_non_exhaustive()
    }
}

impl<'a> IoRegion<'a, VolatileBus> {
    /// Region over `mem`, borrowed exclusively for the region's lifetime.
    pub fn new(mem: &'a mut [u8], ops: IoOps) -> Self {
        let size = mem.len();
        let virt = NonNull::from(mem).cast::<u8>();
        Self::with_parts(virt, size, ops)
    }

    /// Region over `size` bytes starting at `virt`.
    ///
    /// # Safety
    ///
    /// `virt` must be valid for reads and writes of `size` bytes for `'a`, and
    /// nothing else may access that memory in a way that conflicts with the
    /// region's operations while it exists.
    pub unsafe fn from_raw_parts(virt: NonNull<u8>, size: usize, ops: IoOps) -> Self {
        Self::with_parts(virt, size, ops)
    }

    fn with_parts(virt: NonNull<u8>, size: usize, ops: IoOps) -> Self {
        Self {
            virt,
            size,
            physmap: &[],
            page_shift: usize::BITS,
            page_mask: usize::MAX,
            flags: MemFlags::empty(),
            ops,
            bus: VolatileBus,
            _mem: PhantomData,
        }
    }
}

impl<'a, B> IoRegion<'a, B> {
    /// Attach a physical page table: entry `n` is the physical address of the
    /// page starting at offset `n << page_shift`.
    ///
    /// A `page_shift` of the word width or more describes one page spanning
    /// the whole address space.
    #[must_use]
    pub fn with_physmap(mut self, physmap: &'a [usize], page_shift: u32) -> Self {
        self.physmap = physmap;
        self.page_shift = page_shift;
        self.page_mask = if page_shift >= usize::BITS {
            usize::MAX
        } else {
            (1usize << page_shift) - 1
        };
        self
    }

    /// Record the memory type attributes of the mapping.
    #[must_use]
    pub fn with_flags(mut self, flags: MemFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Route far-side device accesses through `bus`.
    pub fn with_bus<C: MemoryBus>(self, bus: C) -> IoRegion<'a, C> {
        IoRegion {
            virt: self.virt,
            size: self.size,
            physmap: self.physmap,
            page_shift: self.page_shift,
            page_mask: self.page_mask,
            flags: self.flags,
            ops: self.ops,
            bus,
            _mem: PhantomData,
        }
    }

    /// Size of the region in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Memory type attributes.
    pub const fn flags(&self) -> MemFlags {
        self.flags
    }

    /// Operation table.
    pub const fn ops(&self) -> IoOps {
        self.ops
    }

    /// Page granularity as a shift.
    pub const fn page_shift(&self) -> u32 {
        self.page_shift
    }

    /// Mask selecting the in-page part of an offset.
    pub const fn page_mask(&self) -> usize {
        self.page_mask
    }

    /// Bus used for device accesses.
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Virtual address of `offset`, if it lies inside the region.
    #[must_use]
    pub fn virt(&self, offset: usize) -> Option<*mut u8> {
        (offset < self.size).then(|| self.virt.as_ptr().wrapping_add(offset))
    }

    /// Offset of `ptr` inside the region, if it lies inside.
    #[must_use]
    pub fn virt_to_offset(&self, ptr: *const u8) -> Option<usize> {
        let offset = (ptr as usize).wrapping_sub(self.virt.as_ptr() as usize);
        (offset < self.size).then_some(offset)
    }

    /// Physical address of `offset`, if the region has a page table covering
    /// it.
    #[must_use]
    pub fn phys(&self, offset: usize) -> Option<usize> {
        if offset >= self.size {
            return None;
        }
        let page = offset.checked_shr(self.page_shift).unwrap_or(0);
        let base = self.physmap.get(page)?;
        Some(base.wrapping_add(offset & self.page_mask))
    }

    /// Offset whose physical address is `phys`, scanning the page table.
    #[must_use]
    pub fn phys_to_offset(&self, phys: usize) -> Option<usize> {
        let first = *self.physmap.first()?;
        let mut offset = if self.page_mask == usize::MAX {
            phys.wrapping_sub(first)
        } else {
            phys & self.page_mask
        };
        let step = self.page_mask.wrapping_add(1);
        loop {
            if self.phys(offset) == Some(phys) {
                return Some(offset);
            }
            if step == 0 {
                return None;
            }
            offset = offset.checked_add(step)?;
            if offset >= self.size {
                return None;
            }
        }
    }

    /// Virtual address mapped to `phys`, if any.
    #[must_use]
    pub fn phys_to_virt(&self, phys: usize) -> Option<*mut u8> {
        self.phys_to_offset(phys).and_then(|offset| self.virt(offset))
    }

    /// Physical address behind `ptr`, if it lies inside the region.
    #[must_use]
    pub fn virt_to_phys(&self, ptr: *const u8) -> Option<usize> {
        self.virt_to_offset(ptr).and_then(|offset| self.phys(offset))
    }

    /// Far-side pointer for `offset`. Callers keep `offset <= size`.
    fn far(&self, offset: usize) -> *mut u8 {
        self.virt.as_ptr().wrapping_add(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_flags_selects_device_strategy() {
        assert_eq!(IoOps::for_flags(MemFlags::DEVICE | MemFlags::SHARED), IoOps::DEVICE);
        assert_eq!(IoOps::for_flags(MemFlags::CACHED), IoOps::NORMAL);
    }

    #[test]
    fn wide_page_shift_yields_full_mask() {
        let mut mem = [0u8; 16];
        let map = [0x8000_0000usize];
        let region = IoRegion::new(&mut mem, IoOps::NORMAL).with_physmap(&map, usize::BITS);
        assert_eq!(region.page_mask(), usize::MAX);
        assert_eq!(region.phys(5), Some(0x8000_0005));
        assert_eq!(region.phys_to_offset(0x8000_000f), Some(15));
        assert_eq!(region.phys_to_offset(0x8000_0010), None);
    }

    #[test]
    fn translation_walks_discontiguous_pages() {
        let mut mem = [0u8; 64];
        let map = [0x1000usize, 0x9000, 0x3000, 0x7000];
        let region = IoRegion::new(&mut mem, IoOps::NORMAL).with_physmap(&map, 4);
        assert_eq!(region.page_mask(), 0xf);
        assert_eq!(region.phys(0x13), Some(0x9003));
        assert_eq!(region.phys_to_offset(0x7002), Some(0x32));
        assert_eq!(region.phys_to_offset(0x5000), None);
        for offset in [0usize, 7, 0x1f, 0x3f] {
            let ptr = region.virt(offset).unwrap();
            let phys = region.virt_to_phys(ptr).unwrap();
            assert_eq!(region.phys_to_virt(phys), Some(ptr));
        }
    }

    #[test]
    fn lookups_outside_region_fail() {
        let mut mem = [0u8; 8];
        let region = IoRegion::new(&mut mem, IoOps::NORMAL);
        assert!(region.virt(8).is_none());
        assert!(region.phys(0).is_none());
        let outside = region.virt(7).unwrap().wrapping_add(1);
        assert!(region.virt_to_offset(outside).is_none());
    }
}
