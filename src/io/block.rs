// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Ordered, alignment-aware block and scalar transfers for I/O regions.
// Author: Lukas Bower

//! Block and scalar transfers.
//!
//! Device transfers move a 4-byte word at a time through the aligned middle of
//! the range and single bytes through the unaligned head and tail, so the far
//! side never sees an access that straddles a device word. Writes and fills
//! are fenced before the first access, reads after the last.

use core::ptr;
use core::sync::atomic::Ordering;

use super::bus::{IoWord, MemoryBus};
use super::{IoRegion, Strategy};
use crate::error::{Error, Result};

type DeviceWord = u32;

const WORD: usize = core::mem::size_of::<DeviceWord>();

#[inline(always)]
fn misaligned(addr: usize, width: usize) -> bool {
    addr % width != 0
}

impl<B: MemoryBus> IoRegion<'_, B> {
    /// Length actually transferable at `offset`, truncated to the region end.
    fn clamp(&self, offset: usize, len: usize) -> Result<usize> {
        if offset > self.size {
            return Err(Error::OutOfRange);
        }
        Ok(len.min(self.size - offset))
    }

    fn order(&self, order: Ordering) {
        if order != Ordering::Relaxed {
            self.bus.fence(order);
        }
    }

    /// Copy from the region at `offset` into `dst` with sequentially
    /// consistent ordering. Returns the number of bytes copied.
    pub fn block_read(&self, offset: usize, dst: &mut [u8]) -> Result<usize> {
        self.block_read_ordered(offset, dst, Ordering::SeqCst)
    }

    /// Copy from the region at `offset` into `dst`, ordering the transfer
    /// with `order`.
    ///
    /// The length is truncated to the end of the region.
    pub fn block_read_ordered(
        &self,
        offset: usize,
        dst: &mut [u8],
        order: Ordering,
    ) -> Result<usize> {
        let len = self.clamp(offset, dst.len())?;
        let strategy = self.ops.read.ok_or(Error::Unsupported)?;
        let src = self.far(offset);
        let dst = dst.as_mut_ptr();
        match strategy {
            Strategy::Normal => unsafe { ptr::copy(src, dst, len) },
            Strategy::Device => {
                unsafe { self.device_read(src, dst, len) };
                self.order(order);
            }
        }
        Ok(len)
    }

    /// Copy `src` into the region at `offset` with sequentially consistent
    /// ordering. Returns the number of bytes copied.
    pub fn block_write(&self, offset: usize, src: &[u8]) -> Result<usize> {
        self.block_write_ordered(offset, src, Ordering::SeqCst)
    }

    /// Copy `src` into the region at `offset`, ordering the transfer with
    /// `order`.
    ///
    /// The length is truncated to the end of the region.
    pub fn block_write_ordered(
        &self,
        offset: usize,
        src: &[u8],
        order: Ordering,
    ) -> Result<usize> {
        let len = self.clamp(offset, src.len())?;
        let strategy = self.ops.write.ok_or(Error::Unsupported)?;
        let dst = self.far(offset);
        match strategy {
            Strategy::Normal => unsafe { ptr::copy(src.as_ptr(), dst, len) },
            Strategy::Device => {
                self.order(order);
                unsafe { self.device_write(src.as_ptr(), dst, len) };
            }
        }
        Ok(len)
    }

    /// Fill `len` bytes of the region at `offset` with `value`, sequentially
    /// consistent. Returns the number of bytes filled.
    pub fn block_fill(&self, offset: usize, value: u8, len: usize) -> Result<usize> {
        self.block_fill_ordered(offset, value, len, Ordering::SeqCst)
    }

    /// Fill `len` bytes of the region at `offset` with `value`, ordering the
    /// transfer with `order`.
    pub fn block_fill_ordered(
        &self,
        offset: usize,
        value: u8,
        len: usize,
        order: Ordering,
    ) -> Result<usize> {
        let len = self.clamp(offset, len)?;
        let strategy = self.ops.fill.ok_or(Error::Unsupported)?;
        let dst = self.far(offset);
        match strategy {
            Strategy::Normal => unsafe { ptr::write_bytes(dst, value, len) },
            Strategy::Device => {
                self.order(order);
                unsafe { self.device_fill(dst, value, len) };
            }
        }
        Ok(len)
    }

    /// Read one `W` at `offset`.
    ///
    /// Device regions require `offset` to be aligned to the access width.
    pub fn read<W: IoWord>(&self, offset: usize, order: Ordering) -> Result<W> {
        self.fits::<W>(offset)?;
        let strategy = self.ops.read.ok_or(Error::Unsupported)?;
        let src = self.far(offset).cast::<W>();
        match strategy {
            Strategy::Normal => Ok(unsafe { src.read_unaligned() }),
            Strategy::Device => {
                if misaligned(src as usize, W::WIDTH) {
                    return Err(Error::InvalidArgument);
                }
                let value = unsafe { self.bus.load(src.cast_const()) };
                self.order(order);
                Ok(value)
            }
        }
    }

    /// Write one `W` at `offset`.
    ///
    /// Device regions require `offset` to be aligned to the access width.
    pub fn write<W: IoWord>(&self, offset: usize, value: W, order: Ordering) -> Result<()> {
        self.fits::<W>(offset)?;
        let strategy = self.ops.write.ok_or(Error::Unsupported)?;
        let dst = self.far(offset).cast::<W>();
        match strategy {
            Strategy::Normal => unsafe { dst.write_unaligned(value) },
            Strategy::Device => {
                if misaligned(dst as usize, W::WIDTH) {
                    return Err(Error::InvalidArgument);
                }
                self.order(order);
                unsafe { self.bus.store(dst, value) };
            }
        }
        Ok(())
    }

    fn fits<W: IoWord>(&self, offset: usize) -> Result<()> {
        match offset.checked_add(W::WIDTH) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::OutOfRange),
        }
    }

    /// # Safety
    ///
    /// `src` valid for `len` bytes of device reads, `dst` for `len` bytes of
    /// writes.
    unsafe fn device_read(&self, src: *const u8, dst: *mut u8, len: usize) {
        let mut done = 0;
        unsafe {
            while done < len
                && (misaligned(src.add(done) as usize, WORD)
                    || misaligned(dst.add(done) as usize, WORD))
            {
                dst.add(done).write(self.bus.load(src.add(done)));
                done += 1;
            }
            while len - done >= WORD {
                let word: DeviceWord = self.bus.load(src.add(done).cast());
                dst.add(done).cast::<DeviceWord>().write(word);
                done += WORD;
            }
            while done < len {
                dst.add(done).write(self.bus.load(src.add(done)));
                done += 1;
            }
        }
    }

    /// # Safety
    ///
    /// `src` valid for `len` bytes of reads, `dst` for `len` bytes of device
    /// writes.
    unsafe fn device_write(&self, src: *const u8, dst: *mut u8, len: usize) {
        let mut done = 0;
        unsafe {
            while done < len
                && (misaligned(dst.add(done) as usize, WORD)
                    || misaligned(src.add(done) as usize, WORD))
            {
                self.bus.store(dst.add(done), src.add(done).read());
                done += 1;
            }
            while len - done >= WORD {
                let word = src.add(done).cast::<DeviceWord>().read();
                self.bus.store(dst.add(done).cast::<DeviceWord>(), word);
                done += WORD;
            }
            while done < len {
                self.bus.store(dst.add(done), src.add(done).read());
                done += 1;
            }
        }
    }

    /// # Safety
    ///
    /// `dst` valid for `len` bytes of device writes.
    unsafe fn device_fill(&self, dst: *mut u8, value: u8, len: usize) {
        let word = DeviceWord::from_ne_bytes([value; WORD]);
        let mut done = 0;
        unsafe {
            while done < len && misaligned(dst.add(done) as usize, WORD) {
                self.bus.store(dst.add(done), value);
                done += 1;
            }
            while len - done >= WORD {
                self.bus.store(dst.add(done).cast::<DeviceWord>(), word);
                done += WORD;
            }
            while done < len {
                self.bus.store(dst.add(done), value);
                done += 1;
            }
        }
    }
}
