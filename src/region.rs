use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::QuarkError;
use crate::Result;

/// A fixed byte region the allocator or the filesystem is carved out of.
///
/// On the device this is a window of battery-retained RAM; on a host it is
/// usually a `Vec<u8>`. The core only ever goes through this trait, so it
/// never touches hardware addresses directly.
pub trait Region {
    /// Returns the whole region.
    fn bytes(&self) -> &[u8];

    /// Returns the whole region for writing.
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Returns the region capacity in bytes.
    fn len(&self) -> usize {
        self.bytes().len()
    }
}

impl Region for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl Region for Box<[u8]> {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl<const N: usize> Region for [u8; N] {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl Region for &mut [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

// Words are little-endian, matching the target core.

pub(crate) fn read_bytes(region: &impl Region, offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).ok_or(QuarkError::OutOfBounds)?;
    region.bytes().get(offset..end).ok_or(QuarkError::OutOfBounds)
}

pub(crate) fn bytes_mut(region: &mut impl Region, offset: usize, len: usize) -> Result<&mut [u8]> {
    let end = offset.checked_add(len).ok_or(QuarkError::OutOfBounds)?;
    region.bytes_mut().get_mut(offset..end).ok_or(QuarkError::OutOfBounds)
}

pub(crate) fn write_bytes(region: &mut impl Region, offset: usize, data: &[u8]) -> Result<()> {
    bytes_mut(region, offset, data.len())?.copy_from_slice(data);
    Ok(())
}

pub(crate) fn read_word(region: &impl Region, offset: usize) -> Result<u16> {
    let raw = read_bytes(region, offset, 2)?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

pub(crate) fn write_word(region: &mut impl Region, offset: usize, value: u16) -> Result<()> {
    write_bytes(region, offset, &value.to_le_bytes())
}
