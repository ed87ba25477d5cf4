//! Volume Header & Partition Selection (C2).
//!
//! Decodes the SGI volume header at image offset 0 and selects the EFS
//! partition to mount, either a caller-specified index or by scanning the
//! 16-slot partition table for the first qualifying `type == PART_EFS`
//! entry (mirrors `efs_vol_open` in the original driver).

use crate::device::{PartitionSelector, MIN_PARTITION_BLOCKS};
use crate::error::{Error, Result};
use crate::beio::{check_len, get_i32, get_u32};

/// Magic number identifying a valid SGI volume header.
pub const BOOT_BLOCK_MAGIC: u32 = 0x0BE5_A941;

/// Number of partition descriptors in the volume header.
pub const VH_PART_NUM: usize = 16;

/// Partition type: EFS filesystem.
pub const PART_EFS: i32 = 5;
/// Partition type: whole disk.
pub const PART_WD: i32 = 6;

/// Byte offset of the partition table within the 512-byte volume header.
const PT_OFFSET: usize = 312;
/// Size in bytes of one on-disk partition descriptor.
const PT_ENTRY_SIZE: usize = 12;

/// One decoded partition-table entry.
#[derive(Debug, Clone, Copy)]
pub struct Partition {
	pub first_bb: i32,
	pub block_count: i32,
	pub kind: i32,
}

/// The decoded volume header: just the partition table, which is all the
/// driver needs once a partition has been selected.
pub struct VolumeHeader {
	pub partitions: [Partition; VH_PART_NUM],
}

impl VolumeHeader {
	/// Decodes a 512-byte volume header buffer, validating its magic.
	pub fn decode(buf: &[u8]) -> Result<Self> {
		check_len(buf, 0, 512, "volume header")?;
		let magic = get_u32(buf, 0);
		if magic != BOOT_BLOCK_MAGIC {
			return Err(Error::Invalid(format!(
				"wrong volume header magic 0x{magic:x}"
			)));
		}

		let mut partitions = [Partition {
			first_bb: 0,
			block_count: 0,
			kind: 0,
		}; VH_PART_NUM];
		for (i, part) in partitions.iter_mut().enumerate() {
			let off = PT_OFFSET + i * PT_ENTRY_SIZE;
			// On-disk order is {blocks, first, type}, per the SGI volhdr
			// layout (efs_vh_part_t), not the {first, blocks, type} order
			// spec prose lists fields in.
			let block_count = get_i32(buf, off);
			let first_bb = get_i32(buf, off + 4);
			let kind = get_i32(buf, off + 8);
			*part = Partition {
				first_bb,
				block_count,
				kind,
			};
		}

		Ok(Self { partitions })
	}
}

/// Selects a partition from `hdr` per `selector`, returning its index and
/// descriptor. Auto-selection picks the first `type == PART_EFS` partition
/// with at least [`MIN_PARTITION_BLOCKS`] blocks.
pub fn select_partition(
	hdr: &VolumeHeader,
	selector: PartitionSelector,
) -> Result<(usize, Partition)> {
	match selector {
		PartitionSelector::Index(i) => {
			let i = i as usize;
			let part = hdr
				.partitions
				.get(i)
				.copied()
				.ok_or_else(|| Error::Invalid(format!("partition index {i} out of range")))?;
			Ok((i, part))
		}
		PartitionSelector::Auto => {
			for (i, part) in hdr.partitions.iter().enumerate() {
				if part.block_count == 0 {
					continue;
				}
				if part.kind == PART_EFS && part.block_count >= MIN_PARTITION_BLOCKS {
					return Ok((i, *part));
				}
			}
			Err(Error::NotFound)
		}
	}
}
