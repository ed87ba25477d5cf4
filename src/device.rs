//! Block Device Adapter (C1): positioned reads on a backing image, and
//! partition-relative offsets computed from the volume header (C2).
//!
//! Grounded on the teacher's own raw-device code (`fdisk::disk`,
//! `utils::disk`), which opens a device file and drives it with `libc`
//! ioctls and `std::fs::File`; here reads are pure positioned reads (no
//! ioctls needed for a read-only image), retried across `EINTR` and partial
//! reads the way the original C `efs_bread_common` loop does.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::volume::{select_partition, VolumeHeader};

/// Basic Block size in bytes; the unit of all on-disk addressing.
pub const BB: u64 = 512;

/// Minimum number of blocks for a partition to be considered during
/// auto-selection.
pub const MIN_PARTITION_BLOCKS: i32 = 10;

/// Request a specific partition, or let [`Device::open`] auto-select the
/// first qualifying EFS partition.
#[derive(Debug, Clone, Copy)]
pub enum PartitionSelector {
	Auto,
	Index(u8),
}

/// A positioned, read-only handle onto the EFS partition of a backing
/// image, with reads already relocated to the partition's base offset.
pub struct Device {
	file: File,
	/// Byte offset of the start of the selected partition within the image.
	base_offset: u64,
}

impl Device {
	/// Opens `image_path`, parses its volume header, and selects a
	/// partition per `selector`.
	pub fn open(image_path: &Path, selector: PartitionSelector) -> Result<Self> {
		let file = File::open(image_path)?;

		let mut hdr_buf = [0u8; 512];
		Self::pread_exact(&file, 0, &mut hdr_buf)?;
		let hdr = VolumeHeader::decode(&hdr_buf)?;
		debug!("{}: volume header detected", image_path.display());

		let (index, part) = select_partition(&hdr, selector)?;
		if part.block_count < MIN_PARTITION_BLOCKS {
			return Err(Error::Invalid(format!(
				"partition {index} is too small, it has only {} blocks",
				part.block_count
			)));
		}
		if part.kind != crate::volume::PART_EFS {
			warn!("unexpected type of partition {index}: {}", part.kind);
		}
		info!(
			"partition {index} starts at block {}, type {}",
			part.first_bb, part.kind
		);

		let base_offset = part.first_bb as u64 * BB;
		Ok(Self { file, base_offset })
	}

	/// Performs a positioned read at `base_offset + bb_offset*BB +
	/// byte_offset`, looping across partial reads and retrying on
	/// `EINTR`. A zero-byte read before `dst` is filled is EOF and fails.
	pub fn read_at(&self, bb_offset: u64, byte_offset: u64, dst: &mut [u8]) -> Result<()> {
		let offset = self
			.base_offset
			.checked_add(bb_offset.saturating_mul(BB))
			.and_then(|o| o.checked_add(byte_offset))
			.ok_or_else(|| Error::Invalid("block offset overflow".into()))?;
		Self::pread_exact(&self.file, offset, dst)
	}

	/// Convenience for a `nblks * BB`-byte read aligned to block
	/// boundaries.
	pub fn read_bbs(&self, bb_offset: u64, dst: &mut [u8], nblks: usize) -> Result<()> {
		debug_assert_eq!(dst.len(), nblks * BB as usize);
		self.read_at(bb_offset, 0, dst)
	}

	fn pread_exact(file: &File, mut offset: u64, mut dst: &mut [u8]) -> Result<()> {
		while !dst.is_empty() {
			match file.read_at(dst, offset) {
				Ok(0) => {
					return Err(Error::Io(io::Error::new(
						io::ErrorKind::UnexpectedEof,
						"read past end of image",
					)));
				}
				Ok(n) => {
					dst = &mut dst[n..];
					offset += n as u64;
				}
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(Error::Io(e)),
			}
		}
		Ok(())
	}
}
