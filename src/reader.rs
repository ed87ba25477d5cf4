//! Extent Reader (C5): maps a logical block range of a file onto device
//! reads, zero-filling holes.
//!
//! Re-derived from first principles against spec §4.5 rather than ported
//! from `efs_iread`'s `buf_off = start - blkno` arithmetic, which computes
//! the wrong thing whenever a read starts inside an extent rather than at
//! its first block.

use crate::device::Device;
use crate::error::{Error, Result};
use crate::inode::Inode;

/// Reads `nblks` logical Basic Blocks of `inode` starting at `logical_bb`
/// into `dst` (must be exactly `nblks * 512` bytes), zero-filling any
/// blocks that fall in a hole between extents.
///
/// Returns [`Error::OutOfRange`] if `logical_bb >= blocks_including_holes`.
/// A request extending past `blocks_including_holes` is silently clamped,
/// per spec §4.5 (the caller receives a short read, not an error, when
/// only the tail runs off the end).
pub fn read(device: &Device, inode: &Inode, logical_bb: u32, nblks: u32, dst: &mut [u8]) -> Result<usize> {
	const BB: usize = 512;
	debug_assert_eq!(dst.len(), nblks as usize * BB);

	if logical_bb >= inode.blocks_including_holes {
		return Err(Error::OutOfRange);
	}

	let end = logical_bb.saturating_add(nblks).min(inode.blocks_including_holes);
	let clamped_nblks = end - logical_bb;

	let mut filled = 0u32;
	while filled < clamped_nblks {
		let cur = logical_bb + filled;
		let dst_off = filled as usize * BB;

		match find_extent_covering(&inode.extents, cur) {
			Some(ext) => {
				let run_end_in_extent = (ext.logical_offset + ext.len as u32).min(end);
				let run_len = run_end_in_extent - cur;
				let device_bn = ext.device_bn + (cur - ext.logical_offset);
				let byte_len = run_len as usize * BB;
				device.read_bbs(device_bn as u64, &mut dst[dst_off..dst_off + byte_len], run_len as usize)?;
				filled += run_len;
			}
			None => {
				// Hole: zero-fill up to the next extent's start or `end`.
				let next_start = inode
					.extents
					.iter()
					.map(|e| e.logical_offset)
					.filter(|&o| o > cur)
					.min()
					.unwrap_or(end);
				let run_end = next_start.min(end);
				let run_len = run_end - cur;
				let byte_len = run_len as usize * BB;
				dst[dst_off..dst_off + byte_len].fill(0);
				filled += run_len;
			}
		}
	}

	Ok(clamped_nblks as usize * BB)
}

fn find_extent_covering(extents: &[crate::extent::Extent], bb: u32) -> Option<&crate::extent::Extent> {
	extents
		.iter()
		.find(|e| bb >= e.logical_offset && bb < e.logical_offset + e.len as u32)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::extent::Extent;
	use crate::inode::{build_stat, OnDiskInode};
	use std::io::Write;

	fn make_device(contents: &[u8]) -> (tempfile::NamedTempFile, Device) {
		let mut f = tempfile::NamedTempFile::new().unwrap();
		// Minimal volume header so Device::open succeeds with a whole-disk,
		// zero-offset partition covering this image.
		let mut img = vec![0u8; 512];
		img[0..4].copy_from_slice(&crate::volume::BOOT_BLOCK_MAGIC.to_be_bytes());
		let off = 312;
		img[off..off + 4].copy_from_slice(&((contents.len() / 512 + 10) as i32).to_be_bytes());
		img[off + 4..off + 8].copy_from_slice(&0i32.to_be_bytes());
		img[off + 8..off + 12].copy_from_slice(&crate::volume::PART_EFS.to_be_bytes());
		img.extend_from_slice(contents);
		f.write_all(&img).unwrap();
		f.flush().unwrap();
		let device = Device::open(f.path(), crate::device::PartitionSelector::Auto).unwrap();
		(f, device)
	}

	fn make_inode(extents: Vec<Extent>) -> Inode {
		let (holes, allocated) = crate::inode::extent_totals(&extents);
		let od = OnDiskInode {
			mode: 0o100644,
			nlink: 1,
			uid: 0,
			gid: 0,
			size: (holes as i32) * 512,
			atime: 0,
			mtime: 0,
			ctime: 0,
			gen: 0,
			nextents: extents.len() as i16,
			version: 0,
			data: [0u8; 96],
		};
		let stat = build_stat(9, &od);
		Inode {
			num: 9,
			od,
			stat,
			extents,
			blocks_including_holes: holes,
			allocated_blocks: allocated,
			flags: 0,
		}
	}

	#[test]
	fn reads_a_single_contiguous_extent() {
		let mut contents = vec![0u8; 512 * 12];
		// Block 10 (device) holds distinct bytes so we can tell reads apart.
		contents[10 * 512..10 * 512 + 4].copy_from_slice(b"ABCD");
		let (_tmp, device) = make_device(&contents);
		let inode = make_inode(vec![Extent {
			logical_offset: 0,
			device_bn: 10 + 1, // +1 because the volume header occupies BB 0
			len: 1,
		}]);
		let mut dst = [0u8; 512];
		let n = read(&device, &inode, 0, 1, &mut dst).unwrap();
		assert_eq!(n, 512);
		assert_eq!(&dst[0..4], b"ABCD");
	}

	#[test]
	fn zero_fills_a_hole_between_extents() {
		let contents = vec![0xFFu8; 512 * 12];
		let (_tmp, device) = make_device(&contents);
		let inode = make_inode(vec![
			Extent {
				logical_offset: 0,
				device_bn: 1,
				len: 1,
			},
			Extent {
				logical_offset: 2,
				device_bn: 3,
				len: 1,
			},
		]);
		let mut dst = [0u8; 512 * 3];
		let n = read(&device, &inode, 0, 3, &mut dst).unwrap();
		assert_eq!(n, 512 * 3);
		assert_eq!(&dst[0..512], &[0xFFu8; 512][..]);
		assert_eq!(&dst[512..1024], &[0u8; 512][..]);
		assert_eq!(&dst[1024..1536], &[0xFFu8; 512][..]);
	}

	#[test]
	fn out_of_range_past_last_block_is_rejected() {
		let contents = vec![0u8; 512 * 4];
		let (_tmp, device) = make_device(&contents);
		let inode = make_inode(vec![Extent {
			logical_offset: 0,
			device_bn: 1,
			len: 1,
		}]);
		let mut dst = [0u8; 512];
		assert!(matches!(
			read(&device, &inode, 1, 1, &mut dst),
			Err(Error::OutOfRange)
		));
	}

	#[test]
	fn read_past_holes_is_clamped_not_errored() {
		let contents = vec![0u8; 512 * 4];
		let (_tmp, device) = make_device(&contents);
		let inode = make_inode(vec![Extent {
			logical_offset: 0,
			device_bn: 1,
			len: 2,
		}]);
		let mut dst = [0u8; 512 * 5];
		let n = read(&device, &inode, 0, 5, &mut dst).unwrap();
		assert_eq!(n, 512 * 2);
	}
}
