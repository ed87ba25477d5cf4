//! On-disk inode decoding and the in-core inode (C4's data side; the
//! cache and fetch logic live on [`crate::mount::Mount`]).
//!
//! Grounded on `efs_od_inode_t`/`efs_inode_t` and `efs_inode_load_extents`
//! in the original driver.

use crate::beio::{check_len, get_i16, get_i32, get_u16};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::extent::{decode_extent, decode_extents, Extent, EXTENTS_PER_BB};
use crate::superblock::Superblock;

/// Maximum number of extent descriptors stored directly in an inode.
pub const DIRECT_EXTENTS: usize = 12;
/// On-disk inode size in bytes.
pub const INODE_SIZE: usize = 128;
/// File type bits within `mode`.
pub const S_IFMT: u16 = 0o170_000;
/// Directory file type.
pub const S_IFDIR: u16 = 0o040_000;

/// Inode flag: extent loading failed; `open`/`getattr` must surface `IO`.
pub const FLAG_BAD_FILE: u32 = 1;

/// The fixed fields of an on-disk inode, decoded.
#[derive(Debug, Clone)]
pub struct OnDiskInode {
	pub mode: u16,
	pub nlink: i16,
	pub uid: u16,
	pub gid: u16,
	pub size: i32,
	pub atime: u32,
	pub mtime: u32,
	pub ctime: u32,
	pub gen: i32,
	pub nextents: i16,
	pub version: u8,
	/// The 96-byte union: extent array, symlink target, or device number.
	pub data: [u8; 96],
}

impl OnDiskInode {
	/// Decodes the 128-byte on-disk inode layout.
	pub fn decode(buf: &[u8]) -> Result<Self> {
		check_len(buf, 0, INODE_SIZE, "inode")?;
		let mut data = [0u8; 96];
		data.copy_from_slice(&buf[32..128]);
		Ok(Self {
			mode: get_u16(buf, 0),
			nlink: get_i16(buf, 2),
			uid: get_u16(buf, 4),
			gid: get_u16(buf, 6),
			size: get_i32(buf, 8),
			atime: crate::beio::get_u32(buf, 12),
			mtime: crate::beio::get_u32(buf, 16),
			ctime: crate::beio::get_u32(buf, 20),
			gen: get_i32(buf, 24),
			nextents: get_i16(buf, 28),
			version: buf[30],
			data,
		})
	}
}

/// A POSIX-ish stat snapshot, filled once at inode construction.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
	pub ino: u64,
	pub mode: u32,
	pub nlink: u32,
	pub uid: u32,
	pub gid: u32,
	pub size: u64,
	pub atime: u32,
	pub mtime: u32,
	pub ctime: u32,
	pub blksize: u32,
	pub blocks: u64,
}

/// The in-core inode: decoded fixed fields plus the materialised extent
/// array and derived totals. Never mutated after construction except for
/// [`FLAG_BAD_FILE`].
#[derive(Debug)]
pub struct Inode {
	pub num: u32,
	pub od: OnDiskInode,
	pub stat: Stat,
	/// Extents in ascending `logical_offset` order, pairwise non-overlapping.
	pub extents: Vec<Extent>,
	pub blocks_including_holes: u32,
	pub allocated_blocks: u32,
	pub flags: u32,
}

impl Inode {
	pub fn is_bad_file(&self) -> bool {
		self.flags & FLAG_BAD_FILE != 0
	}

	pub fn is_dir(&self) -> bool {
		self.od.mode & S_IFMT == S_IFDIR
	}
}

/// Reads and decodes the on-disk inode for `ino`, using the superblock's
/// `inode_to_location` identity to find it.
pub fn read_on_disk_inode(device: &Device, sb: &Superblock, ino: u32) -> Result<OnDiskInode> {
	let (block, byte_ofs) = sb.inode_to_location(ino);
	let mut buf = [0u8; INODE_SIZE];
	device.read_at(block, byte_ofs, &mut buf)?;
	OnDiskInode::decode(&buf)
}

/// Loads an inode's extent list, direct or indirect per spec §4.4.
///
/// Direct (`nextents <= 12`): decode the 12 direct slots in order.
/// Indirect (`nextents > 12`): the first direct slot's `ext2.offset` gives
/// `N`, the number of indirect BBs in use; each of the first `N` direct
/// slots' `ext1.bn` points at an indirect BB holding 64 extent
/// descriptors, which are decoded and appended in order.
pub fn load_extents(device: &Device, od: &OnDiskInode) -> Result<Vec<Extent>> {
	let n = od.nextents as u16 as usize;

	if n <= DIRECT_EXTENTS {
		let mut extents = Vec::new();
		extents.try_reserve(n).map_err(|_| Error::OutOfMemory)?;
		for i in 0..n {
			let off = i * 8;
			extents.push(decode_extent(&od.data[off..off + 8])?);
		}
		return Ok(extents);
	}

	// Indirect: first slot's ext2.offset carries N, the indirect BB count.
	let first_ext2 = crate::beio::get_u32(&od.data, 4);
	let indirect_bb_count = (first_ext2 & 0x00FF_FFFF) as usize;
	if indirect_bb_count == 0 || indirect_bb_count > DIRECT_EXTENTS {
		return Err(Error::Invalid(format!(
			"invalid indirect block count {indirect_bb_count}"
		)));
	}

	let mut extents = Vec::new();
	extents
		.try_reserve(indirect_bb_count * EXTENTS_PER_BB)
		.map_err(|_| Error::OutOfMemory)?;
	for i in 0..indirect_bb_count {
		let slot_off = i * 8;
		let ext1 = crate::beio::get_u32(&od.data, slot_off);
		let magic = ext1 >> 24;
		if magic != 0 {
			return Err(Error::Invalid(format!(
				"indirect pointer {i} has wrong magic 0x{magic:x}"
			)));
		}
		let indirect_bn = ext1 & 0x00FF_FFFF;
		let mut ind_buf = [0u8; 512];
		device.read_bbs(indirect_bn as u64, &mut ind_buf, 1)?;
		let mut block_extents = decode_extents(&ind_buf, EXTENTS_PER_BB)?;
		extents.append(&mut block_extents);
	}

	if extents.len() != n {
		return Err(Error::Invalid(format!(
			"materialised {} extents, expected {n}",
			extents.len()
		)));
	}

	Ok(extents)
}

/// Computes `blocks_including_holes` (`max(offset + len)` over all
/// extents) and `allocated_blocks` (`sum(len)`).
pub fn extent_totals(extents: &[Extent]) -> (u32, u32) {
	let mut blocks_including_holes = 0u32;
	let mut allocated_blocks = 0u32;
	for e in extents {
		blocks_including_holes = blocks_including_holes.max(e.logical_offset + e.len as u32);
		allocated_blocks += e.len as u32;
	}
	(blocks_including_holes, allocated_blocks)
}

/// Builds the stat snapshot for an on-disk inode, per spec §4.4.
pub fn build_stat(num: u32, od: &OnDiskInode) -> Stat {
	let size = od.size.max(0) as u64;
	Stat {
		ino: num as u64,
		mode: od.mode as u32,
		nlink: od.nlink as u32,
		uid: od.uid as u32,
		gid: od.gid as u32,
		size,
		atime: od.atime,
		mtime: od.mtime,
		ctime: od.ctime,
		blksize: 512,
		blocks: size / 512 + 1,
	}
}
