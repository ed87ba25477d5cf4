//! The `Mount` aggregate: owns the device, superblock and caches that the
//! original driver kept as a file-scope global (`efs_fs_t fs`) and static
//! cache lists. Every operation here takes `&Mount` (or a narrower slice
//! of it) instead of touching global state, per the driver's own design
//! note that caches should be gathered into one explicit value threaded
//! through every call.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::device::{Device, PartitionSelector};
use crate::error::Result;
use crate::inode::{self, extent_totals, build_stat, Inode};
use crate::path::PathCache;
use crate::superblock::Superblock;

/// Inode cache: `Mutex<HashMap<ino, Arc<Inode>>>`, lock held across the
/// full construction of a missing inode for at-most-one-construction
/// semantics, mirroring `icache_mtx` held across `efs_iget`'s disk read.
#[derive(Default)]
pub struct InodeStore {
	entries: Mutex<HashMap<u32, Arc<Inode>>>,
}

impl InodeStore {
	pub fn new() -> Self {
		Self {
			entries: Mutex::new(HashMap::new()),
		}
	}

	/// Fetches inode `ino`, constructing and caching it on a miss. The
	/// disk read, extent load, and insert all happen under the lock so two
	/// racing callers for the same `ino` never both hit the disk.
	pub fn get(&self, device: &Device, sb: &Superblock, ino: u32) -> Result<Arc<Inode>> {
		let mut entries = self.entries.lock().unwrap();
		if let Some(inode) = entries.get(&ino) {
			return Ok(Arc::clone(inode));
		}

		let od = inode::read_on_disk_inode(device, sb, ino)?;
		let stat = build_stat(ino, &od);

		let (extents, flags) = match inode::load_extents(device, &od) {
			Ok(extents) => (extents, 0),
			Err(_) => (Vec::new(), inode::FLAG_BAD_FILE),
		};
		let (blocks_including_holes, allocated_blocks) = extent_totals(&extents);

		let built = Arc::new(Inode {
			num: ino,
			od,
			stat,
			extents,
			blocks_including_holes,
			allocated_blocks,
			flags,
		});
		entries.insert(ino, Arc::clone(&built));
		Ok(built)
	}
}

/// A filesystem-statistics snapshot, the `statvfs` the original fills
/// straight from the superblock (`efs_statfs`).
#[derive(Debug, Clone, Copy)]
pub struct StatVfs {
	pub bsize: u64,
	pub frsize: u64,
	pub blocks: u64,
	pub bfree: u64,
	pub bavail: u64,
	pub files: u64,
	pub ffree: u64,
	pub favail: u64,
}

/// Everything one mounted filesystem needs: the device, its superblock,
/// the inode cache, and the path cache. Constructed once in `main` and
/// passed by reference into the FUSE adapter.
pub struct Mount {
	pub device: Device,
	pub superblock: Superblock,
	pub inodes: InodeStore,
	pub paths: PathCache,
}

impl Mount {
	/// Opens `image_path`, selects a partition, and reads the superblock
	/// at partition-relative BB 1, per `efs_vol_open` + `efs_mount`.
	pub fn open(image_path: &Path, selector: PartitionSelector) -> Result<Self> {
		let device = Device::open(image_path, selector)?;

		let mut sb_buf = [0u8; 512];
		device.read_bbs(1, &mut sb_buf, 1)?;
		let superblock = Superblock::decode(&sb_buf)?;

		Ok(Self {
			device,
			superblock,
			inodes: InodeStore::new(),
			paths: PathCache::new(),
		})
	}

	pub fn namei(&self, path: &str) -> Result<Arc<Inode>> {
		self.paths.namei(&self.device, &self.superblock, &self.inodes, path)
	}

	pub fn get_inode(&self, ino: u32) -> Result<Arc<Inode>> {
		self.inodes.get(&self.device, &self.superblock, ino)
	}

	/// `statvfs` snapshot. `files` is preserved bit-for-bit as
	/// `ino_free * 2`, a value the original also derives this way
	/// (`efs_statfs`'s `st_files = s_ino_free * 2`) despite it almost
	/// certainly double-counting; this driver is read-only and reports
	/// what the on-disk superblock implies rather than correcting it.
	pub fn statvfs(&self) -> StatVfs {
		let sb = &self.superblock;
		StatVfs {
			bsize: 512,
			frsize: 512,
			blocks: sb.size_bbs.max(0) as u64,
			bfree: sb.blk_free.max(0) as u64,
			bavail: sb.blk_free.max(0) as u64,
			files: sb.ino_free.max(0) as u64 * 2,
			ffree: sb.ino_free.max(0) as u64,
			favail: sb.ino_free.max(0) as u64,
		}
	}
}
