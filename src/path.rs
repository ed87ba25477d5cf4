//! Path Resolver (C8): resolves an absolute path to an inode by walking
//! directory components one at a time, with a cache of previously
//! resolved full paths.
//!
//! Grounded on `efs_dir_namei` in the original driver; the name cache
//! there (`ncache`, a linked list under `ncache_mtx`) becomes a
//! `Mutex<HashMap<...>>` here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::device::Device;
use crate::dir::DirBlock;
use crate::error::{Error, Result};
use crate::inode::Inode;
use crate::mount::InodeStore;
use crate::superblock::Superblock;
use crate::walk::{walk, Step};

/// Inode number of the filesystem root.
pub const ROOT_INO: u32 = 2;

/// Caches resolved absolute paths to their inode, held across the whole
/// resolution of a miss so two racing lookups of the same path cannot
/// both walk the tree (mirrors `ncache_mtx` being held for the duration
/// of `efs_dir_namei`).
#[derive(Default)]
pub struct PathCache {
	entries: Mutex<HashMap<String, Arc<Inode>>>,
}

impl PathCache {
	pub fn new() -> Self {
		Self {
			entries: Mutex::new(HashMap::new()),
		}
	}

	/// Resolves `path` (must start with `/`) to its inode, consulting and
	/// populating the cache. The lock is held for the full resolution on a
	/// miss, matching the original's coarse-grained mutex.
	pub fn namei(
		&self,
		device: &Device,
		sb: &Superblock,
		inodes: &InodeStore,
		path: &str,
	) -> Result<Arc<Inode>> {
		if !path.starts_with('/') {
			return Err(Error::Invalid("path must be absolute".into()));
		}

		let mut entries = self.entries.lock().unwrap();
		if let Some(inode) = entries.get(path) {
			return Ok(Arc::clone(inode));
		}

		let mut cur_ino = ROOT_INO;
		let mut inode = inodes.get(device, sb, cur_ino)?;
		for component in path.split('/').filter(|c| !c.is_empty()) {
			cur_ino = dir_lookup(device, &inode, component)?;
			inode = inodes.get(device, sb, cur_ino)?;
		}

		entries.insert(path.to_string(), Arc::clone(&inode));
		Ok(inode)
	}
}

/// Looks up a single path component in directory `inode`, walking its
/// directory blocks (C7) and decoding each one (C6) until found.
pub fn dir_lookup(device: &Device, inode: &Inode, name: &str) -> Result<u32> {
	if !inode.is_dir() {
		return Err(Error::NotDir);
	}

	let mut found: Option<u32> = None;
	let name_bytes = name.as_bytes();

	walk(inode, 0, 0, |device_bn, _logical_off| {
		let mut buf = [0u8; 512];
		device.read_bbs(device_bn as u64, &mut buf, 1)?;
		let db = DirBlock::decode(&buf)?;
		match db.lookup(name_bytes)? {
			Some(ino) => {
				found = Some(ino);
				Ok(Step::Stop)
			}
			None => Ok(Step::Continue),
		}
	})?;

	found.ok_or(Error::NotFound)
}
