//! FUSE host adapter: a thin `fuser::Filesystem` implementation that
//! translates kernel requests into `Mount` operations and `Error`s into
//! errno replies.
//!
//! Grounded on `efs_oper`/`efs_getattr`/`efs_open`/`efs_read`/
//! `efs_readdir`/`efs_statfs` in the original driver's `main.c`, restated
//! against `fuser`'s request/reply API the way `fuse-ufs` wires up its
//! own `Filesystem` impl.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::sync::Mutex;
use std::time::{Duration, UNIX_EPOCH};

use fuser::{
	FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyStatfs,
	Request,
};
use log::{debug, error};

use crate::inode::{Inode, S_IFDIR, S_IFMT};
use crate::mount::Mount;
use crate::path::ROOT_INO;
use crate::reader;

/// Translates a FUSE-protocol inode number into an EFS inode number. The
/// kernel always addresses the mount's root as `fuser::FUSE_ROOT_ID` (1),
/// but this filesystem's own root is EFS inode [`ROOT_INO`] (2); every
/// other inode number is passed through unchanged, since this driver
/// otherwise uses the EFS inode number directly as the FUSE inode number.
fn to_efs_ino(ino: u64) -> u32 {
	if ino == fuser::FUSE_ROOT_ID {
		ROOT_INO
	} else {
		ino as u32
	}
}

/// How long the kernel may cache attributes and entries. The image is
/// immutable for the life of the mount, so this can be generous.
const TTL: Duration = Duration::from_secs(60);

/// Matches `EFS_DIR_ENTRY_MOD` (`EFS_DIRBLK_SLOTS_MAX + 1`): the
/// `readdir` offset encoding is `blkno * MOD + slotno`.
const DIR_ENTRY_MOD: u64 = 73;

pub struct EfsFuse {
	mount: Mount,
	/// Maps a fuse/efs inode number back to the absolute path it was last
	/// reached at, populated on every successful `lookup`. `getattr`/
	/// `open`/`read` only need the inode number (fetched straight from
	/// `Mount::get_inode`), but `lookup` needs its parent's path to build
	/// the child's, since `efs_dir_namei` only resolves whole paths.
	ino_paths: Mutex<HashMap<u64, String>>,
}

impl EfsFuse {
	pub fn new(mount: Mount) -> Self {
		let mut ino_paths = HashMap::new();
		ino_paths.insert(fuser::FUSE_ROOT_ID, "/".to_string());
		Self {
			mount,
			ino_paths: Mutex::new(ino_paths),
		}
	}

	fn lookup_path(&self, parent_ino: u64, name: &OsStr) -> crate::error::Result<(String, std::sync::Arc<Inode>)> {
		let parent = self
			.ino_paths
			.lock()
			.unwrap()
			.get(&parent_ino)
			.cloned()
			.ok_or(crate::error::Error::NotFound)?;
		let name = name.to_str().ok_or(crate::error::Error::Invalid("non-UTF8 name".into()))?;
		let path = if parent == "/" {
			format!("/{name}")
		} else {
			format!("{parent}/{name}")
		};
		let inode = self.mount.namei(&path)?;
		Ok((path, inode))
	}
}

fn to_file_attr(inode: &Inode) -> FileAttr {
	let kind = if inode.od.mode & S_IFMT == S_IFDIR {
		FileType::Directory
	} else {
		FileType::RegularFile
	};
	let time = |secs: u32| UNIX_EPOCH + Duration::from_secs(secs as u64);
	FileAttr {
		ino: inode.num as u64,
		size: inode.stat.size,
		blocks: inode.stat.blocks,
		atime: time(inode.stat.atime),
		mtime: time(inode.stat.mtime),
		ctime: time(inode.stat.ctime),
		crtime: time(inode.stat.ctime),
		kind,
		perm: (inode.stat.mode & 0o7777) as u16,
		nlink: inode.stat.nlink,
		uid: inode.stat.uid,
		gid: inode.stat.gid,
		rdev: 0,
		blksize: inode.stat.blksize,
		flags: 0,
	}
}

impl Filesystem for EfsFuse {
	fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
		match self.lookup_path(parent, name) {
			Ok((_, inode)) if inode.is_bad_file() => {
				error!("lookup: bad file at parent {parent}");
				reply.error(libc::EIO);
			}
			Ok((path, inode)) => {
				self.ino_paths.lock().unwrap().insert(inode.num as u64, path);
				reply.entry(&TTL, &to_file_attr(&inode), 0)
			}
			Err(e) => {
				debug!("lookup failed: {e}");
				reply.error(e.to_errno());
			}
		}
	}

	fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
		match self.mount.get_inode(to_efs_ino(ino)) {
			Ok(inode) if inode.is_bad_file() => reply.error(libc::EIO),
			Ok(inode) => reply.attr(&TTL, &to_file_attr(&inode)),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: fuser::ReplyOpen) {
		match self.mount.get_inode(to_efs_ino(ino)) {
			Ok(inode) if inode.is_bad_file() => reply.error(libc::EIO),
			Ok(_) => reply.opened(0, 0),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn read(
		&mut self,
		_req: &Request,
		ino: u64,
		_fh: u64,
		offset: i64,
		size: u32,
		_flags: i32,
		_lock_owner: Option<u64>,
		reply: ReplyData,
	) {
		let inode = match self.mount.get_inode(to_efs_ino(ino)) {
			Ok(inode) => inode,
			Err(e) => return reply.error(e.to_errno()),
		};
		if inode.is_bad_file() {
			return reply.error(libc::EIO);
		}

		const BB: u64 = 512;
		let offset = offset.max(0) as u64;
		let logical_bb = (offset / BB) as u32;
		let nblks = (size as u64 / BB).max(1) as u32;
		let nblks = nblks.min(inode.blocks_including_holes.saturating_sub(logical_bb));

		if nblks == 0 {
			return reply.data(&[]);
		}

		let mut buf = vec![0u8; nblks as usize * BB as usize];
		match reader::read(&self.mount.device, &inode, logical_bb, nblks, &mut buf) {
			Ok(n) => reply.data(&buf[..n]),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn readdir(&mut self, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
		let inode = match self.mount.get_inode(to_efs_ino(ino)) {
			Ok(inode) => inode,
			Err(e) => return reply.error(e.to_errno()),
		};
		if !inode.is_dir() {
			return reply.error(libc::ENOTDIR);
		}

		let parent_path = self.ino_paths.lock().unwrap().get(&ino).cloned();

		let mut blkno = (offset as u64 / DIR_ENTRY_MOD) as u32;
		let mut slotno = (offset as u64 % DIR_ENTRY_MOD) as u8;

		loop {
			let mut buf = [0u8; 512];
			match reader::read(&self.mount.device, &inode, blkno, 1, &mut buf) {
				Ok(_) => {}
				Err(crate::error::Error::OutOfRange) => break,
				Err(e) => return reply.error(e.to_errno()),
			}
			let db = match crate::dir::DirBlock::decode(&buf) {
				Ok(db) => db,
				Err(e) => return reply.error(e.to_errno()),
			};

			while slotno < db.slot_count() {
				let entry = match db.get_entry(slotno) {
					Ok(Some(entry)) => entry,
					Ok(None) => {
						slotno += 1;
						continue;
					}
					Err(e) => return reply.error(e.to_errno()),
				};
				let child = match self.mount.get_inode(entry.ino) {
					Ok(child) => child,
					Err(_) => {
						slotno += 1;
						continue;
					}
				};
				let kind = if child.od.mode & S_IFMT == S_IFDIR {
					FileType::Directory
				} else {
					FileType::RegularFile
				};
				let name = OsStr::from_bytes(&entry.name);
				if let Some(parent_path) = &parent_path {
					if entry.name != b"." && entry.name != b".." {
						let child_path = if parent_path == "/" {
							format!("/{}", String::from_utf8_lossy(&entry.name))
						} else {
							format!("{parent_path}/{}", String::from_utf8_lossy(&entry.name))
						};
						self.ino_paths.lock().unwrap().insert(entry.ino as u64, child_path);
					}
				}
				let next_off = blkno as u64 * DIR_ENTRY_MOD + slotno as u64 + 1;
				slotno += 1;
				if reply.add(entry.ino as u64, next_off as i64, kind, name) {
					return reply.ok();
				}
			}

			blkno += 1;
			slotno = 0;
		}

		reply.ok();
	}

	fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
		let st = self.mount.statvfs();
		reply.statfs(
			st.blocks,
			st.bfree,
			st.bavail,
			st.files,
			st.ffree,
			st.bsize as u32,
			255,
			st.frsize as u32,
		);
	}
}
