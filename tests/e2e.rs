//! End-to-end scenarios against a small synthetic EFS image, built by hand
//! byte-for-byte rather than through any encoder this driver doesn't
//! otherwise ship (there is nothing to write EFS images with, by design —
//! this driver is read-only).

use std::io::Write;

use sgiefs::device::PartitionSelector;
use sgiefs::error::Error;
use sgiefs::mount::Mount;

const BB: usize = 512;

fn put_u32(buf: &mut [u8], off: usize, val: u32) {
	buf[off..off + 4].copy_from_slice(&val.to_be_bytes());
}

fn put_i32(buf: &mut [u8], off: usize, val: i32) {
	buf[off..off + 4].copy_from_slice(&val.to_be_bytes());
}

fn put_u16(buf: &mut [u8], off: usize, val: u16) {
	buf[off..off + 2].copy_from_slice(&val.to_be_bytes());
}

fn put_i16(buf: &mut [u8], off: usize, val: i16) {
	buf[off..off + 2].copy_from_slice(&val.to_be_bytes());
}

fn pack_extent(buf: &mut [u8], off: usize, bn: u32, len: u8, logical_offset: u32) {
	let ext1 = bn & 0x00FF_FFFF;
	let ext2 = ((len as u32) << 24) | (logical_offset & 0x00FF_FFFF);
	put_u32(buf, off, ext1);
	put_u32(buf, off + 4, ext2);
}

fn pack_inode(mode: u16, nlink: i16, size: i32, extents: &[(u32, u8, u32)]) -> [u8; 128] {
	let mut buf = [0u8; 128];
	put_u16(&mut buf, 0, mode);
	put_i16(&mut buf, 2, nlink);
	put_u16(&mut buf, 4, 0); // uid
	put_u16(&mut buf, 6, 0); // gid
	put_i32(&mut buf, 8, size);
	put_u32(&mut buf, 12, 1_700_000_000); // atime
	put_u32(&mut buf, 16, 1_700_000_000); // mtime
	put_u32(&mut buf, 20, 1_700_000_000); // ctime
	put_i32(&mut buf, 24, 0); // gen
	put_i16(&mut buf, 28, extents.len() as i16);
	buf[30] = 1; // version
	for (i, (bn, len, off)) in extents.iter().enumerate() {
		pack_extent(&mut buf, 32 + i * 8, *bn, *len, *off);
	}
	buf
}

fn pack_dirblock(entries: &[(u32, &[u8])]) -> [u8; 512] {
	let mut buf = [0u8; 512];
	put_u16(&mut buf, 0, 0xBEEF);
	buf[2] = 0; // first
	buf[3] = entries.len() as u8;

	let mut cursor = 512usize;
	for (i, (ino, name)) in entries.iter().enumerate() {
		let mut entry_len = 5 + name.len();
		if entry_len % 2 != 0 {
			entry_len += 1;
		}
		cursor -= entry_len;
		put_u32(&mut buf, cursor, *ino);
		buf[cursor + 4] = name.len() as u8;
		buf[cursor + 5..cursor + 5 + name.len()].copy_from_slice(name);
		buf[4 + i] = (cursor / 2) as u8;
	}
	buf
}

/// Builds a minimal valid EFS image:
///
/// BB0: volume header, one whole-disk EFS partition.
/// BB1: superblock (`first_cg_bb=2`, `cg_size_bbs=16`, `cg_ino_bbs=1` so
///      `inos_per_cg=4`).
/// BB2: inode table for cylinder group 0 (4 slots): ino 0 unused, ino 1
///      unused, ino 2 (root dir, slot 2), ino 3 (`hello.txt`, slot 3).
/// BB3: root directory block (`.`, `..`, `hello.txt`).
/// BB4: `hello.txt`'s single data block, content `b"hi\0\0..."`.
fn build_image() -> Vec<u8> {
	// Padded past BB4 purely so the partition reports at least
	// MIN_PARTITION_BLOCKS blocks; nothing past BB4 is ever read.
	let mut img = vec![0u8; BB * 10];

	// Volume header.
	put_u32(&mut img, 0, sgiefs::volume::BOOT_BLOCK_MAGIC);
	let pt_off = 312;
	put_i32(&mut img, pt_off, 10); // block_count
	put_i32(&mut img, pt_off + 4, 0); // first_bb
	put_i32(&mut img, pt_off + 8, sgiefs::volume::PART_EFS);

	// Superblock at BB1.
	let sb_off = BB;
	put_i32(&mut img, sb_off + 0, 10); // size_bbs
	put_i32(&mut img, sb_off + 4, 2); // first_cg_bb
	put_i32(&mut img, sb_off + 8, 16); // cg_size_bbs
	put_i16(&mut img, sb_off + 12, 1); // cg_ino_bbs
	put_i16(&mut img, sb_off + 18, 1); // ncg
	put_i32(&mut img, sb_off + 28, sgiefs::superblock::EFS_MAGIC);
	put_i32(&mut img, sb_off + 48, 0); // blk_free
	put_i32(&mut img, sb_off + 52, 2); // ino_free

	// Inode table at BB2: 4 slots of 128 bytes.
	let ino_table_off = BB * 2;
	let root = pack_inode(0o040_755, 2, 512, &[(3, 1, 0)]);
	let file = pack_inode(0o100_644, 1, 2, &[(4, 1, 0)]);
	img[ino_table_off + 2 * 128..ino_table_off + 3 * 128].copy_from_slice(&root);
	img[ino_table_off + 3 * 128..ino_table_off + 4 * 128].copy_from_slice(&file);

	// Root directory block at BB3.
	let dirblk = pack_dirblock(&[(2, b"."), (2, b".."), (3, b"hello.txt")]);
	img[BB * 3..BB * 4].copy_from_slice(&dirblk);

	// File data block at BB4.
	img[BB * 4] = b'h';
	img[BB * 4 + 1] = b'i';

	img
}

fn write_image() -> tempfile::NamedTempFile {
	let mut f = tempfile::NamedTempFile::new().unwrap();
	f.write_all(&build_image()).unwrap();
	f.flush().unwrap();
	f
}

#[test]
fn mounts_with_auto_selected_partition() {
	let f = write_image();
	let mount = Mount::open(f.path(), PartitionSelector::Auto).unwrap();
	assert_eq!(mount.superblock.ino_free, 2);
}

#[test]
fn resolves_the_root_directory() {
	let f = write_image();
	let mount = Mount::open(f.path(), PartitionSelector::Auto).unwrap();
	let root = mount.namei("/").unwrap();
	assert!(root.is_dir());
	assert_eq!(root.num, 2);
}

#[test]
fn reads_a_simple_file_by_path() {
	let f = write_image();
	let mount = Mount::open(f.path(), PartitionSelector::Auto).unwrap();
	let inode = mount.namei("/hello.txt").unwrap();
	assert!(!inode.is_dir());
	assert_eq!(inode.stat.size, 2);

	let mut buf = [0u8; 512];
	let n = sgiefs::reader::read(&mount.device, &inode, 0, 1, &mut buf).unwrap();
	assert_eq!(n, 512);
	assert_eq!(&buf[0..2], b"hi");
}

#[test]
fn lookup_of_missing_name_fails_with_not_found() {
	let f = write_image();
	let mount = Mount::open(f.path(), PartitionSelector::Auto).unwrap();
	let err = mount.namei("/nope.txt").unwrap_err();
	assert!(matches!(err, Error::NotFound));
}

#[test]
fn directory_walk_finds_every_entry() {
	let f = write_image();
	let mount = Mount::open(f.path(), PartitionSelector::Auto).unwrap();
	let root = mount.namei("/").unwrap();

	let mut buf = [0u8; 512];
	mount.device.read_bbs(3, &mut buf, 1).unwrap();
	let db = sgiefs::dir::DirBlock::decode(&buf).unwrap();

	let mut names = Vec::new();
	for slot in 0..db.slot_count() {
		if let Some(entry) = db.get_entry(slot).unwrap() {
			names.push(entry.name);
		}
	}
	assert_eq!(names, vec![b".".to_vec(), b"..".to_vec(), b"hello.txt".to_vec()]);
	assert_eq!(root.num, 2);
}

#[test]
fn bad_extent_magic_marks_the_inode_bad_file_not_an_error() {
	let mut img = build_image();
	// Corrupt hello.txt's (ino 3) extent magic byte.
	let file_ino_off = BB * 2 + 3 * 128 + 32;
	img[file_ino_off] = 1; // nonzero magic
	let mut f = tempfile::NamedTempFile::new().unwrap();
	f.write_all(&img).unwrap();
	f.flush().unwrap();

	let mount = Mount::open(f.path(), PartitionSelector::Auto).unwrap();
	let inode = mount.namei("/hello.txt").unwrap();
	assert!(inode.is_bad_file());
}
