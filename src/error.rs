//! The driver's error type.
//!
//! Mirrors the error kinds in the original C driver (`EIO`, `EINVAL`,
//! `ENOENT`, `ENOTDIR`, `ENXIO`, `ENOMEM`) without tying the core to errno
//! integers directly; the FUSE adapter maps an [`Error`] to an errno at the
//! boundary via [`Error::to_errno`].

use std::io;

/// Errors produced while decoding the on-disk format or resolving paths.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A positioned read on the backing image failed, or hit EOF early.
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
	/// A magic number mismatched or an on-disk structure was malformed.
	#[error("invalid on-disk structure: {0}")]
	Invalid(String),
	/// A directory entry, path component, or partition could not be found.
	#[error("not found")]
	NotFound,
	/// A path component that should be a directory is not one.
	#[error("not a directory")]
	NotDir,
	/// A read was requested past a file's logical block count.
	#[error("read out of range")]
	OutOfRange,
	/// An allocation for a decoded structure could not be satisfied.
	#[error("out of memory")]
	OutOfMemory,
}

impl Error {
	/// Maps this error onto a libc errno, for the FUSE boundary.
	pub fn to_errno(&self) -> i32 {
		match self {
			Error::Io(_) => libc::EIO,
			Error::Invalid(_) => libc::EINVAL,
			Error::NotFound => libc::ENOENT,
			Error::NotDir => libc::ENOTDIR,
			Error::OutOfRange => libc::ENXIO,
			Error::OutOfMemory => libc::ENOMEM,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
