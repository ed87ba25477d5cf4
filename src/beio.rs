//! Big-endian decode helpers.
//!
//! Every multibyte integer on an EFS volume is big-endian regardless of
//! host byte order. The original C driver swaps bytes at read time only on
//! little-endian hosts (`GET_U32`/`GET_I32` macros gated on
//! `__BYTE_ORDER__`); here we just always decode explicitly, which is
//! correct on every host and needs no endian detection.

use crate::error::Error;

/// Reads a big-endian `u16` at `off` in `buf`.
pub fn get_u16(buf: &[u8], off: usize) -> u16 {
	u16::from_be_bytes(buf[off..off + 2].try_into().unwrap())
}

/// Reads a big-endian `i16` at `off` in `buf`.
pub fn get_i16(buf: &[u8], off: usize) -> i16 {
	i16::from_be_bytes(buf[off..off + 2].try_into().unwrap())
}

/// Reads a big-endian `u32` at `off` in `buf`.
pub fn get_u32(buf: &[u8], off: usize) -> u32 {
	u32::from_be_bytes(buf[off..off + 4].try_into().unwrap())
}

/// Reads a big-endian `i32` at `off` in `buf`.
pub fn get_i32(buf: &[u8], off: usize) -> i32 {
	i32::from_be_bytes(buf[off..off + 4].try_into().unwrap())
}

/// Reads `buf` as a byte slice, bailing with [`Error::Invalid`] if it is
/// shorter than `len` bytes starting at `off`.
pub fn check_len(buf: &[u8], off: usize, len: usize, what: &str) -> Result<(), Error> {
	if buf.len() < off + len {
		return Err(Error::Invalid(format!(
			"{what}: buffer too short ({} < {})",
			buf.len(),
			off + len
		)));
	}
	Ok(())
}
