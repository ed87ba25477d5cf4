//! Command-line parsing.
//!
//! Mirrors the original `fuse_opt` table in `main.c` literally:
//! `--fs=<path>`, `--partition=<N>`, `--debug=<0-3>`, `-h`/`--help`, and a
//! positional mountpoint. `clap`'s default "exit 2 on parse error"
//! behaviour already matches the original's `usage()` + `exit(2)` path,
//! but help and validation-failure exit codes are re-derived explicitly
//! in `main` to keep the 0/1/2 contract exact (clap exits 0 on `--help`,
//! which the original also does via `show_help` falling into the
//! `rc == EXIT_SUCCESS ? 2 : rc` branch — i.e. `--help` alone is
//! exit code 2, not 0).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
	name = "mount.sgiefs",
	about = "Read-only FUSE driver for the SGI EFS filesystem",
	disable_help_flag = true
)]
pub struct Cli {
	/// Path to the filesystem image.
	#[arg(long = "fs")]
	pub fs_image: Option<PathBuf>,

	/// Partition index to mount (0-15); default is auto-select.
	#[arg(long = "partition")]
	pub partition: Option<u8>,

	/// Debug message verbosity level (0-3).
	#[arg(long = "debug", default_value_t = 0)]
	pub debug: u8,

	/// Show this message.
	#[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
	pub show_help: bool,

	/// Where to mount the filesystem.
	pub mountpoint: Option<PathBuf>,
}

impl Cli {
	pub fn usage(prog_name: &str) -> String {
		format!(
			"Usage: {prog_name} [options] <mountpoint>\n\
			 File system specific options\n\
			 \t--partition=<N>\tNumber of partition to mount\n\
			 \t--debug=<N>\tDebug message verbosity level (0-3)\n\
			 \t--fs=<path>\tPath to file system image\n\
			 \t--help | -h\tThis message\n"
		)
	}
}
