use std::process::ExitCode;

use clap::Parser;
use log::error;

use sgiefs::cli::Cli;
use sgiefs::device::PartitionSelector;
use sgiefs::fuse_fs::EfsFuse;
use sgiefs::mount::Mount;
use sgiefs::volume::VH_PART_NUM;

fn main() -> ExitCode {
	let prog_name = std::env::args().next().unwrap_or_else(|| "mount.sgiefs".to_string());
	let cli = Cli::parse();

	if cli.show_help {
		print!("{}", Cli::usage(&prog_name));
		return ExitCode::from(2);
	}

	let mut bad_args = false;
	if let Some(part) = cli.partition {
		if part as usize >= VH_PART_NUM {
			eprintln!("part_no must be 0-{}.", VH_PART_NUM - 1);
			bad_args = true;
		}
	}
	if cli.debug > 3 {
		eprintln!("debug must be between 0 and 3.");
		bad_args = true;
	}
	if cli.fs_image.is_none() {
		eprintln!("file system image is not specified.");
		bad_args = true;
	}
	if cli.mountpoint.is_none() {
		eprintln!("mountpoint is not specified.");
		bad_args = true;
	}

	if bad_args {
		print!("{}", Cli::usage(&prog_name));
		return ExitCode::from(2);
	}

	init_logging(cli.debug);

	let fs_image = cli.fs_image.unwrap();
	let mountpoint = cli.mountpoint.unwrap();
	let selector = match cli.partition {
		Some(p) => PartitionSelector::Index(p),
		None => PartitionSelector::Auto,
	};

	let mount = match Mount::open(&fs_image, selector) {
		Ok(mount) => mount,
		Err(e) => {
			error!("cannot open '{}': {e}", fs_image.display());
			return ExitCode::FAILURE;
		}
	};

	let options = vec![fuser::MountOption::RO, fuser::MountOption::FSName("sgiefs".to_string())];
	if let Err(e) = fuser::mount2(EfsFuse::new(mount), &mountpoint, &options) {
		error!("fuse mount failed: {e}");
		return ExitCode::FAILURE;
	}

	ExitCode::SUCCESS
}

/// 0 = error+warn, 1 = warn, 2 = debug, 3 = trace, per the original's
/// `log_lvl` levels re-expressed against `log`'s `LevelFilter`.
fn init_logging(debug: u8) {
	let level = match debug {
		0 => log::LevelFilter::Warn,
		1 => log::LevelFilter::Warn,
		2 => log::LevelFilter::Debug,
		_ => log::LevelFilter::Trace,
	};
	env_logger::Builder::new().filter_level(level).init();
}
