pub mod beio;
pub mod cli;
pub mod device;
pub mod dir;
pub mod error;
pub mod extent;
pub mod fuse_fs;
pub mod inode;
pub mod mount;
pub mod path;
pub mod reader;
pub mod superblock;
pub mod volume;
pub mod walk;
