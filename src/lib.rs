//! Read-only access to ext4 images through positioned reads.
//!
//! ```no_run
//! use std::io::Read;
//!
//! let image = std::fs::File::open("rootfs.img")?;
//! let fs = ext4probe::FileSystem::from_device(image)?;
//! let mut hosts = String::new();
//! fs.open("/etc/hosts")?.read_to_string(&mut hosts)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod codec;
pub mod constants;
mod descriptor;
mod device;
mod entry;
mod errors;
mod extent;
mod file;
mod fs;
mod inode;
mod metadata;
mod read_dir;
mod reader;
mod resolver;
mod superblock;
mod utils;

pub use descriptor::{BlockGroupDescriptor, BlockGroupNumber};
pub use device::BlockSource;
pub use entry::DirectoryEntry;
pub use errors::ExtfsError;
pub use extent::{Extent, ExtentHeader, Extents};
pub use file::File;
pub use fs::{FileSystem, FsOptions};
pub use inode::{FileType, INode, InodeNumber};
pub use metadata::Metadata;
pub use read_dir::ReadDir;
pub use reader::ByteReader;
pub use resolver::PathResolver;
pub use superblock::SuperBlock;
