use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use super::{
    constants::DOTDOT_DIR_NAME,
    device::BlockSource,
    errors::ExtfsError,
    inode::{INode, InodeNumber},
    superblock::SuperBlock,
};

/// Walks `/`-delimited paths from a root inode, one directory lookup per component.
pub struct PathResolver<'a, D: ?Sized> {
    sb: &'a SuperBlock,
    device: &'a D,
    root: InodeNumber,
    strict_extents: bool,
}

impl<'a, D: BlockSource + ?Sized> PathResolver<'a, D> {
    pub fn new(sb: &'a SuperBlock, device: &'a D, root: InodeNumber) -> Self {
        Self {
            sb,
            device,
            root,
            strict_extents: false,
        }
    }

    /// Refuse directories and files whose inode lacks the extents flag.
    pub fn with_strict_extents(mut self, strict: bool) -> Self {
        self.strict_extents = strict;
        self
    }

    pub fn root(&self) -> InodeNumber {
        self.root
    }

    /// Decode one inode, checking how its data is mapped.
    pub fn load(&self, ino: InodeNumber) -> Result<INode, ExtfsError> {
        let inode = ino.decode_inode(self.sb, self.device)?;
        if (inode.is_dir() || inode.is_regular()) && !inode.uses_extents() {
            if self.strict_extents {
                return Err(ExtfsError::NotExtentMapped(ino));
            }
            warn!("inode {} has no extents flag, decoding block map as extents", ino);
        }
        Ok(inode)
    }

    /// Resolve `path` to its inode number.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> Result<InodeNumber, ExtfsError> {
        self.resolve_inode(path).map(|(ino, _)| ino)
    }

    /// Resolve `path` and decode the inode it names.
    pub fn resolve_inode<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(InodeNumber, INode), ExtfsError> {
        let p = path.as_ref();
        if !p.has_root() {
            return Err(ExtfsError::RequireAbsolutePath(p.to_path_buf()));
        }

        let mut ino = self.root;
        let mut inode = self.load(ino)?;
        let mut walked = PathBuf::from("/");

        for component in p.components() {
            let name = match component {
                Component::RootDir | Component::CurDir => continue,
                Component::ParentDir => DOTDOT_DIR_NAME,
                Component::Normal(name) => name
                    .to_str()
                    .ok_or_else(|| ExtfsError::InvalidPath(p.to_path_buf()))?,
                Component::Prefix(_) => return Err(ExtfsError::InvalidPath(p.to_path_buf())),
            };

            let (child, child_inode) =
                self.step(&inode, &walked, name)
                    .map_err(|source| ExtfsError::Component {
                        path: walked.clone(),
                        component: name.to_string(),
                        source: Box::new(source),
                    })?;
            debug!("{} -> {} is inode {}", walked.display(), name, child);

            walked.push(name);
            ino = child;
            inode = child_inode;
        }

        Ok((ino, inode))
    }

    fn step(
        &self,
        parent: &INode,
        walked: &Path,
        name: &str,
    ) -> Result<(InodeNumber, INode), ExtfsError> {
        if !parent.is_dir() {
            return Err(ExtfsError::NotADirectory(walked.to_path_buf()));
        }
        let child = parent.resolve_child(name, self.sb, self.device)?;
        let child_inode = self.load(child)?;
        Ok((child, child_inode))
    }
}
