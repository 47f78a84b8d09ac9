#![allow(dead_code)]

//! Builds small ext4 images in memory: 4 KiB blocks, two block groups of
//! 16 inodes each, inode tables at blocks 2 and 3.

pub const BLOCK_SIZE: usize = 4096;
pub const INODES_PER_GROUP: u32 = 16;
pub const INODE_SIZE: usize = 256;
pub const GROUPS: u32 = 2;

pub const S_IFDIR: u16 = 0o040000;
pub const S_IFREG: u16 = 0o100000;
pub const EXTENTS_FL: u32 = 0x8_0000;

pub const FT_REG: u8 = 1;
pub const FT_DIR: u8 = 2;

const FIRST_FREE_BLOCK: u64 = 2 + GROUPS as u64;

/// Encode an extent node for the inode block map.
pub fn extent_node(depth: u16, extents: &[(u32, u16, u64)]) -> Vec<u8> {
    let mut raw = vec![0u8; 60];
    raw[0..2].copy_from_slice(&0xF30Au16.to_le_bytes());
    raw[2..4].copy_from_slice(&(extents.len() as u16).to_le_bytes());
    raw[4..6].copy_from_slice(&4u16.to_le_bytes());
    raw[6..8].copy_from_slice(&depth.to_le_bytes());
    for (i, &(logical, len, start)) in extents.iter().enumerate() {
        let at = 12 * (i + 1);
        raw[at..at + 4].copy_from_slice(&logical.to_le_bytes());
        raw[at + 4..at + 6].copy_from_slice(&len.to_le_bytes());
        raw[at + 6..at + 8].copy_from_slice(&((start >> 32) as u16).to_le_bytes());
        raw[at + 8..at + 12].copy_from_slice(&(start as u32).to_le_bytes());
    }
    raw
}

/// Lay out one directory block; the last record absorbs the slack.
pub fn dir_block(entries: &[(u32, &str, u8)]) -> Vec<u8> {
    let mut block = Vec::with_capacity(BLOCK_SIZE);
    let mut last = 0;
    for &(inode, name, file_type) in entries {
        last = block.len();
        let rec_len = (8 + name.len()).div_ceil(4) * 4;
        block.extend_from_slice(&inode.to_le_bytes());
        block.extend_from_slice(&(rec_len as u16).to_le_bytes());
        block.push(name.len() as u8);
        block.push(file_type);
        block.extend_from_slice(name.as_bytes());
        block.resize(last + rec_len, 0);
    }
    let tail = (BLOCK_SIZE - last) as u16;
    block[last + 4..last + 6].copy_from_slice(&tail.to_le_bytes());
    block.resize(BLOCK_SIZE, 0);
    block
}

pub struct ImageBuilder {
    image: Vec<u8>,
    next_block: u64,
}

impl ImageBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            image: vec![0u8; FIRST_FREE_BLOCK as usize * BLOCK_SIZE],
            next_block: FIRST_FREE_BLOCK,
        };
        builder.write_super_block();
        for group in 0..GROUPS {
            let at = BLOCK_SIZE + group as usize * 64;
            let inode_table = 2 + group;
            builder.image[at + 0x08..at + 0x0C].copy_from_slice(&inode_table.to_le_bytes());
        }
        builder
    }

    fn write_super_block(&mut self) {
        let sb = &mut self.image[1024..2048];
        let mut put = |at: usize, bytes: &[u8]| sb[at..at + bytes.len()].copy_from_slice(bytes);
        put(0x00, &(INODES_PER_GROUP * GROUPS).to_le_bytes());
        put(0x04, &64u32.to_le_bytes());
        put(0x18, &2u32.to_le_bytes());
        put(0x20, &32u32.to_le_bytes());
        put(0x28, &INODES_PER_GROUP.to_le_bytes());
        put(0x38, &0xEF53u16.to_le_bytes());
        put(0x4C, &1u32.to_le_bytes());
        put(0x58, &(INODE_SIZE as u16).to_le_bytes());
        put(0x60, &(0x2u32 | 0x40 | 0x80).to_le_bytes());
        put(0x78, b"probe");
        put(0xFE, &64u16.to_le_bytes());
    }

    /// Reserve `count` contiguous data blocks.
    pub fn alloc(&mut self, count: u64) -> u64 {
        let start = self.next_block;
        self.next_block += count;
        self.image.resize(self.next_block as usize * BLOCK_SIZE, 0);
        start
    }

    pub fn write_block(&mut self, block: u64, data: &[u8]) {
        let at = block as usize * BLOCK_SIZE;
        self.image[at..at + data.len()].copy_from_slice(data);
    }

    pub fn write_inode(&mut self, ino: u32, mode: u16, size: u64, flags: u32, block_map: &[u8]) {
        let group = (ino - 1) / INODES_PER_GROUP;
        let index = (ino - 1) % INODES_PER_GROUP;
        let at = (2 + group as usize) * BLOCK_SIZE + index as usize * INODE_SIZE;
        let raw = &mut self.image[at..at + INODE_SIZE];
        raw[0x00..0x02].copy_from_slice(&mode.to_le_bytes());
        raw[0x02..0x04].copy_from_slice(&0u16.to_le_bytes());
        raw[0x04..0x08].copy_from_slice(&(size as u32).to_le_bytes());
        raw[0x10..0x14].copy_from_slice(&1_700_000_000u32.to_le_bytes());
        raw[0x1A..0x1C].copy_from_slice(&1u16.to_le_bytes());
        raw[0x20..0x24].copy_from_slice(&flags.to_le_bytes());
        raw[0x28..0x28 + block_map.len()].copy_from_slice(block_map);
        raw[0x6C..0x70].copy_from_slice(&((size >> 32) as u32).to_le_bytes());
    }

    /// Directory `ino` with `.`, `..` and `children`, in one block.
    pub fn add_dir(&mut self, ino: u32, parent: u32, children: &[(u32, &str, u8)]) {
        let mut entries = vec![(ino, ".", FT_DIR), (parent, "..", FT_DIR)];
        entries.extend_from_slice(children);
        let block = self.alloc(1);
        self.write_block(block, &dir_block(&entries));
        self.write_inode(
            ino,
            S_IFDIR | 0o755,
            BLOCK_SIZE as u64,
            EXTENTS_FL,
            &extent_node(0, &[(0, 1, block)]),
        );
    }

    /// Regular file `ino` stored in one contiguous run.
    pub fn add_file(&mut self, ino: u32, data: &[u8]) -> u64 {
        let blocks = data.len().div_ceil(BLOCK_SIZE).max(1) as u64;
        let start = self.alloc(blocks);
        self.write_block(start, data);
        self.write_inode(
            ino,
            S_IFREG | 0o644,
            data.len() as u64,
            EXTENTS_FL,
            &extent_node(0, &[(0, blocks as u16, start)]),
        );
        start
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}

pub const HOSTS: &[u8] = b"127.0.0.1 localhost\n";
pub const MOTD: &[u8] = b"welcome to group one\n";
pub const SYSLOG_TAIL: &[u8] = b"tail line\n";

/// ```text
/// /                2
/// |-- etc          12
/// |   `-- hosts    14
/// |-- var          13
/// |   `-- log      15
/// |       `-- syslog  16  (block, hole, block)
/// |-- srv          17  (block group 1)
/// |   `-- motd     18
/// `-- legacy       20  (no extents flag)
/// ```
pub fn sample_image() -> Vec<u8> {
    let mut b = ImageBuilder::new();
    b.add_dir(
        2,
        2,
        &[
            (12, "etc", FT_DIR),
            (13, "var", FT_DIR),
            (17, "srv", FT_DIR),
            (20, "legacy", FT_REG),
        ],
    );
    b.add_dir(12, 2, &[(14, "hosts", FT_REG)]);
    b.add_file(14, HOSTS);
    b.add_dir(13, 2, &[(15, "log", FT_DIR)]);
    b.add_dir(15, 13, &[(16, "syslog", FT_REG)]);

    let head = b.alloc(1);
    b.write_block(head, &[b'a'; BLOCK_SIZE]);
    let tail = b.alloc(1);
    b.write_block(tail, SYSLOG_TAIL);
    b.write_inode(
        16,
        S_IFREG | 0o640,
        2 * BLOCK_SIZE as u64 + SYSLOG_TAIL.len() as u64,
        EXTENTS_FL,
        &extent_node(0, &[(0, 1, head), (2, 1, tail)]),
    );

    b.add_dir(17, 2, &[(18, "motd", FT_REG)]);
    b.add_file(18, MOTD);

    let legacy = b.alloc(1);
    b.write_block(legacy, b"old");
    b.write_inode(20, S_IFREG | 0o644, 3, 0, &extent_node(0, &[(0, 1, legacy)]));

    b.build()
}
