// src/archive/tar.rs

//! Decoder for the ustar subset produced by the upstream repository
//!
//! Only the fields the repository actually emits are decoded: name, octal
//! size, typeflag, linkname, and the ustar prefix. A single all-zero
//! 512-byte block terminates the archive; anything after it is never
//! inspected.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

const BLOCK_SIZE: usize = 512;

const NAME_OFFSET: usize = 0;
const NAME_LEN: usize = 100;
const SIZE_OFFSET: usize = 124;
const SIZE_LEN: usize = 12;
const TYPEFLAG_OFFSET: usize = 156;
const LINKNAME_OFFSET: usize = 157;
const LINKNAME_LEN: usize = 100;
const PREFIX_OFFSET: usize = 345;
const PREFIX_LEN: usize = 155;

const TYPE_REGULAR: u8 = b'0';
const TYPE_HARDLINK: u8 = b'1';
const TYPE_SYMLINK: u8 = b'2';
const TYPE_DIRECTORY: u8 = b'5';

/// A regular file decoded from an archive in list mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Decoded ustar header fields
struct Header {
    name: String,
    size: u64,
    typeflag: u8,
    link_target: String,
}

/// Read a NUL-terminated text field
fn field_str(field: &[u8]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

/// Parse an octal ASCII size field, stopping at the first non-octal byte
fn parse_octal(field: &[u8]) -> u64 {
    field
        .iter()
        .copied()
        .take_while(|b| (b'0'..=b'7').contains(b))
        .fold(0, |acc, b| acc * 8 + u64::from(b - b'0'))
}

fn decode_header(block: &[u8]) -> Header {
    let name = field_str(&block[NAME_OFFSET..NAME_OFFSET + NAME_LEN]);
    let prefix = field_str(&block[PREFIX_OFFSET..PREFIX_OFFSET + PREFIX_LEN]);

    let name = if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    };

    Header {
        name,
        size: parse_octal(&block[SIZE_OFFSET..SIZE_OFFSET + SIZE_LEN]),
        typeflag: block[TYPEFLAG_OFFSET],
        link_target: field_str(&block[LINKNAME_OFFSET..LINKNAME_OFFSET + LINKNAME_LEN]),
    }
}

/// Data length rounded up to the next block boundary
fn padded_len(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64
}

fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Clear whatever occupies a link's destination path: a file, a symlink,
/// or an empty directory
fn remove_existing(path: &Path) {
    if fs::remove_file(path).is_err() {
        let _ = fs::remove_dir(path);
    }
}

/// Decode an archive into its regular-file entries.
///
/// Non-regular entry types are skipped, but their data still advances the
/// cursor so subsequent headers stay block-aligned.
pub fn list_entries(data: &[u8]) -> Result<Vec<TarEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    while pos + BLOCK_SIZE <= data.len() {
        let block = &data[pos..pos + BLOCK_SIZE];
        if is_zero_block(block) {
            break;
        }

        let header = decode_header(block);
        pos += BLOCK_SIZE;

        if header.typeflag == TYPE_REGULAR || header.typeflag == 0 {
            let available = (data.len() - pos) as u64;
            if header.size > available {
                return Err(Error::TruncatedArchive {
                    name: header.name,
                    declared: header.size,
                    available,
                });
            }
            entries.push(TarEntry {
                data: data[pos..pos + header.size as usize].to_vec(),
                name: header.name,
            });
        }

        pos += padded_len(header.size) as usize;
    }

    Ok(entries)
}

/// Extract an archive into a destination root.
///
/// Handles directories, regular files, symlinks (literal target, not
/// resolved against the root), and hardlinks (target resolved against the
/// root, which must already have been extracted). Existing entries at a
/// path are replaced. Entries with an empty name are skipped.
pub fn extract(data: &[u8], dest: &Path) -> Result<()> {
    let mut pos = 0usize;

    while pos + BLOCK_SIZE <= data.len() {
        let block = &data[pos..pos + BLOCK_SIZE];
        if is_zero_block(block) {
            break;
        }

        let header = decode_header(block);
        pos += BLOCK_SIZE;

        if header.name.is_empty() {
            pos += padded_len(header.size) as usize;
            continue;
        }

        let out_path = dest.join(&header.name);

        match header.typeflag {
            TYPE_DIRECTORY => {
                fs::create_dir_all(&out_path)?;
            }
            TYPE_REGULAR | 0 => {
                let available = (data.len() - pos) as u64;
                if header.size > available {
                    return Err(Error::TruncatedArchive {
                        name: header.name,
                        declared: header.size,
                        available,
                    });
                }
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out_path, &data[pos..pos + header.size as usize])?;
            }
            TYPE_SYMLINK => {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                remove_existing(&out_path);
                #[cfg(unix)]
                std::os::unix::fs::symlink(&header.link_target, &out_path)?;
                #[cfg(windows)]
                std::os::windows::fs::symlink_file(&header.link_target, &out_path)?;
            }
            TYPE_HARDLINK => {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                remove_existing(&out_path);
                fs::hard_link(dest.join(&header.link_target), &out_path)?;
            }
            _ => {}
        }

        pos += padded_len(header.size) as usize;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header_block(name: &str, size: u64, typeflag: u8) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[..name.len()].copy_from_slice(name.as_bytes());
        let octal = format!("{size:011o}\0");
        block[SIZE_OFFSET..SIZE_OFFSET + SIZE_LEN].copy_from_slice(octal.as_bytes());
        block[TYPEFLAG_OFFSET] = typeflag;
        block
    }

    fn with_prefix(mut block: [u8; BLOCK_SIZE], prefix: &str) -> [u8; BLOCK_SIZE] {
        block[PREFIX_OFFSET..PREFIX_OFFSET + prefix.len()].copy_from_slice(prefix.as_bytes());
        block
    }

    fn with_link(mut block: [u8; BLOCK_SIZE], target: &str) -> [u8; BLOCK_SIZE] {
        block[LINKNAME_OFFSET..LINKNAME_OFFSET + target.len()].copy_from_slice(target.as_bytes());
        block
    }

    fn push_entry(archive: &mut Vec<u8>, block: [u8; BLOCK_SIZE], data: &[u8]) {
        archive.extend_from_slice(&block);
        archive.extend_from_slice(data);
        let pad = padded_len(data.len() as u64) as usize - data.len();
        archive.extend(std::iter::repeat_n(0u8, pad));
    }

    fn terminate(archive: &mut Vec<u8>) {
        archive.extend_from_slice(&[0u8; BLOCK_SIZE]);
    }

    #[test]
    fn test_parse_octal_stops_at_non_digit() {
        assert_eq!(parse_octal(b"0000123\0rest"), 0o123);
        assert_eq!(parse_octal(b"777 "), 0o777);
        assert_eq!(parse_octal(b"12912"), 0o12);
        assert_eq!(parse_octal(b"\0"), 0);
    }

    #[test]
    fn test_list_single_file() {
        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("hello.txt", 5, b'0'), b"hello");
        terminate(&mut archive);

        let entries = list_entries(&archive).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "hello.txt");
        assert_eq!(entries[0].data, b"hello");
    }

    #[test]
    fn test_list_joins_prefix() {
        let mut archive = Vec::new();
        let block = with_prefix(header_block("desc", 3, b'0'), "git-2.52.0-2");
        push_entry(&mut archive, block, b"abc");
        terminate(&mut archive);

        let entries = list_entries(&archive).unwrap();
        assert_eq!(entries[0].name, "git-2.52.0-2/desc");
    }

    #[test]
    fn test_list_null_typeflag_is_regular() {
        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("plain", 2, 0), b"ok");
        terminate(&mut archive);

        let entries = list_entries(&archive).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, b"ok");
    }

    #[test]
    fn test_list_skips_other_types_but_stays_aligned() {
        // A skipped entry type with a data payload must still advance the
        // cursor, or the following header is misread.
        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("weird", 600, b'x'), &[0xAA; 600]);
        push_entry(&mut archive, header_block("after.txt", 4, b'0'), b"data");
        terminate(&mut archive);

        let entries = list_entries(&archive).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "after.txt");
        assert_eq!(entries[0].data, b"data");
    }

    #[test]
    fn test_single_zero_block_terminates_before_garbage() {
        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("a", 1, b'0'), b"a");
        terminate(&mut archive);
        // Garbage after the terminator must never be treated as a header.
        archive.extend_from_slice(&[0xFFu8; BLOCK_SIZE * 2]);

        let entries = list_entries(&archive).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_truncated_entry_is_an_error() {
        let mut archive = Vec::new();
        archive.extend_from_slice(&header_block("big", 600, b'0'));
        archive.extend_from_slice(&[1u8; BLOCK_SIZE]); // only 512 of 600 bytes

        let result = list_entries(&archive);
        assert!(matches!(
            result,
            Err(Error::TruncatedArchive { declared: 600, .. })
        ));
    }

    #[test]
    fn test_extract_directory_file_and_links() {
        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("usr/bin/", 0, b'5'), b"");
        push_entry(
            &mut archive,
            header_block("usr/bin/tool", 7, b'0'),
            b"binary\n",
        );
        push_entry(
            &mut archive,
            with_link(header_block("usr/bin/alias", 0, b'2'), "tool"),
            b"",
        );
        push_entry(
            &mut archive,
            with_link(header_block("usr/bin/copy", 0, b'1'), "usr/bin/tool"),
            b"",
        );
        terminate(&mut archive);

        let dest = tempdir().unwrap();
        extract(&archive, dest.path()).unwrap();

        assert!(dest.path().join("usr/bin").is_dir());
        assert_eq!(
            fs::read(dest.path().join("usr/bin/tool")).unwrap(),
            b"binary\n"
        );
        let link = fs::read_link(dest.path().join("usr/bin/alias")).unwrap();
        assert_eq!(link, Path::new("tool"));
        assert_eq!(
            fs::read(dest.path().join("usr/bin/copy")).unwrap(),
            b"binary\n"
        );
    }

    #[test]
    fn test_extract_creates_missing_parents() {
        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("a/b/c/file", 2, b'0'), b"hi");
        terminate(&mut archive);

        let dest = tempdir().unwrap();
        extract(&archive, dest.path()).unwrap();
        assert_eq!(fs::read(dest.path().join("a/b/c/file")).unwrap(), b"hi");
    }

    #[test]
    fn test_extract_replaces_existing_file() {
        let dest = tempdir().unwrap();
        fs::write(dest.path().join("file"), b"old contents").unwrap();

        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("file", 3, b'0'), b"new");
        terminate(&mut archive);

        extract(&archive, dest.path()).unwrap();
        assert_eq!(fs::read(dest.path().join("file")).unwrap(), b"new");
    }

    #[test]
    fn test_extract_links_replace_existing_directory() {
        let dest = tempdir().unwrap();
        fs::create_dir_all(dest.path().join("bin/alias")).unwrap();
        fs::create_dir_all(dest.path().join("bin/copy")).unwrap();

        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("bin/tool", 4, b'0'), b"tool");
        push_entry(
            &mut archive,
            with_link(header_block("bin/alias", 0, b'2'), "tool"),
            b"",
        );
        push_entry(
            &mut archive,
            with_link(header_block("bin/copy", 0, b'1'), "bin/tool"),
            b"",
        );
        terminate(&mut archive);

        extract(&archive, dest.path()).unwrap();

        let link = fs::read_link(dest.path().join("bin/alias")).unwrap();
        assert_eq!(link, Path::new("tool"));
        assert_eq!(fs::read(dest.path().join("bin/copy")).unwrap(), b"tool");
    }

    #[test]
    fn test_extract_skips_empty_name() {
        let mut archive = Vec::new();
        push_entry(&mut archive, header_block("", 512, b'0'), &[7u8; 512]);
        push_entry(&mut archive, header_block("real", 4, b'0'), b"real");
        terminate(&mut archive);

        let dest = tempdir().unwrap();
        extract(&archive, dest.path()).unwrap();
        assert_eq!(fs::read(dest.path().join("real")).unwrap(), b"real");
    }

    #[test]
    fn test_round_trip_regular_files() {
        let files: Vec<(&str, Vec<u8>)> = vec![
            ("one.bin", (0..=255u8).collect()),
            ("dir/two.txt", b"two".to_vec()),
            ("dir/sub/three", vec![0u8; 1000]),
        ];

        let mut archive = Vec::new();
        for (name, data) in &files {
            push_entry(&mut archive, header_block(name, data.len() as u64, b'0'), data);
        }
        terminate(&mut archive);

        let dest = tempdir().unwrap();
        extract(&archive, dest.path()).unwrap();

        for (name, data) in &files {
            assert_eq!(&fs::read(dest.path().join(name)).unwrap(), data);
        }

        // List mode sees the same bytes
        let entries = list_entries(&archive).unwrap();
        assert_eq!(entries.len(), files.len());
        for (entry, (name, data)) in entries.iter().zip(&files) {
            assert_eq!(&entry.name, name);
            assert_eq!(&entry.data, data);
        }
    }
}
