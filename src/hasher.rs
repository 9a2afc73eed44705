//! Streaming content hashing.
//!
//! Files are identified by their MD5 digest. MD5 is not used for anything
//! security-sensitive here; it is a stable, 128-bit content fingerprint that
//! stays compatible with reports produced by earlier versions of the tool.

use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size for the streaming hash loop (1 MiB).
const CHUNK_SIZE: usize = 1024 * 1024;

/// Computes the lowercase hex MD5 digest of a file.
///
/// The file is read in fixed-size chunks so that arbitrarily large files
/// never have to fit into memory.
///
/// # Arguments
///
/// * `path` - The file to hash
///
/// # Errors
///
/// Returns the underlying `io::Error` if the file cannot be opened or a
/// read fails mid-stream. The caller decides whether to skip the file or
/// abort; this function never retries.
///
/// # Examples
///
/// ```no_run
/// use chronotidy::hasher::hash_file;
/// use std::path::Path;
///
/// let digest = hash_file(Path::new("photo.jpg")).expect("unreadable file");
/// println!("md5: {}", digest);
/// ```
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    #[test]
    fn test_known_digest() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write_file(&temp_dir, "sample.txt", b"hello world");

        let digest = hash_file(&path).expect("Failed to hash file");
        assert_eq!(digest, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_empty_file_digest() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write_file(&temp_dir, "empty.bin", b"");

        let digest = hash_file(&path).expect("Failed to hash file");
        assert_eq!(digest, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_identical_content_identical_digest() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let a = write_file(&temp_dir, "a.dat", b"same bytes");
        let b = write_file(&temp_dir, "b.dat", b"same bytes");
        let c = write_file(&temp_dir, "c.dat", b"other bytes");

        let digest_a = hash_file(&a).expect("Failed to hash a");
        let digest_b = hash_file(&b).expect("Failed to hash b");
        let digest_c = hash_file(&c).expect("Failed to hash c");

        assert_eq!(digest_a, digest_b);
        assert_ne!(digest_a, digest_c);
    }

    #[test]
    fn test_content_larger_than_chunk() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let content: Vec<u8> = (0..3 * CHUNK_SIZE).map(|i| (i % 251) as u8).collect();
        let big = write_file(&temp_dir, "big.bin", &content);
        let same = write_file(&temp_dir, "same.bin", &content);

        let digest_big = hash_file(&big).expect("Failed to hash big file");
        let digest_same = hash_file(&same).expect("Failed to hash same file");

        assert_eq!(digest_big.len(), 32);
        assert_eq!(digest_big, digest_same);
    }

    /// Deterministic xorshift byte stream; `seed` must be non-zero.
    fn fill_pseudo_random(buffer: &mut [u8], mut state: u64) {
        for byte in buffer.iter_mut() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            *byte = state as u8;
        }
    }

    #[test]
    fn test_digest_tracks_content_across_random_buffers() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let lengths = [
            0usize,
            1,
            17,
            1024,
            CHUNK_SIZE - 1,
            CHUNK_SIZE,
            CHUNK_SIZE + 1,
            2 * CHUNK_SIZE + 13,
        ];

        for (i, &len) in lengths.iter().enumerate() {
            let mut content = vec![0u8; len];
            fill_pseudo_random(&mut content, 0x9E37_79B9_7F4A_7C15 ^ (i as u64 + 1));

            let a = write_file(&temp_dir, &format!("a{}.bin", i), &content);
            let b = write_file(&temp_dir, &format!("b{}.bin", i), &content);
            let digest_a = hash_file(&a).expect("Failed to hash a");
            let digest_b = hash_file(&b).expect("Failed to hash b");
            assert_eq!(digest_a, digest_b, "length {}", len);

            if len > 0 {
                let mut mutated = content.clone();
                mutated[len / 2] ^= 0x01;
                let c = write_file(&temp_dir, &format!("c{}.bin", i), &mutated);
                let digest_c = hash_file(&c).expect("Failed to hash c");
                assert_ne!(digest_a, digest_c, "length {}", len);
            }
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("does_not_exist.txt");

        assert!(hash_file(&missing).is_err());
    }
}
