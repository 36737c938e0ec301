use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::Error;

/// Read block size used while streaming file contents into the hasher.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Content fingerprint of the file at `path`, as a lowercase hex BLAKE3 digest.
///
/// The file is streamed in fixed-size blocks, so memory use does not depend
/// on file size. A file that vanishes or becomes unreadable mid-read yields
/// `Error::Hash`; retrying or skipping is up to the caller.
pub fn get_file_hash(path: &Path) -> Result<String, Error> {
    let map_err = |source| Error::Hash {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(map_err)?;
    hash_reader(file).map_err(map_err)
}

pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
