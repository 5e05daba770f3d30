//! Encoded output files and compression ratio.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::compute::{CodeTable, EncodedCorpus, Encoding};
use crate::schema::{Corpus, Vocabulary};

use super::DatasetError;

/// Whether encoded files are block-compressed before measuring.
///
/// Without the `lz4` feature the ratio is taken on the raw encoded text, so it
/// reflects dictionary substitution alone and is not comparable to ratios
/// measured after a general-purpose compressor.
pub const BLOCK_COMPRESSION: bool = cfg!(feature = "lz4");

/// Compress a block with LZ4 (size-prepended).
#[cfg(feature = "lz4")]
pub fn compress_block(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress a size-prepended LZ4 block.
#[cfg(feature = "lz4")]
pub fn decompress_block(data: &[u8]) -> io::Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Fallback when LZ4 is not available.
#[cfg(not(feature = "lz4"))]
pub fn compress_block(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

#[cfg(not(feature = "lz4"))]
pub fn decompress_block(data: &[u8]) -> io::Result<Vec<u8>> {
    Ok(data.to_vec())
}

/// File locations for one dataset at one CTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub encoded: PathBuf,
    pub code_table: PathBuf,
    pub compressed: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, ctl: usize, name: &str) -> Self {
        Self {
            encoded: dir.join(format!("encoded_{}_{}", ctl, name)),
            code_table: dir.join(format!("codeTable_{}_{}.txt", ctl, name)),
            compressed: dir.join(format!("zipencoded_{}_{}.lz4", ctl, name)),
        }
    }
}

/// What was written for one dataset at one CTL, with byte sizes.
#[derive(Debug, Clone)]
pub struct WrittenOutput {
    pub paths: OutputPaths,
    pub ctl: usize,
    pub encoded_bytes: u64,
    pub table_bytes: u64,
    /// Size of the compressed encoded file, when block compression is on.
    pub compressed_bytes: Option<u64>,
}

impl WrittenOutput {
    /// Bytes counted against the original: the (compressed) encoded file
    /// plus the code table. CTL 0 carries no table.
    pub fn payload_bytes(&self) -> u64 {
        let body = self.compressed_bytes.unwrap_or(self.encoded_bytes);
        let table = if self.ctl == 0 { 0 } else { self.table_bytes };
        body + table
    }

    /// Original size divided by payload size. One when nothing was written.
    pub fn compression_ratio(&self, original_bytes: u64) -> f64 {
        match self.payload_bytes() {
            0 => 1.0,
            payload => original_bytes as f64 / payload as f64,
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<u64, DatasetError> {
    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents)
        .and_then(|_| writer.flush())
        .map_err(|e| DatasetError::io(path, e))?;
    Ok(contents.len() as u64)
}

/// Write the encoded corpus, its code table and (with `lz4`) the compressed
/// encoded corpus into `dir`.
pub fn write_encoding(
    dir: &Path,
    ctl: usize,
    name: &str,
    encoding: &Encoding,
    vocabulary: &Vocabulary,
) -> Result<WrittenOutput, DatasetError> {
    fs::create_dir_all(dir).map_err(|e| DatasetError::io(dir, e))?;
    let paths = OutputPaths::new(dir, ctl, name);

    let encoded = encoding.corpus.to_text(vocabulary);
    let encoded_bytes = write_file(&paths.encoded, encoded.as_bytes())?;
    let table_bytes = write_file(
        &paths.code_table,
        encoding.table.to_text(vocabulary).as_bytes(),
    )?;

    let compressed_bytes = if BLOCK_COMPRESSION {
        Some(write_file(
            &paths.compressed,
            &compress_block(encoded.as_bytes()),
        )?)
    } else {
        None
    };

    Ok(WrittenOutput {
        paths,
        ctl,
        encoded_bytes,
        table_bytes,
        compressed_bytes,
    })
}

/// Read back an encoded corpus and its code table and expand every code.
pub fn read_encoding(paths: &OutputPaths, vocabulary: &Vocabulary) -> Result<Corpus, DatasetError> {
    let read = |path: &Path| fs::read_to_string(path).map_err(|e| DatasetError::io(path, e));
    let parse_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| DatasetError::CodeTable { path, source }
    };

    let table = CodeTable::parse(&read(&paths.code_table)?, vocabulary)
        .map_err(parse_error(&paths.code_table))?;
    let corpus = EncodedCorpus::parse(&read(&paths.encoded)?, vocabulary, &table)
        .map_err(parse_error(&paths.encoded))?;
    Ok(corpus.decode(&table))
}
