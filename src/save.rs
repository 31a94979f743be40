//! Upload save policy and the disk writer used to spill file uploads.
//!
//! Two collaborators decide what happens to an uploaded file's bytes:
//!
//! - a [`SavePolicy`] answers "should this file go to disk?" given its
//!   extension and size, and
//! - a [`FileWriter`] performs the write.
//!
//! [`UploadSaveOptions`] is the configurable policy; [`DiskWriter`] is the
//! default writer. Both are plain values, cheap to share across requests.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

use crate::error::Error;

// ── SavePolicy ────────────────────────────────────────────────────────────────

/// Decides whether an uploaded file is persisted to disk.
///
/// `ext` is the extension of the client-supplied filename including the
/// leading dot (`".png"`), or `""` when there is none. `size_kib` is the
/// payload size in whole kibibytes, rounded down.
///
/// Implemented for [`UploadSaveOptions`], for `bool` (a constant answer) and
/// for any `Fn(&str, usize) -> bool`:
///
/// ```rust
/// use reqform::SavePolicy;
///
/// let images_only = |ext: &str, _kib: usize| matches!(ext, ".png" | ".jpg");
/// assert!(images_only.should_persist(".png", 12));
/// ```
pub trait SavePolicy {
    fn should_persist(&self, ext: &str, size_kib: usize) -> bool;
}

impl<F> SavePolicy for F
where
    F: Fn(&str, usize) -> bool,
{
    fn should_persist(&self, ext: &str, size_kib: usize) -> bool {
        self(ext, size_kib)
    }
}

impl SavePolicy for bool {
    fn should_persist(&self, _ext: &str, _size_kib: usize) -> bool {
        *self
    }
}

/// What [`UploadSaveOptions`] bases its decision on.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SaveStrategy {
    AlwaysSave,
    NeverSave,
    /// Save files strictly larger than `size_base_kib`.
    #[default]
    SizeGreaterThan,
    /// Save files strictly smaller than `size_base_kib`.
    SizeLessThan,
    /// Save files whose extension is listed in `extensions`.
    ExtensionIs,
    /// Save files whose extension is not listed in `extensions`.
    ExtensionIsNot,
}

/// Configurable [`SavePolicy`].
///
/// The default saves files larger than 50 KiB and keeps smaller ones in
/// memory.
///
/// ```rust
/// use reqform::{SavePolicy, SaveStrategy, UploadSaveOptions};
///
/// let opts = UploadSaveOptions::new()
///     .strategy(SaveStrategy::ExtensionIs)
///     .extension("jpg")
///     .extension(".PNG");
///
/// assert!(opts.should_persist(".png", 0));
/// assert!(!opts.should_persist(".txt", 4096));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadSaveOptions {
    strategy: SaveStrategy,
    size_base_kib: usize,
    extensions: Vec<String>,
}

/// Size threshold used by the default options.
pub const DEFAULT_SIZE_BASE_KIB: usize = 50;

impl Default for UploadSaveOptions {
    fn default() -> Self {
        Self {
            strategy: SaveStrategy::default(),
            size_base_kib: DEFAULT_SIZE_BASE_KIB,
            extensions: Vec::new(),
        }
    }
}

impl UploadSaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: SaveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn size_base_kib(mut self, kib: usize) -> Self {
        self.size_base_kib = kib;
        self
    }

    /// Adds an extension for the `Extension*` strategies. A leading dot is
    /// optional and case does not matter.
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    pub fn get_strategy(&self) -> SaveStrategy { self.strategy }
    pub fn get_size_base_kib(&self) -> usize { self.size_base_kib }
    pub fn get_extensions(&self) -> &[String] { &self.extensions }

    fn lists_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl SavePolicy for UploadSaveOptions {
    fn should_persist(&self, ext: &str, size_kib: usize) -> bool {
        match self.strategy {
            SaveStrategy::AlwaysSave      => true,
            SaveStrategy::NeverSave       => false,
            SaveStrategy::SizeGreaterThan => size_kib > self.size_base_kib,
            SaveStrategy::SizeLessThan    => size_kib < self.size_base_kib,
            SaveStrategy::ExtensionIs     => self.lists_extension(ext),
            SaveStrategy::ExtensionIsNot  => !self.lists_extension(ext),
        }
    }
}

// ── FileWriter ────────────────────────────────────────────────────────────────

/// Writes a spilled upload into `dir/filename`.
///
/// On `Err`, nothing may exist under `dir/filename` that a caller could
/// mistake for the complete file.
pub trait FileWriter {
    fn write_file(&self, data: &[u8], dir: &Path, filename: &str) -> Result<(), Error>;
}

/// Writes through the local filesystem.
///
/// Data goes to a hidden staging file in the same directory first and is
/// renamed into place once fully written, so the final name only ever
/// refers to a complete file.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskWriter;

impl FileWriter for DiskWriter {
    fn write_file(&self, data: &[u8], dir: &Path, filename: &str) -> Result<(), Error> {
        let staging = dir.join(format!(".{filename}.part"));
        let target = dir.join(filename);

        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)
            .and_then(|mut file| {
                file.write_all(data)?;
                file.flush()
            })
            .and_then(|()| fs::rename(&staging, &target));

        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }
}

// ── Temporary names ───────────────────────────────────────────────────────────

/// Generates a unique file name for a spilled upload: a random (v4) UUID
/// followed by `ext`, e.g. `"0b9c…-4f1e.png"`.
pub fn temporary_file_name(ext: &str) -> String {
    format!("{}{ext}", Uuid::new_v4())
}

/// `".ext"` of a client filename, or `""` when it has none.
pub(crate) fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
