//! `multipart/form-data` decoding: classifying parts and spilling uploads.
//!
//! A [`MultiPart`] whose `Content-Disposition` is `form-data` with a
//! non-empty `name` becomes a [`FormDataItem`]. If it also carries a
//! `filename` parameter it is a file upload, and [`FormDataTransfer`] may
//! move its bytes to disk under a [`SavePolicy`], leaving only the generated
//! file name in memory.
//!
//! ```rust
//! use reqform::{DataFlag, FormDataTransfer, MultiPart, UploadSaveOptions};
//!
//! let parts = vec![
//!     MultiPart::new("hello").with_header("Content-Disposition", r#"form-data; name="greeting""#),
//!     MultiPart::new("--").with_header("Content-Disposition", "attachment"),
//! ];
//!
//! let policy = UploadSaveOptions::default();
//! let (items, rest) = FormDataTransfer::new(&policy).transfer(parts);
//!
//! assert_eq!(items[0].name, "greeting");
//! assert_eq!(items[0].data_flag, DataFlag::InMemory);
//! assert_eq!(rest.len(), 1);
//! ```

use std::borrow::Cow;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::multipart::MultiPart;
use crate::save::{extension_of, temporary_file_name, DiskWriter, FileWriter, SavePolicy};

// ── FormDataItem ──────────────────────────────────────────────────────────────

/// Where a [`FormDataItem`]'s `data` currently lives.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DataFlag {
    /// `data` holds the payload.
    #[default]
    InMemory,
    /// The payload was written to disk; `data` holds the generated file
    /// name (relative to the transfer directory).
    SpilledToTempFile,
}

/// One decoded form field or file upload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormDataItem {
    pub name: String,
    pub content_type: Option<String>,
    /// Client-supplied file name. Present exactly when this is a file
    /// upload, even if the client sent `filename=""`.
    pub filename: Option<String>,
    pub data: Bytes,
    pub data_flag: DataFlag,
}

impl FormDataItem {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    pub fn is_spilled(&self) -> bool {
        self.data_flag == DataFlag::SpilledToTempFile
    }

    /// Name of the file the payload was spilled to, if it was.
    pub fn temp_file_name(&self) -> Option<&str> {
        if self.is_spilled() {
            std::str::from_utf8(&self.data).ok()
        } else {
            None
        }
    }

    /// `data` as text, replacing invalid UTF-8. Borrows when valid.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Classifies a part as form data, consuming it on success.
///
/// Fails, handing the part back untouched, when `Content-Disposition` is
/// missing, its primary token is not `form-data` (any case), or `name` is
/// missing or empty.
impl TryFrom<MultiPart> for FormDataItem {
    type Error = MultiPart;

    fn try_from(part: MultiPart) -> Result<Self, Self::Error> {
        let disposition = part.sub_headers("Content-Disposition");
        if disposition.is_empty() || !disposition.value.eq_ignore_ascii_case("form-data") {
            return Err(part);
        }

        let name = disposition.headers.get("name");
        if name.is_empty() {
            return Err(part);
        }

        let name = name.to_owned();
        let filename = disposition.headers.try_get("filename").map(str::to_owned);
        let content_type = part.try_header("Content-Type").map(str::to_owned);
        let (_, data) = part.into_parts();

        Ok(Self { name, content_type, filename, data, data_flag: DataFlag::InMemory })
    }
}

impl MultiPart {
    /// Same as `FormDataItem::try_from(self)`.
    pub fn into_form_data_item(self) -> Result<FormDataItem, MultiPart> {
        FormDataItem::try_from(self)
    }
}

// ── FormDataTransfer ──────────────────────────────────────────────────────────

static DISK_WRITER: DiskWriter = DiskWriter;

/// Turns raw parts into form data items, spilling file uploads to disk.
///
/// A file item is spilled only when all of these hold:
///
/// 1. a [`directory`](Self::directory) is configured,
/// 2. the client filename is non-empty,
/// 3. the payload is non-empty, and
/// 4. the [`SavePolicy`] approves the file's extension and size.
///
/// A spilled item's `data` becomes a fresh `"<uuid><ext>"` name inside the
/// directory. If the write fails the item stays in memory, unchanged.
pub struct FormDataTransfer<'a> {
    policy: &'a dyn SavePolicy,
    directory: Option<&'a Path>,
    writer: &'a dyn FileWriter,
}

impl<'a> FormDataTransfer<'a> {
    /// A transfer that never touches the disk until a
    /// [`directory`](Self::directory) is set.
    pub fn new(policy: &'a dyn SavePolicy) -> Self {
        Self { policy, directory: None, writer: &DISK_WRITER }
    }

    /// Directory that spilled uploads are written into. An empty path
    /// disables spilling.
    pub fn directory(mut self, dir: &'a Path) -> Self {
        self.directory = (!dir.as_os_str().is_empty()).then_some(dir);
        self
    }

    /// Replaces the default [`DiskWriter`].
    pub fn writer(mut self, writer: &'a dyn FileWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Partitions `parts` into decoded items and the parts that are not
    /// form data. Both outputs keep the input order.
    pub fn transfer(&self, parts: Vec<MultiPart>) -> (Vec<FormDataItem>, Vec<MultiPart>) {
        let mut items = Vec::with_capacity(parts.len());
        let mut residual = Vec::new();

        for part in parts {
            match FormDataItem::try_from(part) {
                Ok(mut item) => {
                    self.spill(&mut item);
                    items.push(item);
                }
                Err(part) => {
                    debug!(
                        disposition = part.header("Content-Disposition"),
                        "part is not form data"
                    );
                    residual.push(part);
                }
            }
        }

        (items, residual)
    }

    fn spill(&self, item: &mut FormDataItem) {
        let Some(dir) = self.directory else { return };
        let ext = match item.filename.as_deref() {
            Some(filename) if !filename.is_empty() => extension_of(filename),
            _ => return,
        };
        if item.data.is_empty() {
            return;
        }

        let size_kib = item.data.len() / 1024;
        if !self.policy.should_persist(&ext, size_kib) {
            return;
        }

        let temp = temporary_file_name(&ext);
        match self.writer.write_file(&item.data, dir, &temp) {
            Ok(()) => {
                debug!(field = %item.name, file = %temp, size_kib, "upload spilled to disk");
                item.data = Bytes::from(temp);
                item.data_flag = DataFlag::SpilledToTempFile;
            }
            Err(e) => {
                warn!(
                    field = %item.name,
                    dir = %dir.display(),
                    "upload kept in memory, spill failed: {e}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::error::Error;
    use crate::save::{SaveStrategy, UploadSaveOptions};

    fn field(disposition: &str, data: &'static str) -> MultiPart {
        MultiPart::new(data).with_header("Content-Disposition", disposition)
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("reqform-formdata-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Records what it was asked to write and optionally fails.
    #[derive(Default)]
    struct RecordingWriter {
        fail: bool,
        writes: RefCell<Vec<String>>,
    }

    impl FileWriter for RecordingWriter {
        fn write_file(&self, _data: &[u8], _dir: &Path, filename: &str) -> Result<(), Error> {
            self.writes.borrow_mut().push(filename.to_owned());
            if self.fail {
                Err(std::io::Error::other("disk full").into())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn text_field_round_trip() {
        let item = field(r#"form-data; name="x""#, "hello").into_form_data_item().unwrap();
        assert_eq!(item.name, "x");
        assert_eq!(item.data, "hello");
        assert_eq!(item.data_flag, DataFlag::InMemory);
        assert!(item.filename.is_none());
        assert!(!item.is_file());
    }

    #[test]
    fn file_field_keeps_filename_and_content_type() {
        let part = field(r#"form-data; name="doc"; filename="a.pdf""#, "%PDF")
            .with_header("Content-Type", "application/pdf");
        let item = FormDataItem::try_from(part).unwrap();
        assert!(item.is_file());
        assert_eq!(item.filename.as_deref(), Some("a.pdf"));
        assert_eq!(item.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn empty_filename_still_marks_a_file() {
        let item = field(r#"form-data; name="f"; filename="""#, "").into_form_data_item().unwrap();
        assert!(item.is_file());
        assert_eq!(item.filename.as_deref(), Some(""));
    }

    #[test]
    fn disposition_token_is_case_insensitive() {
        assert!(field("Form-Data; name=a", "1").into_form_data_item().is_ok());
    }

    #[test]
    fn non_form_data_parts_are_handed_back_untouched() {
        let missing = MultiPart::new("raw").with_header("Content-Type", "text/plain");
        let back = missing.clone().into_form_data_item().unwrap_err();
        assert_eq!(back, missing);

        let attachment = field(r#"attachment; name="a""#, "x");
        assert_eq!(attachment.clone().into_form_data_item().unwrap_err(), attachment);

        let unnamed = field(r#"form-data; name="""#, "x");
        assert_eq!(unnamed.clone().into_form_data_item().unwrap_err(), unnamed);

        let nameless = field(r#"form-data; filename="a.txt""#, "x");
        assert!(nameless.into_form_data_item().is_err());
    }

    #[test]
    fn transfer_partitions_and_preserves_order() {
        let parts = vec![
            field("form-data; name=a", "1"),
            field("inline", "skip-1"),
            field("form-data; name=b", "2"),
            MultiPart::new("skip-2"),
            field("form-data; name=c", "3"),
        ];
        let never = UploadSaveOptions::new().strategy(SaveStrategy::NeverSave);
        let (items, rest) = FormDataTransfer::new(&never).transfer(parts);

        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        let rest: Vec<_> = rest.iter().map(|p| p.data().clone()).collect();
        assert_eq!(rest, ["skip-1", "skip-2"]);
    }

    #[test]
    fn approved_upload_is_spilled_with_generated_name() {
        let dir = scratch_dir();
        let policy = |ext: &str, _kib: usize| ext == ".jpg";
        let parts = vec![field(r#"form-data; name="photo"; filename="photo.jpg""#, "JPEGDATA")];

        let (items, rest) = FormDataTransfer::new(&policy).directory(&dir).transfer(parts);
        assert!(rest.is_empty());

        let item = &items[0];
        assert_eq!(item.data_flag, DataFlag::SpilledToTempFile);
        let name = item.temp_file_name().unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(fs::read(dir.join(name)).unwrap(), b"JPEGDATA");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn identical_uploads_get_distinct_names() {
        let writer = RecordingWriter::default();
        let policy = |_: &str, _: usize| true;
        let engine = FormDataTransfer::new(&policy)
            .directory(Path::new("/uploads"))
            .writer(&writer);

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let parts = vec![field(r#"form-data; name="p"; filename="photo.jpg""#, "same")];
            let (items, _) = engine.transfer(parts);
            assert!(seen.insert(items[0].temp_file_name().unwrap().to_owned()));
        }
        assert_eq!(writer.writes.borrow().len(), 10_000);
    }

    #[test]
    fn size_is_reported_in_whole_kibibytes() {
        let seen = RefCell::new(Vec::new());
        let policy = |ext: &str, kib: usize| {
            seen.borrow_mut().push((ext.to_owned(), kib));
            false
        };
        let part = MultiPart::new(Bytes::from(vec![0u8; 3 * 1024 + 1000]))
            .with_header("Content-Disposition", "form-data; name=f; filename=blob");

        let (items, _) = FormDataTransfer::new(&policy)
            .directory(Path::new("/uploads"))
            .transfer(vec![part]);
        assert_eq!(items[0].data_flag, DataFlag::InMemory);
        assert_eq!(seen.into_inner(), [(String::new(), 3)]);
    }

    #[test]
    fn bool_policy_spills_everything_or_nothing() {
        let writer = RecordingWriter::default();
        let upload = || vec![field(r#"form-data; name="f"; filename="a.png""#, "PNG")];

        let (kept, _) = FormDataTransfer::new(&false)
            .directory(Path::new("/uploads"))
            .writer(&writer)
            .transfer(upload());
        assert_eq!(kept[0].data_flag, DataFlag::InMemory);
        assert_eq!(kept[0].data, "PNG");
        assert!(writer.writes.borrow().is_empty());

        let (spilled, _) = FormDataTransfer::new(&true)
            .directory(Path::new("/uploads"))
            .writer(&writer)
            .transfer(upload());
        assert_eq!(spilled[0].data_flag, DataFlag::SpilledToTempFile);
        assert!(spilled[0].temp_file_name().is_some_and(|n| n.ends_with(".png")));
        assert_eq!(writer.writes.borrow().len(), 1);
    }

    #[test]
    fn failed_write_keeps_payload_in_memory() {
        let writer = RecordingWriter { fail: true, ..RecordingWriter::default() };
        let policy = |_: &str, _: usize| true;
        let parts = vec![field(r#"form-data; name="f"; filename="a.png""#, "PNG")];

        let (items, _) = FormDataTransfer::new(&policy)
            .directory(Path::new("/uploads"))
            .writer(&writer)
            .transfer(parts);

        assert_eq!(writer.writes.borrow().len(), 1);
        assert_eq!(items[0].data, "PNG");
        assert_eq!(items[0].data_flag, DataFlag::InMemory);
    }

    #[test]
    fn nothing_is_written_without_directory_payload_filename_or_approval() {
        let writer = RecordingWriter::default();
        let yes = |_: &str, _: usize| true;
        let no = |_: &str, _: usize| false;
        let upload = || field(r#"form-data; name="f"; filename="a.png""#, "PNG");

        FormDataTransfer::new(&yes).writer(&writer).transfer(vec![upload()]);
        FormDataTransfer::new(&yes)
            .directory(Path::new(""))
            .writer(&writer)
            .transfer(vec![upload()]);
        FormDataTransfer::new(&no)
            .directory(Path::new("/u"))
            .writer(&writer)
            .transfer(vec![upload()]);
        FormDataTransfer::new(&yes)
            .directory(Path::new("/u"))
            .writer(&writer)
            .transfer(vec![
                field(r#"form-data; name="f"; filename="a.png""#, ""),
                field(r#"form-data; name="f"; filename="""#, "data"),
                field(r#"form-data; name="text""#, "not a file"),
            ]);

        assert!(writer.writes.borrow().is_empty());
    }
}
