//! Multipart form decoding.
//!
//! Parsing `multipart/form-data` is delegated to [`multer`]. This module
//! collects the body, hands it to the parser, and sorts the parts into text
//! fields and uploaded files. File parts are spooled to temporary files whose
//! lifetime is tied to the [`ParsedForm`] that describes them.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use multer::{Field, Multipart};
use serde::Serialize;
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::request::{Body, BoxError};

/// Default cap on the size of a form body: 10 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Everything decoded from one multipart body.
///
/// Names map to lists because a form may repeat a field name; values keep
/// their arrival order.
#[derive(Debug, Default, Serialize)]
pub struct ParsedForm {
    pub fields: BTreeMap<String, Vec<String>>,
    pub files: BTreeMap<String, Vec<UploadedFile>>,
}

impl ParsedForm {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// First value submitted under `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.first().map(String::as_str)
    }

    /// First file uploaded under `name`.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)?.first()
    }
}

/// Metadata for one uploaded file part.
///
/// The bytes live in a temporary file at [`path`](Self::path). The file is
/// removed when this value is dropped unless uploads are configured to be
/// kept.
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    #[serde(skip)]
    pub(crate) temp: Option<TempPath>,
}

impl UploadedFile {
    /// Whether the backing file is removed on drop.
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}

/// Why a body could not be decoded as a form.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected multipart/form-data with a boundary, got {}", .0.as_deref().unwrap_or("no content type"))]
    ContentType(Option<String>),

    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(BoxError),

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Knobs for [`decode`].
#[derive(Clone, Debug)]
pub struct FormOptions {
    pub max_body_bytes: usize,
    /// Where uploads are spooled. `None` means the system temp directory.
    pub upload_dir: Option<PathBuf>,
    /// Leave uploaded files on disk after the form is dropped.
    pub keep_uploads: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            upload_dir: None,
            keep_uploads: false,
        }
    }
}

/// Reads `body` to the end and decodes it as `multipart/form-data`.
///
/// An empty body is an empty form whatever the content type says. Anything
/// else needs a multipart content type carrying a boundary.
pub async fn decode(
    content_type: Option<&str>,
    mut body: Body,
    options: &FormOptions,
) -> Result<ParsedForm, DecodeError> {
    let limit = options.max_body_bytes;
    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(DecodeError::Body)?;
        if let Ok(data) = frame.into_data() {
            if buf.len() + data.len() > limit {
                return Err(DecodeError::TooLarge { limit });
            }
            buf.extend_from_slice(&data);
        }
    }
    let bytes = buf.freeze();

    if bytes.is_empty() {
        return Ok(ParsedForm::default());
    }

    let boundary = content_type
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| DecodeError::ContentType(content_type.map(str::to_owned)))?;

    let stream = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(bytes) });
    let mut multipart = Multipart::new(stream, boundary);
    let mut form = ParsedForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            debug!(index = field.index(), "skipping multipart part without a name");
            continue;
        };

        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let file = store_upload(name.clone(), file_name, field, options).await?;
                form.files.entry(name).or_default().push(file);
            }
            None => {
                let value = field.text().await?;
                form.fields.entry(name).or_default().push(value);
            }
        }
    }

    Ok(form)
}

async fn store_upload(
    field_name: String,
    original_filename: String,
    mut field: Field<'_>,
    options: &FormOptions,
) -> Result<UploadedFile, DecodeError> {
    let content_type = field.content_type().map(ToString::to_string);
    let headers = field.headers().iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();

    let dir = options.upload_dir.clone().unwrap_or_else(std::env::temp_dir);
    let suffix = upload_suffix(&original_filename);
    let temp = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix("formecho-")
            .suffix(&suffix)
            .tempfile_in(&dir)
    })
    .await
    .map_err(std::io::Error::from)??;
    let (file, temp_path) = temp.into_parts();

    let mut file = tokio::fs::File::from_std(file);
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    let path = temp_path.to_path_buf();
    let temp = if options.keep_uploads {
        temp_path.keep().map_err(|e| e.error)?;
        None
    } else {
        Some(temp_path)
    };

    debug!(field = %field_name, file = %original_filename, size, path = %path.display(), "stored upload");

    Ok(UploadedFile {
        field_name,
        original_filename,
        path,
        size,
        content_type,
        headers,
        temp,
    })
}

/// Keeps the extension of the client's file name so spooled files stay
/// recognisable. Only alphanumeric extensions are carried over.
fn upload_suffix(original: &str) -> String {
    Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 16 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use http_body_util::{Full, StreamBody};
    use hyper::body::Frame;

    use super::*;

    const BOUNDARY: &str = "XyZzY";

    fn body(raw: &str) -> Body {
        Full::new(Bytes::from(raw.replace('\n', "\r\n")))
            .map_err(|e| -> BoxError { match e {} })
            .boxed_unsync()
    }

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    fn options(dir: &Path) -> FormOptions {
        FormOptions { upload_dir: Some(dir.to_path_buf()), ..FormOptions::default() }
    }

    const TWO_FIELDS: &str = "--XyZzY
Content-Disposition: form-data; name=\"a\"

1
--XyZzY
Content-Disposition: form-data; name=\"b\"

2
--XyZzY--
";

    #[tokio::test]
    async fn decodes_text_fields() {
        let dir = tempfile::tempdir().unwrap();
        let form = decode(Some(&content_type()), body(TWO_FIELDS), &options(dir.path())).await.unwrap();

        assert_eq!(form.field("a"), Some("1"));
        assert_eq!(form.field("b"), Some("2"));
        assert!(form.files.is_empty());
    }

    #[tokio::test]
    async fn repeated_names_keep_every_value_in_order() {
        let raw = "--XyZzY
Content-Disposition: form-data; name=\"tag\"

red
--XyZzY
Content-Disposition: form-data; name=\"tag\"

blue
--XyZzY--
";
        let form = decode(Some(&content_type()), body(raw), &FormOptions::default()).await.unwrap();
        assert_eq!(form.fields["tag"], vec!["red", "blue"]);
    }

    #[tokio::test]
    async fn file_parts_are_spooled_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let raw = "--XyZzY
Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"
Content-Type: image/png

PNGDATA
--XyZzY--
";
        let form = decode(Some(&content_type()), body(raw), &options(dir.path())).await.unwrap();
        let file = form.file("avatar").unwrap();

        assert_eq!(file.field_name, "avatar");
        assert_eq!(file.original_filename, "me.png");
        assert_eq!(file.size, 7);
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert!(file.path.starts_with(dir.path()));
        assert_eq!(file.path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&file.path).unwrap(), b"PNGDATA");
        assert!(form.fields.is_empty());

        let path = file.path.clone();
        drop(form);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn keep_uploads_leaves_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let raw = "--XyZzY
Content-Disposition: form-data; name=\"doc\"; filename=\"notes.txt\"

hello
--XyZzY--
";
        let opts = FormOptions { keep_uploads: true, ..options(dir.path()) };
        let form = decode(Some(&content_type()), body(raw), &opts).await.unwrap();
        let path = form.file("doc").unwrap().path.clone();
        assert!(!form.file("doc").unwrap().is_temporary());

        drop(form);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn empty_body_is_an_empty_form() {
        let form = decode(None, body(""), &FormOptions::default()).await.unwrap();
        assert!(form.is_empty());
    }

    #[tokio::test]
    async fn missing_boundary_is_a_content_type_error() {
        let err = decode(Some("multipart/form-data"), body(TWO_FIELDS), &FormOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::ContentType(Some(_))));

        let err = decode(None, body(TWO_FIELDS), &FormOptions::default()).await.unwrap_err();
        assert!(matches!(err, DecodeError::ContentType(None)));
        assert!(err.to_string().contains("no content type"));
    }

    #[tokio::test]
    async fn urlencoded_bodies_are_rejected() {
        let err = decode(Some("application/x-www-form-urlencoded"), body("a=1&b=2"), &FormOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::ContentType(_)));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let opts = FormOptions { max_body_bytes: 8, ..FormOptions::default() };
        let err = decode(Some(&content_type()), body(TWO_FIELDS), &opts).await.unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { limit: 8 }));
    }

    #[tokio::test]
    async fn body_at_the_limit_is_accepted() {
        let raw = TWO_FIELDS.replace('\n', "\r\n");
        let opts = FormOptions { max_body_bytes: raw.len(), ..FormOptions::default() };
        let form = decode(Some(&content_type()), body(TWO_FIELDS), &opts).await.unwrap();
        assert_eq!(form.field("b"), Some("2"));
    }

    #[tokio::test]
    async fn failing_body_stream_is_a_body_error() {
        let frames: Vec<Result<Frame<Bytes>, BoxError>> = vec![
            Ok(Frame::data(Bytes::from_static(b"--XyZzY\r\n"))),
            Err("connection reset".into()),
        ];
        let body = StreamBody::new(futures_util::stream::iter(frames)).boxed_unsync();

        let err = decode(Some(&content_type()), body, &FormOptions::default()).await.unwrap_err();
        assert!(matches!(err, DecodeError::Body(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn unwritable_upload_dir_is_an_io_error() {
        let raw = "--XyZzY
Content-Disposition: form-data; name=\"doc\"; filename=\"notes.txt\"

hello
--XyZzY--
";
        let opts = options(Path::new("/definitely/not/a/dir"));
        let err = decode(Some(&content_type()), body(raw), &opts).await.unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[tokio::test]
    async fn truncated_body_is_a_multipart_error() {
        let raw = "--XyZzY
Content-Disposition: form-data; name=\"a\"

1";
        let err = decode(Some(&content_type()), body(raw), &FormOptions::default()).await.unwrap_err();
        assert!(matches!(err, DecodeError::Multipart(_)));
    }

    #[test]
    fn suffix_only_keeps_plain_extensions() {
        assert_eq!(upload_suffix("photo.JPG"), ".JPG");
        assert_eq!(upload_suffix("archive.tar.gz"), ".gz");
        assert_eq!(upload_suffix("README"), "");
        assert_eq!(upload_suffix("evil.s/h"), "");
    }
}
