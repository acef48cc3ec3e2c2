use crate::config::DocumentConfig;
use crate::types::{DocumentInfo, DocumentListResponse, DocumentType};
use crate::{JobScoutError, Result};
use bytes::Bytes;
use chrono::{DateTime, Local, Utc};
use futures::{pin_mut, Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as tfs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Content types accepted for resumes and cover letters.
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

pub const INVALID_FILE_TYPE: &str = "Invalid file type. Allowed types: PDF, DOC, DOCX, TXT";

/// The `DocumentService` struct stores uploaded documents in a directory.
#[derive(Debug, Clone)]
pub struct DocumentService {
    upload_dir: PathBuf,
    chunk_size: usize,
    max_file_size: u64,
}

impl DocumentService {
    /// Creates a new `DocumentService`, creating the upload directory if needed.
    pub async fn new(config: &DocumentConfig) -> Result<Self> {
        tfs::create_dir_all(&config.upload_dir).await?;
        debug!("Storing documents in {}", config.upload_dir.display());

        Ok(Self {
            upload_dir: config.upload_dir.clone(),
            chunk_size: config.chunk_size.max(1),
            max_file_size: config.max_file_size,
        })
    }

    pub fn is_allowed_content_type(content_type: &str) -> bool {
        ALLOWED_CONTENT_TYPES.contains(&content_type)
    }

    /// Streams an upload into the upload directory.
    ///
    /// The stored name is `{type}_{timestamp}_{id}{ext}`. Uploads that are too large, or whose
    /// bytes are not a PDF, Word document or text, are removed again and rejected.
    ///
    /// # Arguments
    ///
    /// * `stream` - The body of the uploaded file.
    /// * `original_filename` - The name the client gave the file; only its extension is kept.
    /// * `content_type` - The content type declared by the client.
    /// * `document_type` - Whether the file is a resume or a cover letter.
    pub async fn save_document<S>(
        &self,
        stream: S,
        original_filename: &str,
        content_type: &str,
        document_type: DocumentType,
    ) -> Result<DocumentInfo>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        if !Self::is_allowed_content_type(content_type) {
            return Err(JobScoutError::InvalidDocument(INVALID_FILE_TYPE.to_string()));
        }

        let extension = Path::new(original_filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let id = Uuid::new_v4().simple().to_string();
        let filename = format!(
            "{}_{}_{}{}",
            document_type,
            Local::now().format("%Y%m%d_%H%M%S"),
            &id[..8],
            extension
        );
        let file_path = self.upload_dir.join(&filename);

        let size = match self.store(stream, &file_path).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(err) = tfs::remove_file(&file_path).await {
                    if err.kind() != io::ErrorKind::NotFound {
                        warn!("Could not remove {}: {}", file_path.display(), err);
                    }
                }
                return Err(e);
            }
        };
        info!("Stored {} ({} bytes) as {}", original_filename, size, filename);

        Ok(DocumentInfo {
            filename,
            original_filename: original_filename.to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
            document_type,
            size,
            content_type: content_type.to_string(),
            last_modified: Some(Utc::now()),
        })
    }

    /// Writes the stream to `path` and checks what was written.
    async fn store<S>(&self, stream: S, path: &Path) -> Result<u64>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        pin_mut!(stream);
        let mut file = BufWriter::with_capacity(self.chunk_size, tfs::File::create(path).await?);
        let mut size = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if size + chunk.len() as u64 > self.max_file_size {
                return Err(JobScoutError::InvalidDocument(format!(
                    "File size exceeds maximum limit of {} bytes",
                    self.max_file_size
                )));
            }
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;

        if size == 0 {
            return Err(JobScoutError::InvalidDocument("Empty file".to_string()));
        }
        if sniff_content_type(path).await?.is_none() {
            return Err(JobScoutError::InvalidDocument(INVALID_FILE_TYPE.to_string()));
        }
        Ok(size)
    }

    /// Looks up a stored document; `None` when there is no such file.
    pub async fn get_document(&self, filename: &str) -> Result<Option<DocumentInfo>> {
        validate_filename(filename)?;
        let file_path = self.upload_dir.join(filename);

        let metadata = match tfs::metadata(&file_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document_type = DocumentType::from_filename(filename).unwrap_or(DocumentType::Resume);
        Ok(Some(stored_info(filename, &file_path, document_type, &metadata)))
    }

    /// Removes a stored document. Returns whether a file was removed.
    pub async fn delete_document(&self, filename: &str) -> Result<bool> {
        validate_filename(filename)?;
        let file_path = self.upload_dir.join(filename);

        match tfs::remove_file(&file_path).await {
            Ok(()) => {
                info!("Deleted {}", filename);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the stored documents, optionally only those of one type.
    ///
    /// Files whose name does not start with a document type are skipped.
    pub async fn list_documents(&self, document_type: Option<DocumentType>) -> Result<DocumentListResponse> {
        let mut documents = Vec::new();
        let mut entries = tfs::read_dir(&self.upload_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            let Some(file_type) = DocumentType::from_filename(&filename) else {
                continue;
            };
            if document_type.is_some_and(|wanted| wanted != file_type) {
                continue;
            }

            documents.push(stored_info(&filename, &entry.path(), file_type, &metadata));
        }
        documents.sort_by(|a, b| a.filename.cmp(&b.filename));

        Ok(DocumentListResponse {
            total_count: documents.len(),
            documents,
            document_type,
        })
    }
}

fn stored_info(filename: &str, path: &Path, document_type: DocumentType, metadata: &std::fs::Metadata) -> DocumentInfo {
    DocumentInfo {
        filename: filename.to_string(),
        original_filename: filename.to_string(),
        file_path: path.to_string_lossy().into_owned(),
        document_type,
        size: metadata.len(),
        content_type: "application/octet-stream".to_string(),
        last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
    }
}

/// Rejects names that would reach outside the upload directory.
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty() || filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(JobScoutError::InvalidRequest(format!("Invalid filename '{}'", filename)));
    }
    Ok(())
}

/// Detects the type of a stored file from its contents.
///
/// The whole file is read: Word 97-2003 documents are only recognised once their compound file
/// structure can be opened. Returns the content type when it is one of the accepted ones; text is
/// any valid UTF-8.
pub async fn sniff_content_type(path: &Path) -> Result<Option<&'static str>> {
    let content = tfs::read(path).await?;

    if let Some(kind) = infer::get(&content) {
        let mime = kind.mime_type();
        debug!("{} detected as {}", path.display(), mime);
        return Ok(ALLOWED_CONTENT_TYPES.into_iter().find(|allowed| *allowed == mime));
    }

    Ok(std::str::from_utf8(&content).is_ok().then_some("text/plain"))
}
