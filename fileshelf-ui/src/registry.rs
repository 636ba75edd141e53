use std::path::{Path, PathBuf};

use fileshelf_core::{FileRecord, FileServerClient, FileServerError};
use url::Url;

const DEFAULT_DOWNLOAD_NAME: &str = "file";

/// Interactive confirmation hook for destructive actions. The shell backs it
/// with a terminal prompt; tests inject canned answers.
pub trait ConfirmDelete {
    fn confirm(&self, file_name: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// View-model over the files owned by one authenticated user.
///
/// `files` is only a cache of the last successful fetch and is replaced
/// wholesale by `refresh`, which every mutating action schedules. All
/// failures land in a single error slot that the next successful operation
/// clears; `busy` mirrors the disabled state of the triggering control and is
/// cleared on success and failure alike.
pub struct FileRegistry {
    client: FileServerClient,
    user_id: String,
    files: Vec<FileRecord>,
    pending: Option<PendingUpload>,
    last_error: Option<String>,
    busy: bool,
}

impl FileRegistry {
    pub fn new(client: FileServerClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            files: Vec::new(),
            pending: None,
            last_error: None,
            busy: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn pending(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Replaces the cached list with the server's. An empty result is a
    /// valid state; on failure the previous cache stays displayed.
    pub async fn refresh(&mut self) {
        self.busy = true;
        match self.client.list_files(&self.user_id).await {
            Ok(files) => {
                self.files = files;
                self.last_error = None;
            }
            Err(err) => self.fail("Failed to fetch files", &err),
        }
        self.busy = false;
    }

    pub fn select(&mut self, file_name: impl Into<String>, contents: Vec<u8>) {
        self.pending = Some(PendingUpload {
            file_name: file_name.into(),
            contents,
        });
    }

    pub fn clear_selection(&mut self) {
        self.pending = None;
    }

    /// Submits the pending selection. Without one, nothing is sent. On
    /// success the selection is cleared and the list refetched; on failure
    /// both the selection and the cache survive.
    pub async fn upload(&mut self) {
        let Some(pending) = self.pending.clone() else {
            self.last_error = Some("Select a file first.".to_string());
            return;
        };
        self.busy = true;
        match self
            .client
            .upload(&self.user_id, &pending.file_name, pending.contents)
            .await
        {
            Ok(_) => {
                self.pending = None;
                self.refresh().await;
            }
            Err(err) => self.fail("Failed to upload the file", &err),
        }
        self.busy = false;
    }

    /// The scoped inline-view URL, for handing to a browser. No request is
    /// issued and no state changes.
    pub fn view_url(&self, file_id: &str) -> Result<Url, FileServerError> {
        self.client.view_url(file_id, &self.user_id)
    }

    /// Fetches the file contents and writes them under `target_dir`, using
    /// the display name or a generic fallback. Returns the written path.
    pub async fn download(
        &mut self,
        file_id: &str,
        display_name: Option<&str>,
        target_dir: &Path,
    ) -> Option<PathBuf> {
        self.busy = true;
        let outcome = self.fetch_and_save(file_id, display_name, target_dir).await;
        self.busy = false;
        match outcome {
            Ok(path) => {
                self.last_error = None;
                Some(path)
            }
            Err(message) => {
                self.last_error = Some(message);
                None
            }
        }
    }

    /// Deletes one file after interactive confirmation naming it. A declined
    /// confirmation issues no network call.
    pub async fn delete(&mut self, file_id: &str, display_name: &str, confirm: &dyn ConfirmDelete) {
        if !confirm.confirm(display_name) {
            return;
        }
        self.busy = true;
        match self.client.delete_file(file_id, &self.user_id).await {
            Ok(_) => self.refresh().await,
            Err(err) => self.fail("Failed to delete the file", &err),
        }
        self.busy = false;
    }

    async fn fetch_and_save(
        &self,
        file_id: &str,
        display_name: Option<&str>,
        target_dir: &Path,
    ) -> Result<PathBuf, String> {
        let contents = self
            .client
            .download(file_id, &self.user_id)
            .await
            .map_err(|err| describe("Failed to download the file", &err))?;
        let name = sanitized_file_name(display_name);
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|err| format!("Failed to create the download directory: {err}"))?;
        let path = target_dir.join(name);
        tokio::fs::write(&path, &contents)
            .await
            .map_err(|err| format!("Failed to save the download: {err}"))?;
        Ok(path)
    }

    fn fail(&mut self, action: &str, err: &FileServerError) {
        self.last_error = Some(describe(action, err));
    }
}

/// Server-supplied display names are reduced to their final path component
/// before touching the filesystem, so a name carrying separators or `..`
/// cannot land outside the download directory.
fn sanitized_file_name(display_name: Option<&str>) -> String {
    display_name
        .filter(|name| !name.trim().is_empty())
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string())
}

fn describe(action: &str, err: &FileServerError) -> String {
    if err.is_connection() {
        format!("{action}: the file server is unreachable")
    } else {
        format!("{action}: {err}")
    }
}
