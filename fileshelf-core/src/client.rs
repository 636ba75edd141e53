use reqwest::{Client, StatusCode, header, multipart};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_FILE_LABEL: &str = "file";

#[derive(Debug, Error)]
pub enum FileServerError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments")]
    InvalidBaseUrl,
    #[error("server returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("authentication response carried no user id")]
    MissingUserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Unauthorized,
    NotFound,
    Conflict,
    Transient,
    Permanent,
}

#[derive(Clone)]
pub struct FileServerClient {
    http: Client,
    base_url: Url,
}

impl FileServerClient {
    pub fn new() -> Result<Self, FileServerError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FileServerError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(FileServerError::InvalidBaseUrl);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Registers a new account and returns the assigned user id.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, FileServerError> {
        let url = self.endpoint(&["users"])?;
        let response = self
            .http
            .post(url)
            .json(&RegisterRequest {
                name,
                email,
                password,
            })
            .send()
            .await?;
        let created: CreatedUser = Self::handle_response(response).await?;
        Ok(created.id)
    }

    /// Authenticates an existing account and returns its user id.
    ///
    /// The server has shipped two response spellings for the identity,
    /// `{"userId": ...}` and the legacy `{"user": {"id": ...}}`; both are
    /// accepted, the former being canonical.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<String, FileServerError> {
        let url = self.endpoint(&["users", "authenticate"])?;
        let response = self
            .http
            .post(url)
            .json(&AuthRequest { email, password })
            .send()
            .await?;
        let payload: AuthResponse = Self::handle_response(response).await?;
        payload
            .user_id
            .or(payload.user.map(|user| user.id))
            .ok_or(FileServerError::MissingUserId)
    }

    pub async fn list_files(&self, user_id: &str) -> Result<Vec<FileRecord>, FileServerError> {
        let mut url = self.endpoint(&["files"])?;
        url.query_pairs_mut().append_pair("userId", user_id);
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    /// Uploads one file as a multipart request carrying the `file` part and
    /// the owning `userId` field.
    pub async fn upload(
        &self,
        user_id: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<FileRecord, FileServerError> {
        let url = self.endpoint(&["upload"])?;
        let part = multipart::Part::bytes(contents).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .part("file", part)
            .text("userId", user_id.to_string());
        let response = self.http.post(url).multipart(form).send().await?;
        Self::handle_response(response).await
    }

    /// Fetches the raw contents served by the inline-view endpoint.
    pub async fn view(&self, file_id: &str, user_id: &str) -> Result<Vec<u8>, FileServerError> {
        let url = self.view_url(file_id, user_id)?;
        self.fetch_bytes(url).await
    }

    /// Builds the scoped inline-view URL without issuing a request, so the
    /// caller can hand it to a browser.
    pub fn view_url(&self, file_id: &str, user_id: &str) -> Result<Url, FileServerError> {
        let mut url = self.endpoint(&["view", file_id])?;
        url.query_pairs_mut().append_pair("userId", user_id);
        Ok(url)
    }

    pub async fn download(&self, file_id: &str, user_id: &str) -> Result<Vec<u8>, FileServerError> {
        let mut url = self.endpoint(&["download", file_id])?;
        url.query_pairs_mut().append_pair("userId", user_id);
        self.fetch_bytes(url).await
    }

    /// Deletes one file. The server acknowledges either with a JSON document
    /// or a plain-text message; both are surfaced as a [`DeleteAck`].
    pub async fn delete_file(
        &self,
        file_id: &str,
        user_id: &str,
    ) -> Result<DeleteAck, FileServerError> {
        let mut url = self.endpoint(&["delete", file_id])?;
        url.query_pairs_mut().append_pair("userId", user_id);
        let response = self.http.delete(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FileServerError::Api { status, body });
        }
        if is_json_response(&response) {
            return Ok(response.json::<DeleteAck>().await?);
        }
        let message = response.text().await?;
        Ok(DeleteAck {
            message: Some(message).filter(|text| !text.trim().is_empty()),
        })
    }

    async fn fetch_bytes(&self, url: Url) -> Result<Vec<u8>, FileServerError> {
        let response = self.http.get(url).send().await?;
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(FileServerError::Api { status, body })
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FileServerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FileServerError::InvalidBaseUrl)?
            .extend(segments);
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FileServerError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(FileServerError::Api { status, body })
        }
    }
}

impl FileServerError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            FileServerError::Api { status, .. } => Some(classify_api_status(*status)),
            _ => None,
        }
    }

    /// True when the backend could not be reached at all, as opposed to it
    /// answering with an error status.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            FileServerError::Request(err) if err.is_connect() || err.is_timeout()
        )
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Unauthorized
    } else if status == StatusCode::NOT_FOUND {
        ApiErrorClass::NotFound
    } else if status == StatusCode::CONFLICT {
        ApiErrorClass::Conflict
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

fn is_json_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false)
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(rename = "userId", default)]
    user_id: Option<String>,
    #[serde(default)]
    user: Option<UserRef>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    #[serde(default)]
    pub original_file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl FileRecord {
    pub fn display_name(&self) -> &str {
        self.original_file_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_LABEL)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DeleteAck {
    #[serde(default)]
    pub message: Option<String>,
}
