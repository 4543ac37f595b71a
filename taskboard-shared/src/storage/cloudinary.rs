/// Cloudinary image storage over its signed upload API
///
/// Uploads go to the `auth-system` folder with an eager transformation that
/// caps images at 1000x1000 and lets Cloudinary pick the quality.
///
/// Requests are signed by sorting the signed parameters, joining them as
/// `key=value&...`, appending the API secret and hashing with SHA-256.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{ImageStore, ImageUpload, StorageError, StoredImage};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Target folder for uploads
pub const UPLOAD_FOLDER: &str = "auth-system";

/// Transformation applied to every upload
pub const UPLOAD_TRANSFORMATION: &str = "c_limit,h_1000,w_1000/q_auto";

/// Cloudinary account credentials
#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Cloudinary-backed [`ImageStore`]
#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    credentials: CloudinaryCredentials,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signs a parameter set with the API secret
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let payload = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryStore {
    pub fn new(credentials: CloudinaryCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_BASE, self.credentials.cloud_name, action)
    }

    fn signed_fields(&self, mut params: BTreeMap<&'static str, String>) -> Vec<(&'static str, String)> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.credentials.api_secret);

        let mut fields: Vec<(&'static str, String)> = params.into_iter().collect();
        fields.push(("api_key", self.credentials.api_key.clone()));
        fields.push(("signature", signature));
        fields.push(("signature_algorithm", "sha256".to_string()));
        fields
    }

    async fn rejection(response: reqwest::Response) -> StorageError {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => StorageError::Rejected(body.error.message),
            Err(_) => StorageError::Rejected(format!("HTTP {}", status)),
        }
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, image: ImageUpload) -> Result<StoredImage, StorageError> {
        let mut params = BTreeMap::new();
        params.insert("folder", UPLOAD_FOLDER.to_string());
        params.insert("transformation", UPLOAD_TRANSFORMATION.to_string());

        let part = reqwest::multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;

        let form = self
            .signed_fields(params)
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::rejection(response).await;
            warn!(error = %err, "Image upload rejected");
            return Err(err);
        }

        let body: UploadResponse = response.json().await?;
        debug!(public_id = %body.public_id, "Image uploaded");

        Ok(StoredImage {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&self.signed_fields(params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" => {
                debug!(public_id, "Image deleted");
                Ok(())
            }
            "not found" => {
                debug!(public_id, "Image already gone");
                Ok(())
            }
            other => Err(StorageError::Rejected(other.to_string())),
        }
    }
}
