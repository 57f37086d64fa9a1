//! Profile photos for pastors and gallery images for churches, stored in S3.

use crate::error::ApiError;
use crate::image_processing::{self, ProcessedImage};
use crate::store::Store;
use crate::types::{Church, Pastor};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use base64::Engine;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub file_data: String, // base64, optionally a data: URL
}

/// Decode and normalize an upload body.
pub fn prepare(body: &[u8]) -> Result<ProcessedImage, ApiError> {
    let req: UploadImageRequest = serde_json::from_slice(body)?;

    if let Some(content_type) = req.content_type.as_deref() {
        if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(ApiError::validation(format!(
                "Unsupported content type '{}'",
                content_type
            )));
        }
    }

    // Accept `data:image/png;base64,....` as pasted by browsers.
    let data = match req.file_data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => req.file_data.as_str(),
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| ApiError::validation(format!("Failed to decode base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(ApiError::validation("Image data is empty"));
    }

    image_processing::process(bytes).map_err(ApiError::Validation)
}

pub fn public_url(bucket: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, key)
}

async fn put_object(
    s3_client: &S3Client,
    bucket: &str,
    key: &str,
    image: ProcessedImage,
) -> Result<String, ApiError> {
    s3_client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(image.bytes))
        .content_type(image.content_type)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to upload {} to S3: {}",
                key,
                aws_sdk_s3::error::DisplayErrorContext(&e)
            );
            ApiError::Upload(format!("Failed to upload {}", key))
        })?;

    tracing::info!("Uploaded s3://{}/{}", bucket, key);
    Ok(public_url(bucket, key))
}

fn object_key(collection: &str, owner_id: &str, extension: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        collection,
        owner_id,
        uuid::Uuid::new_v4(),
        extension
    )
}

/// Replace a pastor's profile photo.
pub async fn upload_pastor_image(
    store: &dyn Store,
    s3_client: &S3Client,
    bucket: &str,
    pastor_id: &str,
    body: &[u8],
) -> Result<Pastor, ApiError> {
    crate::pastors::get_pastor(store, pastor_id).await?;
    let image = prepare(body)?;
    let key = object_key("pastors", pastor_id, image.extension);
    let url = put_object(s3_client, bucket, &key, image).await?;
    crate::pastors::set_profile_image(store, pastor_id, url).await
}

/// Append an image to a church's gallery.
pub async fn upload_church_image(
    store: &dyn Store,
    s3_client: &S3Client,
    bucket: &str,
    church_id: &str,
    body: &[u8],
) -> Result<Church, ApiError> {
    crate::churches::get_church(store, church_id).await?;
    let image = prepare(body)?;
    let key = object_key("churches", church_id, image.extension);
    let url = put_object(s3_client, bucket, &key, image).await?;
    crate::churches::add_image(store, church_id, url).await
}
