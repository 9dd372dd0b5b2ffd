use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, FieldErrors};
use crate::resume::store;
use crate::storage::{BlobStore, DeleteOutcome};

/// Public URL prefix the legacy scheme persisted instead of a bare filename.
const LEGACY_PUBLIC_PREFIX: &str = "/storage/";

/// Prefix under which photo blobs are keyed, per resume.
const PHOTO_KEY_PREFIX: &str = "resume-photos";

/// Upload size cap in kilobytes.
const MAX_PHOTO_KB: usize = 2048;

/// Content types accepted as a profile photo.
const IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/svg+xml",
];

/// The persisted photo reference, parsed once at the boundary.
///
/// Two historical formats coexist in the column: the legacy scheme stored a
/// full public path, the current scheme stores only the filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPhotoRef {
    /// Relative path under the legacy public prefix.
    Legacy(String),
    /// Bare filename under the fixed per-resume folder.
    Current(String),
    /// No photo attached.
    Absent,
}

impl StoredPhotoRef {
    pub fn parse(value: Option<&str>) -> Self {
        let value = value.unwrap_or("");
        if value.is_empty() {
            return StoredPhotoRef::Absent;
        }
        if let Some(rest) = value.strip_prefix(LEGACY_PUBLIC_PREFIX) {
            return StoredPhotoRef::Legacy(rest.trim_start_matches('/').to_string());
        }
        StoredPhotoRef::Current(value.to_string())
    }

    /// Resolves the storage key addressing the referenced blob, or `None`
    /// when there is nothing to delete.
    pub fn storage_key(&self, resume_id: Uuid) -> Option<String> {
        match self {
            StoredPhotoRef::Legacy(path) if path.is_empty() => None,
            StoredPhotoRef::Legacy(path) => Some(path.clone()),
            StoredPhotoRef::Current(value) => {
                let file_name = base_name(value);
                if file_name.is_empty() {
                    return None;
                }
                Some(photo_storage_key(resume_id, file_name))
            }
            StoredPhotoRef::Absent => None,
        }
    }
}

/// Last path segment of a stored value. Collapses embedded separators so a
/// stored value can never address outside the per-resume folder.
fn base_name(value: &str) -> &str {
    value.rsplit(['/', '\\']).next().unwrap_or(value)
}

/// An uploaded image, as read off the multipart request.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Checks the upload is a recognized image within the size cap.
/// Returns the validated content type.
fn validate_photo(upload: &PhotoUpload) -> Result<&str, AppError> {
    let mut errors = FieldErrors::default();

    let content_type = upload.content_type.as_deref().unwrap_or("");
    if !IMAGE_CONTENT_TYPES.contains(&content_type) {
        errors.push("photo", "must be an image (jpeg, png, gif, bmp, webp or svg)");
    }
    if upload.bytes.len() > MAX_PHOTO_KB * 1024 {
        errors.push(
            "photo",
            format!("may not be greater than {MAX_PHOTO_KB} kilobytes"),
        );
    }

    errors.into_result()?;
    Ok(content_type)
}

/// Lowercase extension of the uploaded filename; `jpg` when undeterminable.
fn photo_extension(file_name: Option<&str>) -> String {
    let ext = file_name
        .map(base_name)
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        "jpg".to_string()
    } else {
        ext
    }
}

/// Derives the stored filename for an upload received at `now`.
pub fn photo_file_name(now: DateTime<Utc>, upload_name: Option<&str>) -> String {
    format!(
        "photo_{}.{}",
        now.format("%Y%m%d%H%M%S"),
        photo_extension(upload_name)
    )
}

/// Storage key for a photo filename under the fixed per-resume folder.
pub fn photo_storage_key(resume_id: Uuid, file_name: &str) -> String {
    format!("{PHOTO_KEY_PREFIX}/{resume_id}/{file_name}")
}

/// Best-effort removal of whatever blob the stored reference points at.
///
/// Backend failures are logged and folded into the returned outcome; they
/// never abort the calling operation.
pub async fn delete_stored_blob(
    storage: &dyn BlobStore,
    resume_id: Uuid,
    stored_value: Option<&str>,
) -> DeleteOutcome {
    let Some(key) = StoredPhotoRef::parse(stored_value).storage_key(resume_id) else {
        return DeleteOutcome::Nothing;
    };
    let outcome = storage.delete(&key).await;
    if let DeleteOutcome::Ignored(reason) = &outcome {
        warn!("Ignoring failed delete of photo blob '{key}': {reason}");
    }
    outcome
}

/// Storage half of an attach: validates the upload, removes the previous
/// blob (best-effort), and writes the new one under a timestamped filename.
/// Returns the filename to record on the resume.
pub async fn replace_photo_blob(
    storage: &dyn BlobStore,
    resume_id: Uuid,
    stored_value: Option<&str>,
    upload: PhotoUpload,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let content_type = validate_photo(&upload)?.to_string();

    let _ = delete_stored_blob(storage, resume_id, stored_value).await;

    let file_name = photo_file_name(now, upload.file_name.as_deref());
    let key = photo_storage_key(resume_id, &file_name);
    storage.put(&key, upload.bytes, &content_type).await?;

    Ok(file_name)
}

/// Attaches `upload` as the resume's photo, replacing any previous blob.
///
/// There is no rollback of the blob write if the metadata write fails; the
/// orphaned blob is an accepted inconsistency window.
pub async fn attach_photo(
    pool: &PgPool,
    storage: &dyn BlobStore,
    resume_id: Uuid,
    user_id: Uuid,
    upload: PhotoUpload,
) -> Result<String, AppError> {
    let resume = store::load_owned(pool, resume_id, user_id).await?;

    let file_name = replace_photo_blob(
        storage,
        resume.id,
        resume.photo_file_name.as_deref(),
        upload,
        Utc::now(),
    )
    .await?;

    store::set_photo_file_name(pool, resume.id, Some(&file_name)).await?;

    info!("Attached photo {file_name} to resume {resume_id}");
    Ok(file_name)
}

/// Removes the resume's photo blob and clears the stored filename.
/// Calling with no photo attached is a no-op that still succeeds.
pub async fn detach_photo(
    pool: &PgPool,
    storage: &dyn BlobStore,
    resume_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    let resume = store::load_owned(pool, resume_id, user_id).await?;

    let _ = delete_stored_blob(storage, resume.id, resume.photo_file_name.as_deref()).await;
    store::set_photo_file_name(pool, resume.id, None).await?;

    info!("Detached photo from resume {resume_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::MemoryBlobStore;
    use chrono::TimeZone;

    fn test_resume_id() -> Uuid {
        Uuid::parse_str("00000000-0000-0000-0000-000000000007").unwrap()
    }

    fn jpeg_upload(file_name: Option<&str>, len: usize) -> PhotoUpload {
        PhotoUpload {
            file_name: file_name.map(String::from),
            content_type: Some("image/jpeg".to_string()),
            bytes: Bytes::from(vec![0u8; len]),
        }
    }

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_absent() {
        assert_eq!(StoredPhotoRef::parse(None), StoredPhotoRef::Absent);
        assert_eq!(StoredPhotoRef::parse(Some("")), StoredPhotoRef::Absent);
    }

    #[test]
    fn test_parse_legacy_strips_prefix() {
        let parsed = StoredPhotoRef::parse(Some("/storage/resume-photos/7/old.png"));
        assert_eq!(
            parsed,
            StoredPhotoRef::Legacy("resume-photos/7/old.png".to_string())
        );
        assert_eq!(
            parsed.storage_key(test_resume_id()).as_deref(),
            Some("resume-photos/7/old.png")
        );
    }

    #[test]
    fn test_parse_legacy_empty_remainder_is_nothing() {
        let parsed = StoredPhotoRef::parse(Some("/storage/"));
        assert_eq!(parsed.storage_key(test_resume_id()), None);
    }

    #[test]
    fn test_parse_current_synthesizes_key() {
        let parsed = StoredPhotoRef::parse(Some("photo_20250101120000.jpg"));
        assert_eq!(
            parsed.storage_key(test_resume_id()).unwrap(),
            format!(
                "resume-photos/{}/photo_20250101120000.jpg",
                test_resume_id()
            )
        );
    }

    #[test]
    fn test_current_collapses_embedded_separators() {
        let parsed = StoredPhotoRef::parse(Some("evil/../photo.png"));
        assert_eq!(
            parsed.storage_key(test_resume_id()).unwrap(),
            format!("resume-photos/{}/photo.png", test_resume_id())
        );
    }

    #[test]
    fn test_file_name_uses_lowercased_extension() {
        assert_eq!(
            photo_file_name(test_now(), Some("Portrait.PNG")),
            "photo_20250101120000.png"
        );
    }

    #[test]
    fn test_file_name_defaults_to_jpg() {
        assert_eq!(
            photo_file_name(test_now(), Some("portrait")),
            "photo_20250101120000.jpg"
        );
        assert_eq!(photo_file_name(test_now(), None), "photo_20250101120000.jpg");
        assert_eq!(
            photo_file_name(test_now(), Some("weird.!?")),
            "photo_20250101120000.jpg"
        );
    }

    #[tokio::test]
    async fn test_delete_with_no_stored_value_is_nothing() {
        let storage = MemoryBlobStore::default();
        let outcome = delete_stored_blob(&storage, test_resume_id(), None).await;
        assert_eq!(outcome, DeleteOutcome::Nothing);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let key = format!("resume-photos/{}/photo_1.jpg", test_resume_id());
        let storage = MemoryBlobStore::with_object(&key, b"img");

        let first = delete_stored_blob(&storage, test_resume_id(), Some("photo_1.jpg")).await;
        let second = delete_stored_blob(&storage, test_resume_id(), Some("photo_1.jpg")).await;
        assert_eq!(first, DeleteOutcome::Deleted);
        assert_eq!(second, DeleteOutcome::Deleted);
        assert!(!storage.contains(&key));
    }

    #[tokio::test]
    async fn test_replace_round_trip_reproduces_write_key() {
        let storage = MemoryBlobStore::default();
        let file_name = replace_photo_blob(
            &storage,
            test_resume_id(),
            None,
            jpeg_upload(Some("me.jpg"), 16),
            test_now(),
        )
        .await
        .unwrap();

        assert_eq!(file_name, "photo_20250101120000.jpg");

        // Resolving the recorded value must land on the exact key written.
        let resolved = StoredPhotoRef::parse(Some(&file_name))
            .storage_key(test_resume_id())
            .unwrap();
        assert!(storage.contains(&resolved));
    }

    #[tokio::test]
    async fn test_replace_removes_previous_blob() {
        let old_key = format!("resume-photos/{}/photo_old.png", test_resume_id());
        let storage = MemoryBlobStore::with_object(&old_key, b"old");

        replace_photo_blob(
            &storage,
            test_resume_id(),
            Some("photo_old.png"),
            jpeg_upload(Some("new.jpg"), 16),
            test_now(),
        )
        .await
        .unwrap();

        assert!(!storage.contains(&old_key));
        assert_eq!(storage.object_count(), 1);
    }

    #[tokio::test]
    async fn test_replace_removes_legacy_blob() {
        let storage = MemoryBlobStore::with_object("resume-photos/7/old.png", b"old");

        replace_photo_blob(
            &storage,
            test_resume_id(),
            Some("/storage/resume-photos/7/old.png"),
            jpeg_upload(Some("new.jpg"), 16),
            test_now(),
        )
        .await
        .unwrap();

        assert!(!storage.contains("resume-photos/7/old.png"));
    }

    #[tokio::test]
    async fn test_replace_survives_failed_cleanup() {
        let storage = MemoryBlobStore::failing();

        let file_name = replace_photo_blob(
            &storage,
            test_resume_id(),
            Some("photo_stuck.jpg"),
            jpeg_upload(Some("new.jpg"), 16),
            test_now(),
        )
        .await
        .unwrap();

        // Cleanup failure is swallowed; the new blob still lands.
        assert!(storage.keys().contains(&photo_storage_key(test_resume_id(), &file_name)));
    }

    #[tokio::test]
    async fn test_replace_rejects_non_image() {
        let storage = MemoryBlobStore::default();
        let upload = PhotoUpload {
            file_name: Some("notes.pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
            bytes: Bytes::from_static(b"%PDF"),
        };

        let err = replace_photo_blob(&storage, test_resume_id(), None, upload, test_now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_rejects_oversized_upload() {
        let storage = MemoryBlobStore::default();
        let upload = jpeg_upload(Some("huge.jpg"), 2048 * 1024 + 1);

        let err = replace_photo_blob(&storage, test_resume_id(), None, upload, test_now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_exact_size_cap_accepted() {
        let storage = MemoryBlobStore::default();
        let upload = jpeg_upload(Some("big.jpg"), 2048 * 1024);
        assert!(
            replace_photo_blob(&storage, test_resume_id(), None, upload, test_now())
                .await
                .is_ok()
        );
    }
}
