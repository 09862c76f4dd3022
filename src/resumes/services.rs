use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use super::repo::{NewResume, Resume};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
pub const DOWNLOAD_TTL_SECS: u64 = 30 * 60;
/// Upper bound on recording an uploaded resume.
pub const RECORD_TIMEOUT: Duration = Duration::from_secs(10);

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeView {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        _ => None,
    }
}

/// Keeps `[A-Za-z0-9._-]`, maps the rest to `_`, at most 100 chars.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "resume".into()
    } else {
        cleaned
    }
}

pub fn user_prefix(user_id: Uuid) -> String {
    format!("resumes/{user_id}/")
}

pub fn storage_key(user_id: Uuid, id: Uuid, file_name: &str) -> String {
    format!("{}{id}-{}", user_prefix(user_id), sanitize_file_name(file_name))
}

/// A key the caller may register: inside their prefix, no traversal.
pub fn owns_key(user_id: Uuid, key: &str) -> bool {
    let Some(rest) = key.strip_prefix(&user_prefix(user_id)) else {
        return false;
    };
    !rest.is_empty() && !key.split('/').any(|seg| seg == ".." || seg.is_empty())
}

pub async fn upload_resume(st: &AppState, user_id: Uuid, item: UploadItem) -> ApiResult<Resume> {
    if item.body.is_empty() {
        return Err(ApiError::bad_request("File is empty"));
    }
    if item.body.len() > MAX_RESUME_BYTES {
        return Err(ApiError::bad_request("File exceeds the 5 MB limit"));
    }
    if ext_from_mime(&item.content_type).is_none() {
        return Err(ApiError::bad_request("Only PDF, DOC or DOCX resumes are accepted"));
    }

    let key = storage_key(user_id, Uuid::new_v4(), &item.file_name);
    let size_bytes = item.body.len() as i64;
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {key}"))
        .map_err(|e| {
            error!(error = ?e, "resume upload to storage failed");
            ApiError::BadGateway("Could not store the file".into())
        })?;

    let new = NewResume {
        user_id,
        name: item.file_name,
        storage_key: key.clone(),
        content_type: item.content_type,
        size_bytes,
    };
    let recorded = tokio::time::timeout(RECORD_TIMEOUT, st.resumes.insert(&new)).await;
    let failure = match recorded {
        Ok(Ok(resume)) => return Ok(resume),
        Ok(Err(e)) => ApiError::Internal(e),
        Err(_) => ApiError::Timeout("Saving the resume timed out".into()),
    };

    // the object has no record pointing at it; drop it
    if let Err(e) = st.storage.delete_object(&key).await {
        warn!(error = %e, %key, "orphaned resume object left in storage");
    }
    Err(failure)
}

pub async fn presign_many(
    st: &AppState,
    resumes: Vec<Resume>,
    expires_seconds: u64,
) -> anyhow::Result<Vec<ResumeView>> {
    let mut out = Vec::with_capacity(resumes.len());
    for r in resumes {
        let url = st.storage.presign_get(&r.storage_key, expires_seconds).await?;
        out.push(ResumeView {
            id: r.id,
            name: r.name,
            content_type: r.content_type,
            size_bytes: r.size_bytes,
            url,
            created_at: r.created_at,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn ext_from_mime_knows_document_types() {
        assert_eq!(ext_from_mime("application/pdf"), Some("pdf"));
        assert_eq!(ext_from_mime("application/msword"), Some("doc"));
        assert_eq!(
            ext_from_mime("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            Some("docx")
        );
        assert_eq!(ext_from_mime("image/png"), None);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("My CV (final).pdf"), "My_CV__final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("///"), "resume");
    }

    #[test]
    fn key_ownership_is_prefix_bound() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(owns_key(me, &format!("resumes/{me}/abc-cv.pdf")));
        assert!(!owns_key(me, &format!("resumes/{other}/abc-cv.pdf")));
        assert!(!owns_key(me, &format!("resumes/{me}/../{other}/cv.pdf")));
        assert!(!owns_key(me, &format!("resumes/{me}/")));
    }

    #[tokio::test]
    async fn upload_stores_object_and_record() {
        let fx = testing::fixture();
        let user_id = Uuid::new_v4();
        let resume = upload_resume(
            &fx.state,
            user_id,
            UploadItem {
                body: Bytes::from_static(b"%PDF-1.7"),
                content_type: "application/pdf".into(),
                file_name: "cv.pdf".into(),
            },
        )
        .await
        .unwrap();
        assert!(resume.storage_key.starts_with(&format!("resumes/{user_id}/")));
        assert!(resume.storage_key.ends_with("-cv.pdf"));
        assert_eq!(resume.size_bytes, 8);
        assert_eq!(fx.storage.keys(), vec![resume.storage_key.clone()]);
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_type() {
        let fx = testing::fixture();
        let err = upload_resume(
            &fx.state,
            Uuid::new_v4(),
            UploadItem {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
                file_name: "cv.png".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(fx.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn presigned_views_point_at_keys() {
        let state = testing::state();
        let user_id = Uuid::new_v4();
        let resume = upload_resume(
            &state,
            user_id,
            UploadItem {
                body: Bytes::from_static(b"%PDF"),
                content_type: "application/pdf".into(),
                file_name: "cv.pdf".into(),
            },
        )
        .await
        .unwrap();
        let views = presign_many(&state, vec![resume.clone()], DOWNLOAD_TTL_SECS)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].url.contains(&resume.storage_key));
    }
}
