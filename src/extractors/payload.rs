//! Body extractor for the file-aware insert route: a JSON object or a multipart form.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde_json::Value;

/// Form field name preferred when several parts carry a file name.
pub const FILE_PART: &str = "file";

/// Browser form encodings send these for "no value".
const ABSENT_MARKERS: &[&str] = &["", "null", "undefined"];

#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub enum InsertPayload {
    Json(Value),
    Form {
        fields: Vec<(String, String)>,
        file: Option<UploadedFile>,
    },
}

#[async_trait]
impl<S> FromRequest<S> for InsertPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Json(body) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(InsertPayload::Json(body));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let mut fields = Vec::new();
        let mut files = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    // An empty file input still sends a part with filename="".
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    files.push(UploadedFile {
                        field: name,
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    fields.push((name, text));
                }
            }
        }
        Ok(InsertPayload::Form {
            fields: normalize_form_fields(fields),
            file: pick_file(files),
        })
    }
}

/// Drop values that mean "absent" and unnamed parts; the last duplicate wins.
pub fn normalize_form_fields(fields: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        if name.is_empty() {
            continue;
        }
        out.retain(|(n, _)| *n != name);
        if is_absent(&value) {
            continue;
        }
        out.push((name, value));
    }
    out
}

pub fn is_absent(value: &str) -> bool {
    let v = value.trim();
    ABSENT_MARKERS.iter().any(|m| v.eq_ignore_ascii_case(m))
}

fn pick_file(mut files: Vec<UploadedFile>) -> Option<UploadedFile> {
    match files.iter().position(|f| f.field == FILE_PART) {
        Some(i) => Some(files.swap_remove(i)),
        None if files.is_empty() => None,
        None => Some(files.swap_remove(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: &str, v: &str) -> (String, String) {
        (n.to_string(), v.to_string())
    }

    #[test]
    fn absent_markers_are_dropped() {
        let out = normalize_form_fields(vec![
            pair("title", "Lease"),
            pair("description", ""),
            pair("category", "null"),
            pair("uploaded_by", "undefined"),
            pair("file_size", " NULL "),
        ]);
        assert_eq!(out, vec![pair("title", "Lease")]);
    }

    #[test]
    fn last_duplicate_wins_even_when_absent() {
        let out = normalize_form_fields(vec![pair("title", "a"), pair("title", "b")]);
        assert_eq!(out, vec![pair("title", "b")]);
        let out = normalize_form_fields(vec![pair("title", "a"), pair("title", "")]);
        assert!(out.is_empty());
    }

    #[test]
    fn prefers_file_field() {
        let part = |field: &str| UploadedFile {
            field: field.to_string(),
            file_name: format!("{}.txt", field),
            content_type: None,
            bytes: vec![1],
        };
        let picked = pick_file(vec![part("attachment"), part("file")]).unwrap();
        assert_eq!(picked.field, "file");
        assert_eq!(pick_file(vec![part("attachment")]).unwrap().field, "attachment");
        assert!(pick_file(Vec::new()).is_none());
    }
}
