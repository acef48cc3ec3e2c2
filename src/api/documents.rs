use super::errors::ApiError;
use super::{with_context, Context};
use crate::types::DocumentType;
use crate::JobScoutError;
use bytes::Buf;
use futures::{pin_mut, StreamExt, TryStreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use tracing::debug;
use warp::filters::multipart::FormData;
use warp::filters::BoxedFilter;
use warp::{Filter, Rejection, Reply};

/// Room for the multipart boundaries and headers around the uploaded file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// The `/documents` routes.
pub fn routes(ctx: Context) -> BoxedFilter<(impl Reply,)> {
    let max_upload = ctx.settings.documents.max_file_size + MULTIPART_OVERHEAD;

    let upload = warp::path("upload")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload))
        .and(with_context(ctx.clone()))
        .and_then(upload_document);
    let list = warp::path("list")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_context(ctx.clone()))
        .and_then(list_documents);
    let get = warp::path::param::<String>()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(get_document);
    let delete = warp::path::param::<String>()
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_context(ctx))
        .and_then(delete_document);

    warp::path("documents")
        .and(upload.or(list).unify().or(get).unify().or(delete).unify())
        .boxed()
}

fn parse_document_type(value: &str) -> Result<DocumentType, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::from_service("Invalid document type", e))
}

/// Decodes a percent-encoded filename path segment.
fn decode_filename(raw: &str) -> Result<String, ApiError> {
    urlencoding::decode(raw)
        .map(|name| name.into_owned())
        .map_err(|_| ApiError::bad_request("Invalid filename"))
}

async fn upload_document(document_type: String, form: FormData, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let document_type = parse_document_type(&document_type)?;

    pin_mut!(form);
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if part.name() != "file" {
            debug!("Ignoring multipart field '{}'", part.name());
            continue;
        }

        let filename = part.filename().unwrap_or_default().to_string();
        let content_type = part.content_type().unwrap_or("application/octet-stream").to_string();
        let stream = part.stream().map(|chunk| {
            chunk
                .map(|mut buf| buf.copy_to_bytes(buf.remaining()))
                .map_err(io::Error::other)
        });

        let info = ctx
            .documents
            .save_document(stream, &filename, &content_type, document_type)
            .await
            .map_err(|e| ApiError::from_service("Error uploading document", e))?;
        return Ok(warp::reply::json(&info));
    }

    Err(ApiError::bad_request("Missing multipart field 'file'").into())
}

async fn list_documents(query: HashMap<String, String>, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let document_type = query
        .get("document_type")
        .filter(|value| !value.is_empty())
        .map(|value| parse_document_type(value))
        .transpose()?;

    let documents = ctx
        .documents
        .list_documents(document_type)
        .await
        .map_err(|e| ApiError::from_service("Error listing documents", e))?;
    Ok(warp::reply::json(&documents))
}

async fn get_document(filename: String, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let filename = decode_filename(&filename)?;
    let document = ctx
        .documents
        .get_document(&filename)
        .await
        .and_then(|document| document.ok_or_else(|| JobScoutError::NotFound("Document".to_string())))
        .map_err(|e| ApiError::from_service("Error retrieving document", e))?;
    Ok(warp::reply::json(&document))
}

async fn delete_document(filename: String, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let filename = decode_filename(&filename)?;
    ctx.documents
        .delete_document(&filename)
        .await
        .and_then(|deleted| {
            deleted
                .then_some(())
                .ok_or_else(|| JobScoutError::NotFound("Document".to_string()))
        })
        .map_err(|e| ApiError::from_service("Error deleting document", e))?;
    Ok(warp::reply::json(&json!({ "success": true })))
}
