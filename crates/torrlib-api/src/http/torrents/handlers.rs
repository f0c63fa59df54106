use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use torrlib_torrent_core::TorrentSnapshot;
use tracing::{debug, info};

use crate::http::errors::ApiError;
use crate::http::torrents::{UploadForm, build_add_request, build_patch, request_origin};
use crate::models::{AddTorrentBody, TorrentAction};
use crate::state::ApiState;

pub(crate) async fn dispatch_action(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<TorrentAction>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(action) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    debug!(action = action.name(), "torrent action received");
    let workflow = &state.workflow;

    match action {
        TorrentAction::Add(body) => {
            let request = build_add_request(body, request_origin(&headers))?;
            let snapshot = workflow.add(request).await?;
            info!(hash = %snapshot.hash, "torrent add requested");
            Ok(Json(snapshot).into_response())
        }
        TorrentAction::Get(body) => {
            let hash = body.into_hash()?;
            Ok(Json(workflow.get(&hash).await?).into_response())
        }
        TorrentAction::Set(body) => {
            let (hash, patch) = build_patch(body)?;
            workflow.set(&hash, patch).await?;
            Ok(StatusCode::OK.into_response())
        }
        TorrentAction::Rem(body) => {
            let hash = body.into_hash()?;
            workflow.remove(&hash).await?;
            info!(hash = %hash, "torrent removal requested");
            Ok(StatusCode::OK.into_response())
        }
        TorrentAction::List => Ok(Json(workflow.list().await?).into_response()),
        TorrentAction::Drop(body) => {
            let hash = body.into_hash()?;
            workflow.drop_torrent(&hash).await?;
            info!(hash = %hash, "torrent drop requested");
            Ok(StatusCode::OK.into_response())
        }
        TorrentAction::Wipe => {
            workflow.wipe().await?;
            info!("library wipe requested");
            Ok(StatusCode::OK.into_response())
        }
    }
}

pub(crate) async fn add_for_media_server(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<AddTorrentBody>, JsonRejection>,
) -> Result<Json<TorrentSnapshot>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let request = build_add_request(body, request_origin(&headers))?;
    let snapshot = state.workflow.add_for_media_server(request).await?;
    info!(hash = %snapshot.hash, "media-server add requested");
    Ok(Json(snapshot))
}

pub(crate) async fn upload_torrent(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<TorrentSnapshot>, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            // Only the first file part is used.
            if form.file.is_none() {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::bad_request(err.body_text()))?;
                form.file = Some(bytes.to_vec());
            }
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|err| ApiError::bad_request(err.body_text()))?;
        form.set_text(&name, value);
    }

    let request = form.into_request(request_origin(&headers))?;
    let snapshot = state.workflow.add(request).await?;
    info!(hash = %snapshot.hash, "torrent upload accepted");
    Ok(Json(snapshot))
}
