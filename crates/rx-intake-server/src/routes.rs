use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use rx_intake_core::{
    CoreError, Decision, NewPrescription, NotifyOutcome, ParsedPrescription, PrescriptionRecord,
    UpdatePrescription, UploadedFile,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::Identity;
use crate::state::SharedState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub prescription: PrescriptionRecord,
    pub draft: Option<ParsedPrescription>,
}

/// `POST /prescriptions` - multipart with a `payload` JSON part and zero or
/// more `prescriptionImages` file parts.
pub async fn submit_prescription(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut payload: Option<NewPrescription> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::MalformedMultipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "payload" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::MalformedMultipart(e.to_string()))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| CoreError::Validation(format!("invalid payload: {e}")))?;
                payload = Some(parsed);
            }
            "prescriptionImages" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::MalformedMultipart(e.to_string()))?;
                files.push(UploadedFile {
                    filename,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let payload =
        payload.ok_or_else(|| CoreError::Validation("payload part is required".into()))?;
    let outcome = state.service.submit(&caller, payload, files)?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            prescription: outcome.record,
            draft: outcome.draft,
        }),
    ))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Staff may list another patient's records.
    pub patient_id: Option<String>,
}

/// `GET /prescriptions`
pub async fn list_prescriptions(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PrescriptionRecord>>> {
    let patient_id = query.patient_id.unwrap_or_else(|| caller.user_id.clone());
    let records = state.service.list_for_patient(&caller, &patient_id)?;
    Ok(Json(records))
}

/// `GET /prescriptions/:id`
pub async fn get_prescription(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<PrescriptionRecord>> {
    Ok(Json(state.service.get(&caller, &id)?))
}

/// `PUT /prescriptions/:id`
pub async fn update_prescription(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    Json(update): Json<UpdatePrescription>,
) -> ApiResult<Json<PrescriptionRecord>> {
    Ok(Json(state.service.update(&caller, &id, update)?))
}

/// `DELETE /prescriptions/:id`
pub async fn delete_prescription(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete(&caller, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /prescriptions/admin/pending`
pub async fn pending_queue(
    State(state): State<SharedState>,
    Identity(caller): Identity,
) -> ApiResult<Json<Vec<PrescriptionRecord>>> {
    Ok(Json(state.service.pending_queue(&caller)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub is_approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub prescription: PrescriptionRecord,
    pub notification: NotifyOutcome,
}

/// `PATCH /prescriptions/:id/verify`
pub async fn verify_prescription(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let decision = if request.is_approved {
        Decision::Approve {
            notes: request.notes,
        }
    } else {
        Decision::Reject {
            reason: request.rejection_reason.unwrap_or_default(),
        }
    };

    let (prescription, notification) = state.service.decide(&caller, &id, decision)?;
    Ok(Json(VerifyResponse {
        prescription,
        notification,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessResponse {
    pub prescription: PrescriptionRecord,
    pub draft: ParsedPrescription,
}

/// `POST /prescriptions/:id/reprocess`
pub async fn reprocess_prescription(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<ReprocessResponse>> {
    let draft = state.service.reprocess(&caller, &id)?;
    let prescription = state.service.get(&caller, &id)?;
    Ok(Json(ReprocessResponse {
        prescription,
        draft,
    }))
}
