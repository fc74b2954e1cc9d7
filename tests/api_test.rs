//! Response classification and wire-shape decoding for the cloud APIs.

use automl_predict::models::operation::Operation;
use automl_predict::services::api::{decode_body, ApiError};
use automl_predict::services::automl::{ListModelsResponse, PredictResponse};
use automl_predict::services::resource_manager::ListProjectsResponse;

#[test]
fn status_200_decodes_the_payload() {
    let body = r#"{"projects":[{"projectId":"demo","name":"Demo","lifecycleState":"ACTIVE"}]}"#;
    let response: ListProjectsResponse = decode_body(200, body).unwrap();

    assert_eq!(response.projects.len(), 1);
    assert_eq!(response.projects[0].project_id, "demo");
    assert!(response.projects[0].is_active());
}

#[test]
fn error_envelope_is_carried_verbatim() {
    let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
    let result: Result<ListProjectsResponse, ApiError> = decode_body(403, body);

    match result {
        Err(ApiError::Remote { code, message }) => {
            assert_eq!(code, 403);
            assert_eq!(message, "The caller does not have permission");
        }
        other => panic!("expected remote error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn non_envelope_errors_keep_the_raw_body() {
    let result: Result<ListProjectsResponse, ApiError> = decode_body(502, "Bad Gateway");

    match result {
        Err(ApiError::Remote { code, message }) => {
            assert_eq!(code, 502);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("expected remote error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn malformed_success_payloads_are_decode_errors() {
    let result: Result<ListProjectsResponse, ApiError> = decode_body(200, "not json");
    assert!(matches!(result, Err(ApiError::Decode(_))));
}

#[test]
fn model_list_uses_the_singular_wire_field() {
    let body = r#"{"model":[{"name":"projects/p/locations/us-central1/models/ICN1","displayName":"classifier","deploymentState":"DEPLOYED"}]}"#;
    let response: ListModelsResponse = decode_body(200, body).unwrap();

    assert_eq!(response.models.len(), 1);
    let model = &response.models[0];
    assert!(model.is_deployed());
    assert_eq!(model.short_id(), "ICN1");
}

#[test]
fn prediction_candidates_expose_label_and_score() {
    let body = r#"{"payload":[
        {"annotationSpecId":"1","displayName":"Cat","classification":{"score":0.97}},
        {"annotationSpecId":"2","displayName":"Dog","classification":{"score":0.02}}
    ]}"#;
    let response: PredictResponse = decode_body(200, body).unwrap();

    let top = response.top().unwrap();
    assert_eq!(top.display_name, "Cat");
    assert!((top.score() - 0.97).abs() < f64::EPSILON);
}

#[test]
fn empty_prediction_payload_has_no_top_candidate() {
    let response: PredictResponse = decode_body(200, "{}").unwrap();
    assert!(response.top().is_none());
}

#[test]
fn pending_operations_default_the_done_flag() {
    let body = r#"{"name":"projects/p/locations/us-central1/operations/op-7","metadata":{"@type":"ImportDataMetadata"}}"#;
    let operation: Operation = decode_body(200, body).unwrap();

    assert!(!operation.done);
    assert!(operation.error.is_none());
    assert_eq!(operation.short_id(), "op-7");
}
