//! Long-running operation and error mapping tests for the management client
//!
//! Uses wiremock so responses can change between polls of the same URL.

mod common;

use common::{
    arm_client, init_rustls, test_config, vault_json, vault_path, LOCATION, RESOURCE_GROUP,
    SUBSCRIPTION_ID, TENANT_ID, VAULT_NAME,
};
use keyvault_recovery::config::PollConfig;
use keyvault_recovery::provider::azure::ArmClient;
use keyvault_recovery::provider::{
    Lookup, ResourceId, Sku, VaultCreateOrUpdateParameters, VaultManagement, VaultProperties,
};
use keyvault_recovery::ClientError;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_parameters() -> VaultCreateOrUpdateParameters {
    VaultCreateOrUpdateParameters::new(
        LOCATION,
        VaultProperties::new(TENANT_ID, Sku::standard()).with_soft_delete(true),
    )
}

fn vault_id() -> ResourceId {
    ResourceId::vault(SUBSCRIPTION_ID, RESOURCE_GROUP, VAULT_NAME)
}

#[tokio::test]
async fn test_requests_carry_auth_and_client_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(vault_path()))
        .and(header("authorization", "Bearer test-token"))
        .and(header_exists("x-ms-client-request-id"))
        .and(query_param("api-version", "2023-07-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vault_json(true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let vault = client.get_vault(&vault_id()).await.unwrap();
    assert_eq!(vault.name, VAULT_NAME);
}

#[tokio::test]
async fn test_async_operation_success_rereads_vault() {
    let server = MockServer::start().await;
    let operation_url = format!("{}/operations/create-1", server.uri());

    Mock::given(method("PUT"))
        .and(path(vault_path()))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", operation_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/create-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/create-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(vault_json(true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let vault = client
        .create_or_update_vault(RESOURCE_GROUP, VAULT_NAME, &create_parameters())
        .await
        .unwrap();

    assert!(vault.soft_delete_enabled());
    assert!(vault.is_provisioned());
}

#[tokio::test]
async fn test_async_operation_failure_is_reported() {
    let server = MockServer::start().await;
    let operation_url = format!("{}/operations/create-2", server.uri());

    Mock::given(method("PUT"))
        .and(path(vault_path()))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation_url.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/create-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": { "code": "VaultQuotaExceeded", "message": "Too many vaults" }
        })))
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let err = client
        .create_or_update_vault(RESOURCE_GROUP, VAULT_NAME, &create_parameters())
        .await
        .unwrap_err();

    match err {
        ClientError::OperationFailed {
            url,
            status,
            message,
        } => {
            assert_eq!(url, operation_url);
            assert_eq!(status, "Failed");
            assert_eq!(message, "VaultQuotaExceeded: Too many vaults");
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_location_polling_until_done() {
    let server = MockServer::start().await;
    let location_url = format!("{}/operations/delete-1", server.uri());

    Mock::given(method("DELETE"))
        .and(path(vault_path()))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", location_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/delete-1"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/delete-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    client.delete_vault(&vault_id()).await.unwrap();

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/operations/delete-1")
        .count();
    assert_eq!(polls, 2);
}

#[tokio::test]
async fn test_async_operation_header_preferred_over_location() {
    let server = MockServer::start().await;
    let operation_url = format!("{}/operations/async", server.uri());
    let location_url = format!("{}/operations/location", server.uri());

    Mock::given(method("PATCH"))
        .and(path(vault_path()))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", operation_url.as_str())
                .insert_header("Location", location_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/async"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/location"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(vault_json(true)))
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let vault = client
        .update_vault(
            RESOURCE_GROUP,
            VAULT_NAME,
            &keyvault_recovery::provider::VaultPatchParameters::enable_soft_delete(),
        )
        .await
        .unwrap();
    assert!(vault.soft_delete_enabled());
}

#[tokio::test]
async fn test_operation_timeout() {
    init_rustls();
    let server = MockServer::start().await;
    let operation_url = format!("{}/operations/stuck", server.uri());

    Mock::given(method("PUT"))
        .and(path(vault_path()))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation_url.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/stuck"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.operation = PollConfig::new(
        Duration::from_millis(10),
        Duration::from_millis(40),
        Duration::from_millis(200),
    );
    let client = ArmClient::new(&config).unwrap();

    let err = client
        .create_or_update_vault(RESOURCE_GROUP, VAULT_NAME, &create_parameters())
        .await
        .unwrap_err();

    match err {
        ClientError::OperationTimedOut { url, elapsed } => {
            assert_eq!(url, operation_url);
            assert!(elapsed >= Duration::from_millis(200));
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_accepted_without_poll_headers_rereads() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(vault_json(true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let vault = client
        .create_or_update_vault(RESOURCE_GROUP, VAULT_NAME, &create_parameters())
        .await
        .unwrap();
    assert_eq!(vault.name, VAULT_NAME);
}

#[tokio::test]
async fn test_structured_not_found_maps_to_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "ResourceNotFound", "message": "Vault not found" }
        })))
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let lookup = Lookup::from_result(client.get_vault(&vault_id()).await).unwrap();
    assert_eq!(
        lookup,
        Lookup::NotFound {
            code: "ResourceNotFound".to_string(),
            message: "Vault not found".to_string(),
        }
    );
}

#[tokio::test]
async fn test_unstructured_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let err = client.get_vault(&vault_id()).await.unwrap_err();

    match err {
        ClientError::Api {
            method,
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(method, "GET");
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(code, "Unknown");
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = arm_client(&server.uri());
    let err = client.get_vault(&vault_id()).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }), "{err:?}");
}
