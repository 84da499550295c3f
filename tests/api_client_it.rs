// std
use std::num::NonZeroU32;
// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
// self
use intra_sync::{
	auth::Credentials, client::ApiClient, config::ClientConfig, error::Error,
	http::ReqwestHttpClient,
};

const TOKEN_BODY: &str =
	r#"{"access_token":"api-token","token_type":"bearer","expires_in":7200}"#;

fn build_client(server: &MockServer) -> ApiClient<ReqwestHttpClient> {
	let config = ClientConfig::new(Credentials::new("test-uid", "test-secret"))
		.with_base_url(server.base_url())
		.with_token_url(server.url("/oauth/token"))
		.with_requests_per_second(NonZeroU32::new(10).expect("Budget must be non-zero."));

	ApiClient::new(config).expect("API client should build.")
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await
}

#[tokio::test]
async fn get_returns_parsed_json_and_sends_the_bearer_token() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let projects = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v2/projects")
				.header("authorization", "Bearer api-token")
				.query_param("page", "1")
				.query_param("per_page", "100");
			then.status(200).header("content-type", "application/json").body(r#"[{"id":1}]"#);
		})
		.await;
	let client = build_client(&server);
	let value = client
		.get("/v2/projects", [("page", "1"), ("per_page", "100")])
		.await
		.expect("GET should succeed.");

	assert_eq!(value, serde_json::json!([{ "id": 1 }]));

	client
		.get("/v2/projects", [("page", "1"), ("per_page", "100")])
		.await
		.expect("Second GET should reuse the token.");

	token.assert_calls_async(1).await;
	projects.assert_calls_async(2).await;
}

#[tokio::test]
async fn non_success_status_reports_the_error_field() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/projects/404");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"error":"not found"}"#);
		})
		.await;

	let err = build_client(&server)
		.get("/v2/projects/404", Vec::<(&str, &str)>::new())
		.await
		.expect_err("404 should fail.");

	match err {
		Error::ApiRequest { status, reason, .. } => {
			assert_eq!(status, Some(404));
			assert_eq!(reason, "not found");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn empty_error_bodies_fall_back_to_the_status_code() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/skills");
			then.status(503);
		})
		.await;

	let err = build_client(&server)
		.get("/v2/skills", Vec::<(&str, &str)>::new())
		.await
		.expect_err("503 should fail.");

	assert!(matches!(err, Error::ApiRequest { reason, .. } if reason == "status code 503"));
}

#[tokio::test]
async fn non_json_bodies_are_rejected() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/cursus");
			then.status(200).header("content-type", "text/html").body("<html>");
		})
		.await;

	let err = build_client(&server)
		.get("/v2/cursus", Vec::<(&str, &str)>::new())
		.await
		.expect_err("HTML should not decode.");

	assert!(matches!(err, Error::ApiRequest { reason, .. } if reason == "response not JSON"));
}

#[tokio::test]
async fn rejected_credentials_fail_with_the_provider_description() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error_description":"invalid_client"}"#);
		})
		.await;
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/projects");
			then.status(200).body("[]");
		})
		.await;
	let err = build_client(&server)
		.get("/v2/projects", Vec::<(&str, &str)>::new())
		.await
		.expect_err("Invalid credentials should fail.");

	assert!(matches!(err, Error::Authentication { reason } if reason == "invalid_client"));

	token.assert_calls_async(1).await;
	resource.assert_calls_async(0).await;
}

#[tokio::test]
async fn token_responses_without_token_type_are_accepted() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"typeless","expires_in":7200}"#);
		})
		.await;

	let skills = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/skills").header("authorization", "Bearer typeless");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let value = build_client(&server)
		.get("/v2/skills", Vec::<(&str, &str)>::new())
		.await
		.expect("A token without token_type should still authorize requests.");

	assert_eq!(value, serde_json::json!([]));

	skills.assert_calls_async(1).await;
}

#[tokio::test]
async fn typed_decoding_reports_the_failing_path() {
	#[derive(Debug, Deserialize)]
	#[allow(dead_code)]
	struct Project {
		id: u64,
		name: String,
	}

	let server = MockServer::start_async().await;

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/projects");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":1,"name":"libft"},{"id":2,"name":null}]"#);
		})
		.await;

	let client = build_client(&server);
	let err = client
		.get_as::<Vec<Project>, _, _, _>("/v2/projects", Vec::<(&str, &str)>::new())
		.await
		.expect_err("A null name should not decode.");

	match err {
		Error::Decode { source } => assert_eq!(source.path().to_string(), "[1].name"),
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn responses_consume_budget_even_when_they_fail() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/users");
			then.status(500).body("Internal Server Error");
		})
		.await;

	let client = build_client(&server);

	client.set_block_on_limit(false);

	let err = client
		.get("/v2/users", Vec::<(&str, &str)>::new())
		.await
		.expect_err("500 should fail.");

	assert!(matches!(err, Error::ApiRequest { reason, .. } if reason == "Internal Server Error"));
	assert_eq!(client.token_manager().occupied_slots(), 1);
}

#[tokio::test]
async fn transport_failures_release_their_slot() {
	let server = MockServer::start_async().await;

	mock_token(&server).await;

	let config = ClientConfig::new(Credentials::new("test-uid", "test-secret"))
		// Nothing listens on the discard port, so resource requests are refused.
		.with_base_url("http://127.0.0.1:9")
		.with_token_url(server.url("/oauth/token"))
		.with_block_on_limit(false);
	let client = ApiClient::new(config).expect("API client should build.");
	let err = client
		.get("/v2/projects", Vec::<(&str, &str)>::new())
		.await
		.expect_err("Unreachable resource endpoint should fail.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(client.token_manager().occupied_slots(), 0);
	assert!(client.token_manager().cached_token().await.is_some());
}
