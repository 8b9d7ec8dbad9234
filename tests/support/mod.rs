//! Mock put.io API helpers shared by the integration tests.

#![allow(dead_code)]

use putsync::Client;
use serde_json::{json, Value};
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn client_for(server: &MockServer) -> Client {
    Client::with_base_url(server.uri(), "test-token").expect("client builds")
}

pub fn crc_of(content: &[u8]) -> String {
    format!("{:08x}", crc32fast::hash(content))
}

pub fn dir_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "size": 0,
        "content_type": "application/x-directory",
        "crc32": null,
        "created_at": "2014-03-25T13:21:05",
    })
}

pub fn file_json(id: u64, name: &str, content: &[u8]) -> Value {
    json!({
        "id": id,
        "name": name,
        "size": content.len(),
        "content_type": "application/octet-stream",
        "crc32": crc_of(content),
        "created_at": "2014-03-25T13:21:05",
    })
}

pub fn sample_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

pub async fn mount_root(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/files/0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "OK", "file": dir_json(0, "Your Files")})),
        )
        .mount(server)
        .await;
}

/// Mounts a listing that must be requested exactly `times` times.
pub async fn mount_listing(server: &MockServer, parent_id: u64, children: Vec<Value>, times: u64) {
    Mock::given(method("GET"))
        .and(path("/files/list"))
        .and(query_param("parent_id", parent_id.to_string()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "files": children})),
        )
        .expect(times)
        .mount(server)
        .await;
}

pub async fn mount_attachment(server: &MockServer, id: u64, filename: &str, times: u64) {
    Mock::given(method("HEAD"))
        .and(path(format!("/files/{}/download", id)))
        .respond_with(ResponseTemplate::new(200).insert_header(
            "content-disposition",
            format!("attachment; filename=\"{}\"", filename).as_str(),
        ))
        .expect(times)
        .mount(server)
        .await;
}

pub async fn mount_body(server: &MockServer, id: u64, content: &[u8], times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{}/download", id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

pub async fn mount_delete(server: &MockServer, id: u64, times: u64) {
    Mock::given(method("POST"))
        .and(path("/files/delete"))
        .and(body_string(format!("file_ids={}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts a listing of `parent_id` that fails with an API error envelope.
pub async fn mount_failing_listing(server: &MockServer, parent_id: u64, status: u16, times: u64) {
    let error_type = if status == 401 { "invalid_grant" } else { "INTERNAL" };
    Mock::given(method("GET"))
        .and(path("/files/list"))
        .and(query_param("parent_id", parent_id.to_string()))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(json!({"status": "ERROR", "error_type": error_type})),
        )
        .expect(times)
        .mount(server)
        .await;
}
