#![allow(clippy::unwrap_used)]
// Integration tests for `SurveillanceClient` and `StreamClient` using wiremock.

use std::time::Duration;

use futures_util::StreamExt;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sstation_api::{Error, MotionSource, StreamClient, SurveillanceClient};

// ── Helpers ─────────────────────────────────────────────────────────

const ENTRY: &str = "/webapi/entry.cgi";

async fn setup() -> (MockServer, SurveillanceClient) {
    let server = MockServer::start().await;
    let client = SurveillanceClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        "admin".into(),
        SecretString::from("secret".to_string()),
    );
    (server, client)
}

fn api_info() -> serde_json::Value {
    let entry = |max: u32| json!({ "path": "entry.cgi", "minVersion": 1, "maxVersion": max });
    json!({
        "success": true,
        "data": {
            "SYNO.API.Auth": entry(7),
            "SYNO.SurveillanceStation.Camera": entry(9),
            "SYNO.SurveillanceStation.Camera.Event": entry(1),
            "SYNO.SurveillanceStation.HomeMode": entry(1),
            "SYNO.SurveillanceStation.VideoStreaming": entry(1),
        }
    })
}

async fn mount_discovery(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .and(query_param("api", "SYNO.API.Info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_info()))
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, sid: &str) {
    Mock::given(method("POST"))
        .and(path(ENTRY))
        .and(body_string_contains("method=Login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": { "sid": sid } })),
        )
        .mount(server)
        .await;
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn fail(code: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": { "code": code } }))
}

fn api_call(api: &str, api_method: &str) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path(ENTRY))
        .and(query_param("api", api))
        .and(query_param("method", api_method))
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_discovers_and_logs_in() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;

    Mock::given(method("POST"))
        .and(path(ENTRY))
        .and(body_string_contains("method=Login"))
        .and(body_string_contains("account=admin"))
        .and(body_string_contains("session=SurveillanceStation"))
        .and(body_string_contains("format=sid"))
        .and(body_string_contains("version=6"))
        .respond_with(ok(json!({ "sid": "abc" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client.authenticate().await.unwrap();

    assert!(client.has_session());
    assert_eq!(session.catalog().len(), 5);
}

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;

    Mock::given(method("POST"))
        .and(path(ENTRY))
        .respond_with(fail(400))
        .mount(&server)
        .await;

    let result = client.authenticate().await;

    assert!(
        matches!(result, Err(Error::Authentication { code: Some(400), .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_expired_session_triggers_one_relogin() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;

    Mock::given(method("POST"))
        .and(path(ENTRY))
        .and(body_string_contains("method=Login"))
        .respond_with(ok(json!({ "sid": "first" })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, "second").await;

    api_call("SYNO.SurveillanceStation.Camera", "List")
        .and(query_param("_sid", "first"))
        .respond_with(fail(119))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.SurveillanceStation.Camera", "List")
        .and(query_param("_sid", "second"))
        .respond_with(ok(json!({ "cameras": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let cameras = client.list_cameras().await.unwrap();
    assert!(cameras.is_empty());
}

#[tokio::test]
async fn test_expired_session_is_not_retried_twice() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.HomeMode", "GetInfo")
        .respond_with(fail(106))
        .expect(2)
        .mount(&server)
        .await;

    let result = client.home_mode().await;
    assert!(matches!(result, Err(Error::SessionExpired { code: 106 })));
}

#[tokio::test]
async fn test_concurrent_first_calls_share_one_login() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_info()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENTRY))
        .respond_with(ok(json!({ "sid": "shared" })).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.SurveillanceStation.HomeMode", "GetInfo")
        .and(query_param("_sid", "shared"))
        .respond_with(ok(json!({ "on": true })))
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(client.home_mode(), client.home_mode());
    assert!(a.unwrap());
    assert!(b.unwrap());
}

#[tokio::test]
async fn test_logout_clears_session() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.API.Auth", "Logout")
        .and(query_param("_sid", "sid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.authenticate().await.unwrap();
    client.logout().await.unwrap();
    assert!(!client.has_session());

    // A second logout is a no-op.
    client.logout().await.unwrap();
}

// ── Camera tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_cameras() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.Camera", "List")
        .and(query_param("version", "9"))
        .and(query_param("_sid", "sid"))
        .respond_with(ok(json!({
            "cameras": [
                { "id": 1, "newName": "Front Door", "enabled": true, "recStatus": 0 },
                { "id": 2, "name": "Garage", "enabled": false, "recStatus": 1 }
            ]
        })))
        .mount(&server)
        .await;

    let cameras = client.list_cameras().await.unwrap();

    assert_eq!(cameras.len(), 2);
    assert_eq!(cameras[0].display_name(), "Front Door");
    assert!(cameras[0].enabled);
    assert!(!cameras[0].is_recording());
    assert_eq!(cameras[1].display_name(), "Garage");
    assert!(cameras[1].is_recording());
}

#[tokio::test]
async fn test_get_camera_missing_id() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.Camera", "GetInfo")
        .and(query_param("cameraIds", "7"))
        .respond_with(ok(json!({ "cameras": [] })))
        .mount(&server)
        .await;

    let result = client.get_camera(7).await;
    assert!(matches!(result, Err(Error::CameraNotFound { camera_id: 7 })));
}

#[tokio::test]
async fn test_fetch_image_returns_raw_bytes() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.Camera", "GetSnapshot")
        .and(query_param("cameraId", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"\xff\xd8jpeg\xff\xd9"[..], "image/jpeg"))
        .mount(&server)
        .await;

    let image = client.fetch_image(3).await.unwrap();
    assert_eq!(&image[..], b"\xff\xd8jpeg\xff\xd9");
}

#[tokio::test]
async fn test_fetch_image_error_envelope() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.Camera", "GetSnapshot")
        .respond_with(fail(401))
        .mount(&server)
        .await;

    let result = client.fetch_image(3).await;
    assert!(matches!(result, Err(Error::Api { code: 401, .. })));
}

#[tokio::test]
async fn test_video_stream_url_carries_session() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    let url = client.video_stream_url(4).await.unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert_eq!(url.path(), ENTRY);
    assert!(pairs.contains(&("api".into(), "SYNO.SurveillanceStation.VideoStreaming".into())));
    assert!(pairs.contains(&("method".into(), "Stream".into())));
    assert!(pairs.contains(&("format".into(), "mjpeg".into())));
    assert!(pairs.contains(&("cameraId".into(), "4".into())));
    assert!(pairs.contains(&("_sid".into(), "sid".into())));
}

// ── Motion detection tests ──────────────────────────────────────────

#[tokio::test]
async fn test_motion_setting() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.Camera.Event", "MotionEnum")
        .and(query_param("camId", "1"))
        .respond_with(ok(json!({ "MDParam": { "source": -1 } })))
        .mount(&server)
        .await;

    let setting = client.motion_setting(1).await.unwrap();
    assert_eq!(setting.source, MotionSource::Disabled);
    assert!(!setting.is_enabled());
}

#[tokio::test]
async fn test_set_motion_detection() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.Camera.Event", "MDParamSave")
        .and(query_param("camId", "1"))
        .and(query_param("source", "1"))
        .and(query_param("keep", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.SurveillanceStation.Camera.Event", "MDParamSave")
        .and(query_param("source", "-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.set_motion_detection(1, true).await.unwrap();
    client.set_motion_detection(1, false).await.unwrap();
}

// ── Home mode tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_set_home_mode_reads_back() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.HomeMode", "Switch")
        .and(query_param("on", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.SurveillanceStation.HomeMode", "GetInfo")
        .respond_with(ok(json!({ "on": false })))
        .expect(1)
        .mount(&server)
        .await;

    // The appliance did not apply the change; the client reports what it saw.
    assert!(!client.set_home_mode(true).await.unwrap());
}

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;
    mount_discovery(&server).await;
    mount_login(&server, "sid").await;

    api_call("SYNO.SurveillanceStation.HomeMode", "GetInfo")
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = client.home_mode().await;
    assert!(matches!(result, Err(Error::Http { status: 502, .. })));
}

#[tokio::test]
async fn test_missing_api_is_unsupported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "SYNO.API.Auth": { "path": "entry.cgi", "minVersion": 1, "maxVersion": 7 } }
        })))
        .mount(&server)
        .await;
    mount_login(&server, "sid").await;

    let result = client.home_mode().await;
    assert!(matches!(result, Err(Error::UnsupportedApi(_))));
}

// ── Stream tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_stream_client_decodes_frames() {
    let server = MockServer::start().await;
    let body = b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\n\r\none\r\n\
--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\n\r\ntwo\r\n--frame--\r\n";

    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(&body[..], "multipart/x-mixed-replace; boundary=frame"),
        )
        .mount(&server)
        .await;

    let streams = StreamClient::with_client(reqwest::Client::new(), Duration::from_secs(5));
    let url = Url::parse(&format!("{}/live", server.uri())).unwrap();
    let stream = streams.open(url).await.unwrap();
    assert_eq!(stream.boundary(), "frame");

    let frames: Vec<_> = stream.collect().await;
    let bodies: Vec<Vec<u8>> = frames.into_iter().map(|f| f.unwrap().data.to_vec()).collect();
    assert_eq!(bodies, vec![b"one".to_vec(), b"two".to_vec()]);
}

#[tokio::test]
async fn test_stream_client_rejects_non_multipart() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"<html>"[..], "text/html"))
        .mount(&server)
        .await;

    let streams = StreamClient::with_client(reqwest::Client::new(), Duration::from_secs(5));
    let result = streams.open(Url::parse(&server.uri()).unwrap()).await;
    assert!(matches!(result, Err(Error::Stream(_))));
}

#[tokio::test]
async fn test_stream_client_rejects_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let streams = StreamClient::with_client(reqwest::Client::new(), Duration::from_secs(5));
    let result = streams.open(Url::parse(&server.uri()).unwrap()).await;
    assert!(matches!(result, Err(Error::Http { status: 404, .. })));
}

#[tokio::test]
async fn test_stream_client_open_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let streams = StreamClient::with_client(reqwest::Client::new(), Duration::from_millis(100));
    let result = streams.open(Url::parse(&server.uri()).unwrap()).await;
    assert!(matches!(result, Err(Error::Timeout { .. })));
}
