//! HttpResolver and ConsoleApi against a mock console server: endpoint
//! routing per descriptor, envelope error mapping, and the list views.

use assert_matches::assert_matches;
use media_preview::{
    BackendKind, ConsoleApi, Error, HttpResolver, PlaybackResolver, SourceDescriptor,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn resolver_for(server: &MockServer) -> HttpResolver {
    HttpResolver::new(ConsoleApi::new(server.uri(), reqwest::Client::new()))
}

fn ok_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "result": result }))
}

#[tokio::test]
async fn test_device_resolves_to_progressive_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/url"))
        .and(query_param("deviceId", "cam1"))
        .respond_with(ok_result(json!({ "httpFlvUrl": "http://ms/live/cam1.flv" })))
        .expect(1)
        .mount(&server)
        .await;

    let resolved = resolver_for(&server)
        .await
        .resolve(&SourceDescriptor::Device {
            device_id: "cam1".to_string(),
        })
        .await
        .unwrap();

    let (kind, url) = resolved.backend().unwrap();
    assert_eq!(kind, BackendKind::Flv);
    assert_eq!(url, "http://ms/live/cam1.flv");
}

#[tokio::test]
async fn test_rtc_session_resolves_to_signaling_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rtc/session/url"))
        .and(query_param("sessionId", "s42"))
        .respond_with(ok_result(json!({ "rtcUrl": "http://ms/whep/s42" })))
        .mount(&server)
        .await;

    let resolved = resolver_for(&server)
        .await
        .resolve(&SourceDescriptor::WebrtcSession {
            session_id: "s42".to_string(),
        })
        .await
        .unwrap();

    let (kind, url) = resolved.backend().unwrap();
    assert_eq!(kind, BackendKind::Whep);
    assert_eq!(url, "http://ms/whep/s42");
}

#[tokio::test]
async fn test_rtmp_and_file_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rtmp/stream/url"))
        .and(query_param("stream", "live/abc"))
        .respond_with(ok_result(json!({ "httpFlvUrl": "http://ms/live/abc.flv" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file/url"))
        .and(query_param("fileId", "f7"))
        .respond_with(ok_result(json!({ "httpFlvUrl": "http://ms/vod/f7.flv" })))
        .mount(&server)
        .await;

    let resolver = resolver_for(&server).await;
    let stream = resolver
        .resolve(&SourceDescriptor::RtmpStream {
            stream: "live/abc".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(
        stream.progressive_url.as_deref(),
        Some("http://ms/live/abc.flv")
    );

    let file = resolver
        .resolve(&SourceDescriptor::File {
            file_id: "f7".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(file.progressive_url.as_deref(), Some("http://ms/vod/f7.flv"));
}

#[tokio::test]
async fn test_gb_record_posts_time_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gb/record/url"))
        .and(body_partial_json(json!({
            "deviceId": "34020000001320000001",
            "startTime": "2025-01-01T00:00:00",
            "endTime": "2025-01-01T01:00:00",
            "type": "time",
        })))
        .respond_with(ok_result(json!({ "httpFlvUrl": "http://ms/record/r1.flv" })))
        .expect(1)
        .mount(&server)
        .await;

    let resolved = resolver_for(&server)
        .await
        .resolve(&SourceDescriptor::GbRecord {
            device_id: "34020000001320000001".to_string(),
            start_time: "2025-01-01T00:00:00".to_string(),
            end_time: "2025-01-01T01:00:00".to_string(),
            record_type: "time".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        resolved.progressive_url.as_deref(),
        Some("http://ms/record/r1.flv")
    );
}

#[tokio::test]
async fn test_error_code_maps_to_resolution_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/url"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": -1, "msg": "device offline" })),
        )
        .mount(&server)
        .await;

    let err = resolver_for(&server)
        .await
        .resolve(&SourceDescriptor::Device {
            device_id: "cam1".to_string(),
        })
        .await
        .unwrap_err();

    assert_matches!(&err, Error::ResolutionFailed(msg) if msg.contains("device offline"));
}

#[tokio::test]
async fn test_result_without_urls_fails_backend_selection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/url"))
        .respond_with(ok_result(json!({})))
        .mount(&server)
        .await;

    let resolved = resolver_for(&server)
        .await
        .resolve(&SourceDescriptor::Device {
            device_id: "cam1".to_string(),
        })
        .await
        .unwrap();

    assert_matches!(resolved.backend(), Err(Error::ResolutionFailed(_)));
}

#[tokio::test]
async fn test_list_endpoints_deserialize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device"))
        .respond_with(ok_result(json!([
            { "deviceId": "cam1", "name": "Gate", "protocol": 1, "status": "online" },
            { "deviceId": "cam2" },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rtc/session"))
        .respond_with(ok_result(json!([
            { "sessionId": "s42", "videoCodec": "H264", "audioCodec": "opus" },
        ])))
        .mount(&server)
        .await;

    let api = ConsoleApi::new(server.uri(), reqwest::Client::new());

    let devices = api.devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_id, "cam1");
    assert_eq!(devices[0].status.as_deref(), Some("online"));
    assert!(devices[1].name.is_none());

    let sessions = api.webrtc_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, "s42");
    assert_eq!(sessions[0].video_codec.as_deref(), Some("H264"));
}
