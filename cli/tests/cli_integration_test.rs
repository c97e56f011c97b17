use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use ghostlink_cli::args::{Cli, Commands, InputMode};
use ghostlink_cli::server::{router, AppState, DecodeResponse, EncodeResponse};
use ghostlink_core::{BitDepth, Channels, Density, JsonDedupStore, MixProfile};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn test_app(root: &Path) -> axum::Router {
    let store = JsonDedupStore::open(root.join("history.json")).expect("Failed to open store");
    router(AppState::new(store, root.join("uploads")))
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_parse_encode_defaults() {
    let cli = Cli::try_parse_from(["ghostlink", "encode", "text", "hello", "out"]).unwrap();
    assert!(!cli.verbose);
    let Commands::Encode { mode, input, outdir, out_name, history, params } = cli.command else {
        panic!("expected encode");
    };
    assert_eq!(mode, InputMode::Text);
    assert_eq!(input, "hello");
    assert_eq!(outdir, Path::new("out"));
    assert!(out_name.is_none());
    assert_eq!(history, Path::new("ghostlink_history.json"));

    let config = params.to_config().unwrap();
    assert_eq!(config, ghostlink_core::EncodeConfig::default());
}

#[test]
fn test_parse_encode_options() {
    let cli = Cli::try_parse_from([
        "ghostlink", "-v", "encode", "file", "note.txt", "out",
        "--samplerate", "44100", "--baud", "120", "--amp", "0.1",
        "--sparse", "--mix-profile", "studio", "--interleave", "8",
        "--repeats", "3", "--gap", "2.5", "--ramp", "0",
        "--bit-depth", "24", "--channels", "2", "--slow-variants",
        "--out-name", "drop",
    ])
    .unwrap();
    assert!(cli.verbose);
    let Commands::Encode { params, out_name, .. } = cli.command else {
        panic!("expected encode");
    };
    assert_eq!(out_name.as_deref(), Some("drop"));

    let config = params.to_config().unwrap();
    assert_eq!(config.sample_rate, 44100);
    assert_eq!(config.baud, 120.0);
    assert_eq!(config.density, Density::Sparse);
    assert_eq!(config.mix_profile, MixProfile::Studio);
    assert_eq!(config.interleave_depth, 8);
    assert_eq!(config.repeats, 3);
    assert_eq!(config.gap_ms, 2.5);
    assert_eq!(config.ramp_ms, 0.0);
    assert_eq!(config.bit_depth, BitDepth::Pcm24);
    assert_eq!(config.channels, Channels::Stereo);
    assert!(config.slow_variants);
}

#[test]
fn test_parse_rejects_bad_arguments() {
    assert!(Cli::try_parse_from(["ghostlink", "encode", "text", "x", "out", "--dense", "--sparse"]).is_err());
    assert!(Cli::try_parse_from(["ghostlink", "encode", "text", "x", "out", "--mix-profile", "club"]).is_err());
    assert!(Cli::try_parse_from(["ghostlink", "encode", "stdin", "x", "out"]).is_err());
    assert!(Cli::try_parse_from(["ghostlink", "encode", "text", "x", "out", "--channels", "3"]).is_err());
}

#[test]
fn test_out_of_range_values_fail_validation() {
    let cli = Cli::try_parse_from(["ghostlink", "encode", "text", "x", "out", "--bit-depth", "20"]).unwrap();
    let Commands::Encode { params, .. } = cli.command else {
        panic!("expected encode");
    };
    assert!(params.to_config().is_err());

    let cli = Cli::try_parse_from(["ghostlink", "decode", "in.wav", "--interleave", "0"]).unwrap();
    let Commands::Decode { params, .. } = cli.command else {
        panic!("expected decode");
    };
    assert!(params.to_config().is_err());
}

#[test]
fn test_parse_decode_and_serve() {
    let cli = Cli::try_parse_from(["ghostlink", "decode", "in.wav", "--sparse", "--repeats", "1"]).unwrap();
    let Commands::Decode { wav, params } = cli.command else {
        panic!("expected decode");
    };
    assert_eq!(wav, Path::new("in.wav"));
    let config = params.to_config().unwrap();
    assert_eq!(config.density, Density::Sparse);
    assert_eq!(config.repeats, 1);

    let cli = Cli::try_parse_from(["ghostlink", "serve", "--addr", "0.0.0.0:9000"]).unwrap();
    let Commands::Serve { addr, .. } = cli.command else {
        panic!("expected serve");
    };
    assert_eq!(addr.port(), 9000);
}

#[tokio::test]
async fn test_health() {
    let dir = tempdir().unwrap();
    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let response = test_app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_encode_then_decode_over_http() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let params = json!({
        "samplerate": 16000,
        "baud": 200,
        "preamble": 0.5,
        "interleave": 2,
        "repeats": 1,
    });

    let mut encode_body = json!({
        "mode": "text",
        "text": "over the wire",
        "output_dir": out_dir,
    });
    encode_body.as_object_mut().unwrap().extend(params.as_object().unwrap().clone());

    let (status, body) = post_json(test_app(dir.path()), "/api/encode", encode_body.clone()).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let encoded: EncodeResponse = serde_json::from_value(body).unwrap();
    assert!(encoded.success);
    assert_eq!(encoded.files.len(), 1);
    assert!(encoded.skipped.is_empty());

    // same content again is served from the dedup history
    let (_, body) = post_json(test_app(dir.path()), "/api/encode", encode_body).await;
    let again: EncodeResponse = serde_json::from_value(body).unwrap();
    assert_eq!(again.skipped, encoded.files);

    let wav = fs::read(&encoded.files[0]).unwrap();
    let mut decode_body = json!({ "audio_base64": STANDARD.encode(wav) });
    decode_body.as_object_mut().unwrap().extend(params.as_object().unwrap().clone());
    decode_body.as_object_mut().unwrap().remove("samplerate");

    let (status, body) = post_json(test_app(dir.path()), "/api/decode", decode_body).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let decoded: DecodeResponse = serde_json::from_value(body).unwrap();
    assert_eq!(decoded.decoded_text.as_deref(), Some("over the wire"));
    assert_eq!(decoded.decoded_hex, "6f766572207468652077697265");

    // uploads are cleaned up
    let leftovers = fs::read_dir(dir.path().join("uploads")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_encode_rejects_bad_requests() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");

    let (status, body) = post_json(
        test_app(dir.path()),
        "/api/encode",
        json!({ "mode": "text", "output_dir": out_dir }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = post_json(
        test_app(dir.path()),
        "/api/encode",
        json!({ "mode": "dir", "input_dir": dir.path(), "output_dir": out_dir, "custom_filename": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        test_app(dir.path()),
        "/api/encode",
        json!({ "mode": "text", "text": "hi", "output_dir": out_dir, "baud": 5000 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_decode_rejects_bad_audio() {
    let dir = tempdir().unwrap();

    let (status, _) = post_json(
        test_app(dir.path()),
        "/api/decode",
        json!({ "audio_base64": "***not base64***" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        test_app(dir.path()),
        "/api/decode",
        json!({ "audio_base64": STANDARD.encode(b"RIFF but not really") }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
