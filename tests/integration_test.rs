//! 整合測試 - 以假解碼面與假傳輸層驗證預測流程
//!
//! 不需要 ffmpeg 或偵測服務

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{
    Harness, IMAGE_FAKE, ScriptedTransport, StubMedia, StubOpener, VIDEO_REAL, ok, wait_for_state,
};
use deepfake_probe::component::media_ingestion::MediaFile;
use deepfake_probe::component::prediction_orchestrator::{
    Label, OrchestrationState, OrchestratorOptions, PredictOutcome, RawResponse,
};
use deepfake_probe::config::{DetectionConfig, MAX_SAMPLE_COUNT, MediaKind, ModelVariant};
use deepfake_probe::error::{PredictionError, SamplingError, ValidationError};
use tokio::sync::Notify;

/// 測試 1: 進行中重複呼叫 predict() 只會送出一個請求
#[tokio::test]
async fn test_repeated_predict_issues_one_request() {
    let gate = Arc::new(Notify::new());
    let harness = Harness::new(
        StubOpener::default(),
        ScriptedTransport::new(vec![ok(IMAGE_FAKE)]).gated(Arc::clone(&gate)),
    );
    let path = harness.media("face.png");
    let orchestrator = &harness.orchestrator;
    orchestrator
        .select_file(&MediaFile::new(&path), MediaKind::Image)
        .unwrap();

    let (first, second, third, ()) = tokio::join!(
        orchestrator.predict(),
        orchestrator.predict(),
        orchestrator.predict(),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            gate.notify_one();
        }
    );

    assert_eq!(first, PredictOutcome::Succeeded);
    assert_eq!(second, PredictOutcome::AlreadyRunning);
    assert_eq!(third, PredictOutcome::AlreadyRunning);
    assert_eq!(harness.request_count(), 1, "應該只送出一個請求");

    // 成功後再次 predict 也不會送出
    assert_eq!(orchestrator.predict().await, PredictOutcome::Ignored);
    assert_eq!(harness.request_count(), 1);
}

/// 測試 2: 圖片偽造回應
#[tokio::test]
async fn test_image_fake_response_succeeds() {
    let harness = Harness::new(
        StubOpener::default(),
        ScriptedTransport::new(vec![ok(IMAGE_FAKE)]),
    );
    let path = harness.media("face.jpg");
    let orchestrator = &harness.orchestrator;
    let info = orchestrator
        .select_file(&MediaFile::new(&path), MediaKind::Image)
        .unwrap();

    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);
    assert_eq!(orchestrator.state(), OrchestrationState::Succeeded);

    let result = orchestrator.result().unwrap();
    assert_eq!(result.asset_id, info.id);
    assert_eq!(result.overall_label, Label::Fake);
    assert_eq!(result.confidence, Some(0.93));
    assert!(result.preview_frames.is_empty(), "圖片不取樣");
    assert_eq!(harness.surfaces_opened.load(Ordering::SeqCst), 0);

    let requests = harness.requests.lock().unwrap();
    assert_eq!(requests[0].kind, MediaKind::Image);
    assert_eq!(requests[0].form_fields(), vec![("model_type", "knn".to_string())]);
}

/// 測試 3: 缺少 is_fake 欄位
#[tokio::test]
async fn test_missing_is_fake_fails_with_malformed() {
    let harness = Harness::new(
        StubOpener::default(),
        ScriptedTransport::new(vec![ok(
            r#"{"result":{"prediction":"fake","confidence":0.93},"model_used":"knn"}"#,
        )]),
    );
    let path = harness.media("face.jpg");
    let orchestrator = &harness.orchestrator;
    orchestrator
        .select_file(&MediaFile::new(&path), MediaKind::Image)
        .unwrap();

    let outcome = orchestrator.predict().await;

    assert!(matches!(
        outcome,
        PredictOutcome::Failed(PredictionError::MalformedResponse(_))
    ));
    assert_eq!(orchestrator.state(), OrchestrationState::Failed);
    assert!(orchestrator.result().is_none());
    assert!(matches!(
        orchestrator.last_error(),
        Some(PredictionError::MalformedResponse(_))
    ));
}

/// 測試 4: 取樣途中替換媒體，舊媒體的影格不會出現在之後的結果
#[tokio::test]
async fn test_replace_asset_mid_sampling_discards_old_frames() {
    let opener = StubOpener::new(&[
        (
            "long.mp4",
            StubMedia {
                duration: 100.0,
                block_at_seek: Some(2),
                ..StubMedia::default()
            },
        ),
        ("short.mp4", StubMedia::video(10.0)),
    ]);
    let harness = Harness::new(opener, ScriptedTransport::new(vec![ok(VIDEO_REAL)]));
    let long = harness.media("long.mp4");
    let short = harness.media("short.mp4");
    let orchestrator = Arc::clone(&harness.orchestrator);
    let mut states = orchestrator.subscribe();

    orchestrator
        .select_file(&MediaFile::new(&long), MediaKind::Video)
        .unwrap();
    let stale = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.predict().await }
    });

    wait_for_state(&mut states, OrchestrationState::Sampling).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let replacement = orchestrator
        .select_file(&MediaFile::new(&short), MediaKind::Video)
        .unwrap();
    assert_eq!(stale.await.unwrap(), PredictOutcome::Superseded);
    assert_eq!(orchestrator.state(), OrchestrationState::AwaitingFile);
    assert_eq!(harness.request_count(), 0, "被取代的取樣不應送出請求");

    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);
    let result = orchestrator.result().unwrap();

    assert_eq!(result.asset_id, replacement.id);
    assert_eq!(result.preview_frames.len(), 3);
    for (index, frame) in result.preview_frames.iter().enumerate() {
        assert_eq!(frame.index, index);
        assert!(frame.timestamp_seconds < 10.0, "影格來自舊媒體");
    }
    assert_eq!(harness.request_count(), 1);
    assert_eq!(
        harness.surface_releases.load(Ordering::SeqCst),
        harness.surfaces_opened.load(Ordering::SeqCst),
        "每個解碼面都應該被釋放"
    );
}

/// 測試 5: 預覽 handle 在替換、成功、失敗、中止時都恰好釋放一次
#[tokio::test]
async fn test_preview_released_exactly_once() {
    let opener = StubOpener::new(&[(
        "stuck.mp4",
        StubMedia {
            duration: 30.0,
            block_at_seek: Some(1),
            ..StubMedia::default()
        },
    )]);
    let transport = ScriptedTransport::new(vec![
        ok(IMAGE_FAKE),
        Err(PredictionError::Network("connection reset".to_string())),
    ]);
    let harness = Harness::new(opener, transport);
    let orchestrator = Arc::clone(&harness.orchestrator);
    let previews = Arc::clone(&harness.previews);

    // 替換
    orchestrator
        .select_file(&MediaFile::new(harness.media("a.jpg")), MediaKind::Image)
        .unwrap();
    let replaced = orchestrator.preview_id().unwrap();
    orchestrator
        .select_file(&MediaFile::new(harness.media("b.jpg")), MediaKind::Image)
        .unwrap();
    assert_eq!(previews.release_count(replaced), 1);

    // 成功：預覽交給結果畫面，重設時才釋放
    let succeeded = orchestrator.preview_id().unwrap();
    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);
    assert_eq!(orchestrator.preview_id(), Some(succeeded));
    assert!(orchestrator.retained_preview_uri().is_some());
    assert_eq!(previews.release_count(succeeded), 0);
    orchestrator.reset();
    assert_eq!(previews.release_count(succeeded), 1);

    // 失敗：結算時立即釋放
    orchestrator
        .select_file(&MediaFile::new(harness.media("c.png")), MediaKind::Image)
        .unwrap();
    let failed = orchestrator.preview_id().unwrap();
    assert!(matches!(
        orchestrator.predict().await,
        PredictOutcome::Failed(PredictionError::Network(_))
    ));
    assert_eq!(previews.release_count(failed), 1);

    // 中止
    let mut states = orchestrator.subscribe();
    orchestrator
        .select_file(&MediaFile::new(harness.media("stuck.mp4")), MediaKind::Video)
        .unwrap();
    assert_eq!(previews.release_count(failed), 1, "不應重複釋放");
    let abandoned = orchestrator.preview_id().unwrap();
    let running = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.predict().await }
    });
    wait_for_state(&mut states, OrchestrationState::Sampling).await;

    assert!(orchestrator.abandon());
    assert_eq!(running.await.unwrap(), PredictOutcome::Superseded);
    assert_eq!(previews.release_count(abandoned), 1);
    assert_eq!(orchestrator.state(), OrchestrationState::Idle);
    assert!(!orchestrator.abandon(), "閒置時不需中止");

    for id in [replaced, succeeded, failed, abandoned] {
        assert_eq!(previews.release_count(id), 1);
    }
    assert_eq!(previews.live_count(), 0);
    assert_eq!(harness.surface_releases.load(Ordering::SeqCst), 1);
}

/// 測試 6: 非 2xx 與網路錯誤進入 Failed，使用者可手動重試
#[tokio::test]
async fn test_server_error_then_manual_retry() {
    let harness = Harness::new(
        StubOpener::new(&[("clip.mp4", StubMedia::video(8.0))]),
        ScriptedTransport::new(vec![
            Ok(RawResponse::new(
                400,
                r#"{"detail":"frame_rate must be between 0 and 60 fps"}"#,
            )),
            Err(PredictionError::Network("request timed out".to_string())),
            ok(VIDEO_REAL),
        ]),
    );
    let orchestrator = &harness.orchestrator;
    orchestrator
        .select_file(&MediaFile::new(harness.media("clip.mp4")), MediaKind::Video)
        .unwrap();

    assert_eq!(
        orchestrator.predict().await,
        PredictOutcome::Failed(PredictionError::Server {
            status: 400,
            detail: "frame_rate must be between 0 and 60 fps".to_string()
        })
    );
    assert_eq!(orchestrator.state(), OrchestrationState::Failed);

    assert!(matches!(
        orchestrator.predict().await,
        PredictOutcome::Failed(PredictionError::Network(_))
    ));

    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);
    assert!(orchestrator.last_error().is_none());
    assert_eq!(harness.request_count(), 3);
    assert_eq!(
        orchestrator.result().unwrap().processing_info.unwrap().frames_extracted,
        10
    );
}

/// 測試 7: 取樣失敗不阻擋送出
#[tokio::test]
async fn test_sampling_failure_still_submits() {
    let opener = StubOpener::new(&[(
        "broken.mp4",
        StubMedia {
            duration: 12.0,
            fail_at_seek: Some(2),
            ..StubMedia::default()
        },
    )]);
    let harness = Harness::new(opener, ScriptedTransport::new(vec![ok(VIDEO_REAL)]));
    let orchestrator = &harness.orchestrator;
    orchestrator
        .select_file(&MediaFile::new(harness.media("broken.mp4")), MediaKind::Video)
        .unwrap();

    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);

    let result = orchestrator.result().unwrap();
    assert_eq!(result.preview_frames.len(), 1);
    assert!(matches!(
        orchestrator.sampling_warning(),
        Some(SamplingError::Seek { .. })
    ));
    assert_eq!(harness.surface_releases.load(Ordering::SeqCst), 1);
}

/// 測試 8: 無法開啟解碼面時以零張影格繼續
#[tokio::test]
async fn test_unopenable_video_degrades_to_no_frames() {
    let harness = Harness::new(
        StubOpener::default(),
        ScriptedTransport::new(vec![ok(VIDEO_REAL)]),
    );
    let orchestrator = &harness.orchestrator;
    orchestrator
        .select_file(&MediaFile::new(harness.media("mystery.webm")), MediaKind::Video)
        .unwrap();

    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);
    assert!(orchestrator.result().unwrap().preview_frames.is_empty());
    assert!(matches!(
        orchestrator.sampling_warning(),
        Some(SamplingError::Open(_))
    ));
}

/// 測試 9: 偵測參數隨請求送出
#[tokio::test]
async fn test_detection_config_travels_with_request() {
    let harness = Harness::new(
        StubOpener::new(&[("clip.mp4", StubMedia::video(4.0))]),
        ScriptedTransport::new(vec![ok(VIDEO_REAL)]),
    );
    let orchestrator = &harness.orchestrator;
    orchestrator.select_model(ModelVariant::Svm);
    orchestrator.select_frame_rate(None).unwrap();
    orchestrator.select_max_frames(64).unwrap();
    assert!(matches!(
        orchestrator.select_max_frames(0),
        Err(ValidationError::InvalidParameter { name: "max_frames", .. })
    ));

    orchestrator
        .select_file(&MediaFile::new(harness.media("clip.mp4")), MediaKind::Video)
        .unwrap();
    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);

    let requests = harness.requests.lock().unwrap();
    assert_eq!(
        requests[0].form_fields(),
        vec![
            ("model_type", "svm".to_string()),
            ("max_frames", "64".to_string()),
        ]
    );
}

/// 測試 10: 沒有媒體或驗證失敗時狀態不變
#[tokio::test]
async fn test_predict_requires_valid_asset() {
    let harness = Harness::new(
        StubOpener::default(),
        ScriptedTransport::new(Vec::new()),
    );
    let orchestrator = &harness.orchestrator;

    assert_eq!(orchestrator.predict().await, PredictOutcome::NoAsset);

    let err = orchestrator
        .select_file(&MediaFile::new(harness.media("notes.txt")), MediaKind::Video)
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidFileType { .. }));
    assert_eq!(orchestrator.state(), OrchestrationState::Idle);
    assert_eq!(harness.previews.live_count(), 0);
    assert_eq!(harness.request_count(), 0);
}

/// 測試 11: 不保留預覽時，成功後立即釋放
#[tokio::test]
async fn test_preview_not_retained_when_disabled() {
    let harness = Harness::with_options(
        StubOpener::default(),
        ScriptedTransport::new(vec![ok(IMAGE_FAKE)]),
        OrchestratorOptions {
            retain_preview: false,
            ..OrchestratorOptions::default()
        },
    );
    let orchestrator = &harness.orchestrator;
    orchestrator
        .select_file(&MediaFile::new(harness.media("face.webp")), MediaKind::Image)
        .unwrap();
    let id = orchestrator.preview_id().unwrap();

    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);
    assert!(orchestrator.retained_preview_uri().is_none());
    assert_eq!(harness.previews.release_count(id), 1);

    orchestrator.reset();
    assert_eq!(harness.previews.release_count(id), 1);
}

/// 測試 12: 等待服務回應時替換媒體，舊回應不會成為新媒體的結果
#[tokio::test]
async fn test_replace_asset_while_submitting_discards_response() {
    let gate = Arc::new(Notify::new());
    let harness = Harness::new(
        StubOpener::default(),
        ScriptedTransport::new(vec![ok(IMAGE_FAKE), ok(IMAGE_FAKE)]).gated(Arc::clone(&gate)),
    );
    let orchestrator = Arc::clone(&harness.orchestrator);
    let mut states = orchestrator.subscribe();

    orchestrator
        .select_file(&MediaFile::new(harness.media("first.jpg")), MediaKind::Image)
        .unwrap();
    let first_preview = orchestrator.preview_id().unwrap();
    let stale = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.predict().await }
    });
    wait_for_state(&mut states, OrchestrationState::Submitting).await;

    let replacement = orchestrator
        .select_file(&MediaFile::new(harness.media("second.jpg")), MediaKind::Image)
        .unwrap();
    gate.notify_one();

    assert_eq!(stale.await.unwrap(), PredictOutcome::Superseded);
    assert_eq!(orchestrator.state(), OrchestrationState::AwaitingFile);
    assert!(orchestrator.result().is_none());
    assert!(orchestrator.last_error().is_none());
    assert_eq!(orchestrator.asset().unwrap().id, replacement.id);
    assert_eq!(harness.previews.release_count(first_preview), 1);
    assert_eq!(harness.request_count(), 1);
}

/// 測試 13: 超出範圍的參數在建立與設定時都會被擋下
#[tokio::test]
async fn test_out_of_range_options_never_reach_request() {
    let harness = Harness::with_options(
        StubOpener::new(&[("clip.mp4", StubMedia::video(4.0))]),
        ScriptedTransport::new(vec![ok(VIDEO_REAL)]),
        OrchestratorOptions {
            config: DetectionConfig {
                model_variant: ModelVariant::Svm,
                frame_rate: Some(500.0),
                max_frames: 0,
            },
            sample_count: 10_000,
            retain_preview: true,
        },
    );
    let orchestrator = &harness.orchestrator;

    assert_eq!(orchestrator.options().sample_count, 9);
    assert!(matches!(
        orchestrator.set_sample_count(MAX_SAMPLE_COUNT + 1),
        Err(ValidationError::InvalidParameter { name: "frame_count", .. })
    ));
    orchestrator.set_sample_count(2).unwrap();

    orchestrator
        .select_file(&MediaFile::new(harness.media("clip.mp4")), MediaKind::Video)
        .unwrap();
    assert_eq!(orchestrator.predict().await, PredictOutcome::Succeeded);
    assert_eq!(orchestrator.result().unwrap().preview_frames.len(), 2);

    let requests = harness.requests.lock().unwrap();
    assert_eq!(
        requests[0].form_fields(),
        vec![
            ("model_type", "svm".to_string()),
            ("frame_rate", "15".to_string()),
            ("max_frames", "30".to_string()),
        ]
    );
}
