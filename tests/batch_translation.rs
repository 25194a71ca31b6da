//! 批次翻译集成测试
//!
//! 通过模拟引擎测试合并、切分、失败隔离和关闭流程

use std::sync::Arc;

use transbatch::translation::{BatchConfig, HealthLevel, TranslationError};

mod common;

use common::{Behavior, PerformanceHelper, TestDataGenerator, TestEnvironment};

#[tokio::test]
async fn test_concurrent_requests_are_merged() {
    let (env, gate) = TestEnvironment::gated(Behavior::Uppercase);
    let service = Arc::clone(&env.service);

    let warmup = service.enqueue("warmup").unwrap();
    PerformanceHelper::wait_until(|| env.log.len() == 1, "engine entered").await;

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.translate("hello").await })
        })
        .collect();
    PerformanceHelper::wait_until(|| service.stats().requests_enqueued == 101, "all enqueued").await;

    gate.open();

    assert_eq!(warmup.await.unwrap(), "WARMUP");
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "HELLO");
    }

    let calls = env.log.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].matches('\n').count(), 99);

    let stats = service.stats();
    assert_eq!(stats.rounds_processed, 2);
    assert_eq!(stats.requests_completed, 101);
    assert!(stats.average_round_size() > 50.0);

    service.shutdown();
}

#[tokio::test]
async fn test_results_follow_request_order() {
    let env = TestEnvironment::new(Behavior::Uppercase);
    let texts = TestDataGenerator::numbered_texts(60);

    let pending: Vec<_> = texts
        .iter()
        .map(|text| env.service.enqueue(text.as_str()).unwrap())
        .collect();

    for (text, handle) in texts.iter().zip(pending) {
        assert_eq!(handle.await.unwrap(), text.to_uppercase());
    }

    env.service.shutdown();
}

#[tokio::test]
async fn test_small_budget_splits_rounds() {
    let config = BatchConfig {
        round_char_budget: 10,
        ..Default::default()
    };
    let (env, gate) = TestEnvironment::gated_with_config(Behavior::Identity, config);

    let warmup = env.service.enqueue("warm").unwrap();
    PerformanceHelper::wait_until(|| env.log.len() == 1, "engine entered").await;

    // 五个 5 字符的请求在预算 10 下分成 2 + 2 + 1 三轮
    let pending: Vec<_> = (0..5)
        .map(|i| env.service.enqueue(format!("text{}", i)).unwrap())
        .collect();
    gate.open();

    assert_eq!(warmup.await.unwrap(), "warm");
    for (i, handle) in pending.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), format!("text{}", i));
    }

    let stats = env.service.stats();
    assert_eq!(stats.rounds_processed, 4);
    assert_eq!(stats.requests_completed, 6);

    env.service.shutdown();
}

#[tokio::test]
async fn test_oversized_request_is_translated_alone() {
    let config = BatchConfig {
        round_char_budget: 4,
        ..Default::default()
    };
    let env = TestEnvironment::with_config(Behavior::Uppercase, config);

    let long_text = "a much longer request";
    assert_eq!(env.service.translate(long_text).await.unwrap(), long_text.to_uppercase());

    env.service.shutdown();
}

#[tokio::test]
async fn test_failed_round_does_not_affect_next_round() {
    let env = TestEnvironment::new(Behavior::FailOn("poison".to_string()));

    let error = env.service.translate("poison pill").await.unwrap_err();
    assert!(matches!(error, TranslationError::TranslationFailure(_)));
    assert_eq!(env.service.health().overall, HealthLevel::Degraded);

    assert_eq!(env.service.translate("healthy").await.unwrap(), "HEALTHY");
    assert_eq!(env.service.health().overall, HealthLevel::Healthy);

    let stats = env.service.stats();
    assert_eq!(stats.rounds_failed, 1);
    assert_eq!(stats.requests_failed, 1);
    assert_eq!(stats.requests_completed, 1);

    env.service.shutdown();
}

#[tokio::test]
async fn test_failure_is_delivered_to_every_request_in_round() {
    let (env, gate) = TestEnvironment::gated(Behavior::FailOn("poison".to_string()));

    let warmup = env.service.enqueue("warmup").unwrap();
    PerformanceHelper::wait_until(|| env.log.len() == 1, "engine entered").await;

    let innocent = env.service.enqueue("innocent").unwrap();
    let poisoned = env.service.enqueue("poison").unwrap();
    gate.open();

    assert_eq!(warmup.await.unwrap(), "WARMUP");
    let innocent_error = innocent.await.unwrap_err();
    let poisoned_error = poisoned.await.unwrap_err();
    assert_eq!(innocent_error, poisoned_error);

    env.service.shutdown();
}

#[tokio::test]
async fn test_whitespace_and_symbols_survive_lossy_engine() {
    let env = TestEnvironment::new(Behavior::Lossy);

    let cases = [
        ("  indented\ttext", "  INDENTED\tTEXT"),
        ("a - b", "A - B"),
        ("##title##", "##TITLE##"),
        ("第一章──始まり", "第一章──始まり"),
        ("trailing   ", "TRAILING   "),
        ("@mention and ő", "@MENTION AND ő"),
        ("line one\n\n  line two", "LINE ONE\n\n  LINE TWO"),
        ("　全角スペース　　です", "　全角スペース　　です"),
        ("path\\\\to", "PATH\\\\TO"),
    ];

    let pending: Vec<_> = cases
        .iter()
        .map(|(input, _)| env.service.enqueue(*input).unwrap())
        .collect();

    for ((input, expected), handle) in cases.iter().zip(pending) {
        assert_eq!(handle.await.unwrap(), *expected, "input: {:?}", input);
    }

    env.service.shutdown();
}

#[tokio::test]
async fn test_marker_loss_fails_the_round() {
    let env = TestEnvironment::new(Behavior::DropMarker);

    let error = env.service.translate("a  b").await.unwrap_err();
    assert_eq!(
        error,
        TranslationError::CodecConsistency {
            markers: 0,
            preserved: 1
        }
    );

    assert_eq!(env.service.translate("plain").await.unwrap(), "plain");

    env.service.shutdown();
}

#[tokio::test]
async fn test_abandoned_request_is_not_sent_to_engine() {
    let (env, gate) = TestEnvironment::gated(Behavior::Uppercase);

    let warmup = env.service.enqueue("warmup").unwrap();
    PerformanceHelper::wait_until(|| env.log.len() == 1, "engine entered").await;

    drop(env.service.enqueue("abandoned").unwrap());
    let kept = env.service.enqueue("kept").unwrap();
    gate.open();

    assert_eq!(warmup.await.unwrap(), "WARMUP");
    assert_eq!(kept.await.unwrap(), "KEPT");
    assert_eq!(env.log.calls()[1], "kept");
    assert_eq!(env.service.stats().requests_cancelled, 1);

    env.service.shutdown();
}

#[tokio::test]
async fn test_shutdown_cancels_undrained_requests() {
    let (env, gate) = TestEnvironment::gated(Behavior::Uppercase);

    let in_flight = env.service.enqueue("in flight").unwrap();
    PerformanceHelper::wait_until(|| env.log.len() == 1, "engine entered").await;
    let queued = env.service.enqueue("queued").unwrap();

    let service = Arc::clone(&env.service);
    let closer = tokio::task::spawn_blocking(move || service.shutdown());
    PerformanceHelper::wait_until(|| !env.service.is_running(), "stop signalled").await;

    assert_eq!(
        env.service.enqueue("too late").unwrap_err(),
        TranslationError::Cancelled
    );

    gate.open();
    closer.await.unwrap();

    assert_eq!(in_flight.await.unwrap(), "IN FLIGHT");
    assert_eq!(queued.await.unwrap_err(), TranslationError::Cancelled);
    assert_eq!(env.log.len(), 1);
    assert_eq!(env.service.health().overall, HealthLevel::Unhealthy);
}

#[tokio::test]
async fn test_drop_does_not_wait_for_engine() {
    let (env, gate) = TestEnvironment::gated(Behavior::Identity);

    let in_flight = env.service.enqueue("in flight").unwrap();
    PerformanceHelper::wait_until(|| env.log.len() == 1, "engine entered").await;
    let queued = env.service.enqueue("queued").unwrap();

    // 引擎仍然卡在闸门里，析构必须立即返回
    let log = env.log.clone();
    drop(env);

    gate.open();
    assert_eq!(in_flight.await.unwrap(), "in flight");
    assert_eq!(queued.await.unwrap_err(), TranslationError::Cancelled);
    assert_eq!(log.len(), 1);
}
