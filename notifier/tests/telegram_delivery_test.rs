//! Delivery of a multi-chunk diff to a mock Telegram endpoint.

use std::sync::Arc;

use gitwatch_notifier::{Notifier, TelegramTransport};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn diff_with_lines(n: usize) -> String {
    let mut diff = String::from("diff --git a/log.txt b/log.txt\n--- a/log.txt\n+++ b/log.txt\n");
    diff.push_str(&format!("@@ -0,0 +1,{n} @@\n"));
    for i in 0..n {
        diff.push_str(&format!("+entry {i:04}: the quick brown fox jumps over the lazy dog\n"));
    }
    diff
}

#[tokio::test]
async fn test_large_diff_arrives_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bottoken/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let transport = TelegramTransport::new("token", "1001").with_base_url(server.uri());
    let notifier = Notifier::new(Arc::new(transport));
    let diff = diff_with_lines(200);

    let report = notifier.notify(&diff).await;

    assert!(report.chunks > 1);
    assert_eq!(report.delivered, report.chunks);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), report.chunks);

    let mut reassembled = String::new();
    for request in &requests {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["chat_id"], "1001");
        let text = body["text"].as_str().unwrap();
        assert!(text.chars().count() <= 4000);
        reassembled.push_str(text);
    }
    assert_eq!(reassembled, diff);
}

#[tokio::test]
async fn test_rejected_chunk_is_skipped() {
    let server = MockServer::start().await;
    // First request fails, the rest succeed.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let transport = TelegramTransport::new("token", "1001").with_base_url(server.uri());
    let notifier = Notifier::new(Arc::new(transport)).with_max_chunk(100);

    let report = notifier.notify(&diff_with_lines(5)).await;

    assert_eq!(report.failed, vec![0]);
    assert_eq!(report.delivered, report.chunks - 1);
}
