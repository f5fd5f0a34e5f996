use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::{config::Config, converter_from_config, scanner::SENTINEL};

async fn metadata_service() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scraper/https%3A%2F%2Fa.test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"success": true, "data": {"title": "A", "url": "https://a.test/", "author": "someone", "logo": ""}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scraper/https%3A%2F%2Fb.test"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(r#"{"success": false, "error": "timeout"}"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scraper/https%3A%2F%2Fc.test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"success": true, "data": {"title": "C", "description": "a much longer description than the others", "image": "https://c.test/og.png", "url": "https://c.test/"}}"#,
        ))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer) -> Config {
    Config {
        request_interval_ms: 0,
        ..Config::with_endpoint(format!("{}/scraper", server.uri()))
    }
}

#[tokio::test]
async fn test_success_and_failure_in_one_document() {
    let server = metadata_service().await;
    let converter = converter_from_config(&config(&server)).unwrap();
    let text = "%%bookmarkthis%%\n![x](https://a.test)\n\nsome text\n\n%%bookmarkthis%%\n![y](https://b.test)";

    let output = converter.convert(text).await;

    assert!(output.starts_with(r#"<figure class="kg-card kg-bookmark-card">"#));
    assert!(output.contains(r#"<div class="kg-bookmark-title">A</div>"#));
    assert!(output.contains(r#"<span class="kg-bookmark-author">someone</span>"#));
    assert!(!output.contains("kg-bookmark-icon"));
    assert!(output.ends_with(
        "</figure>\n\nsome text\n\n%% 轉換失敗: timeout %%\n![y](https://b.test)"
    ));
    assert!(!output.contains(SENTINEL));
}

#[tokio::test]
async fn test_all_markers_converted_and_surroundings_untouched() {
    let server = metadata_service().await;
    let converter = converter_from_config(&config(&server)).unwrap();
    let prefix = "# Reading list\n\n";
    let suffix = "\n\n---\nend of list\n";
    let text = format!(
        "{prefix}{SENTINEL}\n![c](https://c.test)\nbetween\n{SENTINEL}\n![a](https://a.test){suffix}"
    );

    let state = converter
        .convert_with(&text, &crate::progress::NullReporter)
        .await;
    let output = state.text();

    assert!(output.starts_with(prefix));
    assert!(output.ends_with(&format!("</figure>{suffix}")));
    assert_eq!(output.matches(r#"<figure class="kg-card kg-bookmark-card">"#).count(), 2);
    assert!(output.contains("</figure>\nbetween\n<figure"));
    assert!(output.find(">C<").unwrap() < output.find(">A<").unwrap());
    assert!(output.contains(r#"<img src="https://c.test/og.png">"#));
    assert!(!output.contains(SENTINEL));
    assert_eq!(state.tally().converted, 2);
}

#[tokio::test]
async fn test_unreachable_service_annotates_every_marker() {
    let server = MockServer::start().await;
    let config = config(&server);
    drop(server);
    let converter = converter_from_config(&config).unwrap();
    let text = format!("{SENTINEL}\n![a](https://a.test)\n{SENTINEL}\n![b](https://b.test)");

    let output = converter.convert(&text).await;

    assert_eq!(output.matches("%% 轉換失敗: ").count(), 2);
    assert!(output.contains(" %%\n![a](https://a.test)\n%% 轉換失敗: "));
    assert!(output.ends_with(" %%\n![b](https://b.test)"));
    assert!(!output.contains(SENTINEL));
}
