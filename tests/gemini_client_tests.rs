use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use futures::StreamExt;
use JournalChatAgent::errors::AppError;
use JournalChatAgent::models::message::Message;
use JournalChatAgent::services::llm_service::{ChatModel, GeminiClient};

const API_KEY: &str = "test-key";
const MODEL: &str = "gemini-test";

/// Serves a fixed reply for every request carrying the expected key and model path.
async fn serve(status: u16, content_type: &'static str, body: &'static str) -> (String, ServerHandle) {
    let server = HttpServer::new(move || {
        App::new().default_service(web::to(move |req: HttpRequest, _body: web::Bytes| async move {
            let key = req
                .headers()
                .get("x-goog-api-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let expected_path = format!("/models/{}:streamGenerateContent", MODEL);
            if key != API_KEY || req.path() != expected_path || req.query_string() != "alt=sse" {
                return HttpResponse::NotFound().body("unexpected request");
            }
            HttpResponse::build(actix_web::http::StatusCode::from_u16(status).unwrap())
                .content_type(content_type)
                .body(body)
        }))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    (format!("http://{}", addr), handle)
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new(API_KEY.to_string(), MODEL.to_string())
        .unwrap()
        .with_base_url(base_url)
}

#[actix_web::test]
async fn test_streamed_reply_is_decoded_in_order() {
    let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"What stood \"}],\"role\":\"model\"}}]}\r\n\r\n\
data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"out to you?\"}],\"role\":\"model\"}}]}\r\n\r\n\
data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\r\n\r\n";
    let (base_url, handle) = serve(200, "text/event-stream", body).await;

    let mut tokens = client(&base_url)
        .stream_chat("Reflect", &[Message::user("I froze in class")])
        .await
        .unwrap();
    let mut parts = Vec::new();
    while let Some(token) = tokens.next().await {
        parts.push(token.unwrap());
    }
    assert_eq!(parts, vec!["What stood ", "out to you?"]);

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_complete_collects_streamed_reply() {
    let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Take \"}]}}]}\n\n\
data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"your time.\"}]}}]}";
    let (base_url, handle) = serve(200, "text/event-stream", body).await;

    let reply = client(&base_url)
        .complete("Reflect", &[Message::user("Hello")])
        .await
        .unwrap();
    assert_eq!(reply, "Take your time.");

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_error_status_carries_status_and_body() {
    let (base_url, handle) = serve(
        429,
        "application/json",
        r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#,
    )
    .await;

    let result = client(&base_url)
        .stream_chat("Reflect", &[Message::user("Hello")])
        .await;
    match result {
        Err(AppError::Api(detail)) => {
            assert!(detail.starts_with("429"), "unexpected detail: {}", detail);
            assert!(detail.contains("Resource has been exhausted"), "unexpected detail: {}", detail);
        }
        Err(other) => panic!("expected an API error, got {:?}", other),
        Ok(_) => panic!("expected an API error, got a stream"),
    }

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_server_error_is_an_api_error() {
    let (base_url, handle) = serve(500, "text/plain", "internal").await;

    let result = client(&base_url).complete("Reflect", &[Message::user("Hello")]).await;
    assert!(matches!(result, Err(AppError::Api(detail)) if detail.contains("500") && detail.contains("internal")));

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_unreachable_server_is_a_network_error() {
    let (base_url, handle) = serve(200, "text/event-stream", "").await;
    handle.stop(false).await;

    let result = client(&base_url).complete("Reflect", &[Message::user("Hello")]).await;
    assert!(matches!(result, Err(AppError::Network(_))));
}
