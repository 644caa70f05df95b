use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::post};
use proto::{Role, SessionError, SessionEvent, UserIntent};
use session::{GithubModelsProvider, SessionConfiguration, SessionController, SqliteStore};

const REPLY: &str = r#"{
    "id": "chatcmpl-1",
    "object": "chat.completion",
    "model": "grok-3-mini",
    "choices": [{"index": 0, "finish_reason": "stop", "message": {"role": "assistant", "content": "Sure thing, here you go"}}]
}"#;

async fn spawn_mock() -> String {
    let app = Router::new().route("/chat/completions", post(|| async { REPLY }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{addr}/chat/completions")
}

#[tokio::test]
async fn full_exchange_persists_quota_and_model_choice() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("incognito.db").to_string_lossy().to_string();
    let endpoint = spawn_mock().await;

    let store = Arc::new(SqliteStore::open(&db).await.expect("open store"));
    let provider = Arc::new(
        GithubModelsProvider::with_endpoint("token", &endpoint).with_decode_grace(Duration::ZERO),
    );
    let config = SessionConfiguration::default().restore(store.as_ref());
    let mut controller = SessionController::new(config, store.clone(), provider);
    let (_, mut events) = controller.subscribe();

    let grok = proto::find_profile(controller.catalog(), "xai/grok-3-mini")
        .expect("grok in catalog")
        .clone();
    controller.handle(UserIntent::SwitchModel(grok.clone()));

    let exchange = controller
        .handle(UserIntent::SubmitText("Give me five words".to_string()))
        .expect("exchange produced");
    let completion = tokio::spawn(exchange.run()).await.expect("exchange task");
    controller.complete(completion);

    let mut ticks = 0;
    while controller.tick_reveal().is_some() {
        ticks += 1;
    }
    assert_eq!(ticks, 5);
    assert_eq!(controller.remaining(), 29);

    let roles: Vec<Role> = controller.timeline().messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(
        controller.timeline().last_assistant().map(|m| m.content.as_str()),
        Some("Sure thing, here you go")
    );

    let mut saw_quota = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::QuotaChanged {
            model_id,
            remaining,
            ..
        } = event
            && model_id == "xai/grok-3-mini"
            && remaining == 29
        {
            saw_quota = true;
        }
    }
    assert!(saw_quota);

    drop(controller);
    let store = Arc::into_inner(store).expect("sole store owner");
    store.close().await.expect("close store");

    let reopened = SqliteStore::open(&db).await.expect("reopen store");
    let restored = SessionConfiguration::default().restore(&reopened);
    assert_eq!(restored.active_model, grok);
    let ledger = session::QuotaLedger::new(Arc::new(reopened));
    assert_eq!(ledger.remaining(&grok), 29);
}

#[tokio::test]
async fn offline_then_online_recovers_without_spending_quota() {
    let endpoint = spawn_mock().await;
    let store = Arc::new(session::MemoryStore::new());
    let provider = Arc::new(GithubModelsProvider::with_endpoint("token", &endpoint));
    let mut controller =
        SessionController::new(SessionConfiguration::default(), store.clone(), provider);
    let (_, mut events) = controller.subscribe();

    controller.handle(UserIntent::ConnectivityChanged(false));
    assert!(controller
        .handle(UserIntent::SubmitText("Hello world".to_string()))
        .is_none());
    assert_eq!(controller.timeline().len(), 1);
    assert_eq!(controller.remaining(), 150);

    let notices: Vec<SessionError> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            SessionEvent::Notice(err) => Some(err),
            _ => None,
        })
        .collect();
    assert_eq!(notices, vec![SessionError::NetworkUnavailable]);

    controller.handle(UserIntent::ConnectivityChanged(true));
    let exchange = controller
        .handle(UserIntent::SubmitText("Hello again".to_string()))
        .expect("exchange produced");
    controller.complete(exchange.run().await);

    assert_eq!(controller.timeline().len(), 3);
    assert_eq!(controller.remaining(), 149);
    assert!(store.len() >= 1);
}
