//! Chat service flows: active conversation, delayed replies, feedback.

use std::sync::Arc;
use std::time::Duration;

use bot_ai::chat::{
    BackendKind, ChatConfig, ChatError, ChatService, Clock, DEFAULT_TITLE, ManualClock, Reaction,
    SystemClock,
};
use chrono::{TimeZone, Utc};

fn config(typing_delay_ms: u64) -> ChatConfig {
    let mut config = ChatConfig::default();
    config.storage.backend = BackendKind::Memory;
    config.session.typing_delay_ms = typing_delay_ms;
    config
}

fn service(typing_delay_ms: u64) -> ChatService {
    ChatService::from_config(&config(typing_delay_ms), Arc::new(SystemClock)).unwrap()
}

#[tokio::test]
async fn add_message_without_active_conversation_fails() {
    let chat = service(10);
    let result = chat.add_message("hello", true).await;
    assert!(matches!(result, Err(ChatError::NoActiveConversation)));
    assert!(chat.list_conversations(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn send_creates_conversation_and_reply_follows() {
    let chat = service(20);
    let (id, message) = chat.send_message("  What is the virtual DOM?  ").await.unwrap();

    assert_eq!(chat.active_id().await, Some(id));
    assert!(message.is_user);
    assert!(chat.is_reply_pending(id));
    let pending = chat.active_conversation().await.unwrap().unwrap();
    assert_eq!(pending.messages.len(), 1);
    assert_eq!(pending.messages[0].content, "What is the virtual DOM?");
    assert_eq!(pending.title, "What is the virtual ...");

    tokio::time::sleep(Duration::from_millis(200)).await;

    let done = chat.active_conversation().await.unwrap().unwrap();
    assert_eq!(done.messages.len(), 2);
    assert!(!done.messages[1].is_user);
    assert_eq!(
        done.messages[1].content,
        chat.matcher().respond("What is the virtual DOM?")
    );
    assert!(!chat.is_reply_pending(id));
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let chat = service(10);
    assert!(matches!(
        chat.send_message("   ").await,
        Err(ChatError::EmptyMessage)
    ));
    assert!(chat.active_id().await.is_none());
}

#[tokio::test]
async fn second_send_while_pending_is_rejected() {
    let chat = service(5_000);
    chat.send_message("first").await.unwrap();
    let second = chat.send_message("second").await;
    assert!(matches!(second, Err(ChatError::ReplyPending(_))));
    assert_eq!(chat.shutdown(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_store_only_one_user_message() {
    let chat = Arc::new(service(5_000));
    for _ in 0..100 {
        let conversation = chat.create_conversation().await.unwrap();

        let first = tokio::spawn({
            let chat = Arc::clone(&chat);
            async move { chat.send_message("first").await }
        });
        let second = tokio::spawn({
            let chat = Arc::clone(&chat);
            async move { chat.send_message("second").await }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(ChatError::ReplyPending(id)) if *id == conversation.id))
            .count();
        assert_eq!((accepted, rejected), (1, 1));

        let stored = chat.store().get(conversation.id).unwrap().unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert!(stored.messages[0].is_user);
        assert_eq!(chat.shutdown(), 1);
    }
}

#[tokio::test]
async fn cancelled_reply_is_never_appended() {
    let chat = service(50);
    let (id, _) = chat.send_message("What is Docker?").await.unwrap();

    assert!(chat.cancel_pending_reply(id));
    assert!(!chat.cancel_pending_reply(id));
    assert!(!chat.is_reply_pending(id));

    tokio::time::sleep(Duration::from_millis(150)).await;
    let stored = chat.active_conversation().await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 1);

    chat.send_message("Tell me more").await.unwrap();
    assert!(chat.is_reply_pending(id));
    assert_eq!(chat.shutdown(), 1);
}

#[tokio::test]
async fn deleting_conversation_cancels_pending_reply() {
    let chat = service(50);
    let (id, _) = chat
        .send_message("How do you optimize website performance?")
        .await
        .unwrap();

    assert!(chat.delete_conversation(id).await.unwrap());
    assert!(!chat.is_reply_pending(id));
    assert!(chat.active_id().await.is_none());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(chat.store().get(id).unwrap().is_none());
    assert!(chat.list_conversations(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn new_chat_keeps_default_title_until_user_speaks() {
    let chat = service(10);
    let conversation = chat.create_conversation().await.unwrap();
    assert_eq!(conversation.title, DEFAULT_TITLE);

    chat.add_message("Greetings from the assistant", false)
        .await
        .unwrap();
    let after = chat.active_conversation().await.unwrap().unwrap();
    assert_eq!(after.title, DEFAULT_TITLE);

    chat.add_message("Short question", true).await.unwrap();
    let titled = chat.active_conversation().await.unwrap().unwrap();
    assert_eq!(titled.title, "Short question");
}

#[tokio::test]
async fn feedback_and_reactions_round_trip() {
    let chat = service(10);
    let conversation = chat.create_conversation().await.unwrap();
    let message = chat.add_ai_response("What are microservices?").await.unwrap();

    assert!(chat
        .set_reaction(conversation.id, message.id, Some(Reaction::Dislike))
        .await
        .unwrap());
    assert!(matches!(
        chat.save_feedback(conversation.id, Some(0), None).await,
        Err(ChatError::InvalidRating(0))
    ));
    let saved = chat
        .save_feedback(conversation.id, Some(3), Some("ok".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.rating, Some(3));
    assert_eq!(saved.messages[0].reaction, Some(Reaction::Dislike));
}

#[tokio::test]
async fn history_is_newest_first_and_filterable() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).single().unwrap(),
    ));
    let chat = ChatService::from_config(&config(10), clock.clone()).unwrap();

    let older = chat.create_conversation().await.unwrap();
    clock.advance(chrono::Duration::minutes(1));
    let newer = chat.create_conversation().await.unwrap();
    clock.advance(chrono::Duration::minutes(1));
    chat.save_feedback(older.id, Some(5), None).await.unwrap();

    let all = chat.list_conversations(None).await.unwrap();
    assert_eq!(
        all.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![older.id, newer.id]
    );
    assert!(all[0].updated_at > all[1].updated_at);
    assert!(all[1].updated_at <= clock.now());

    let five = chat.list_conversations(Some(5)).await.unwrap();
    assert_eq!(five.len(), 1);
    assert_eq!(five[0].id, older.id);
    assert!(chat.list_conversations(Some(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn loading_switches_active_conversation() {
    let chat = service(10);
    let first = chat.create_conversation().await.unwrap();
    let second = chat.create_conversation().await.unwrap();
    assert_eq!(chat.active_id().await, Some(second.id));

    let loaded = chat.load_conversation(first.id).await.unwrap();
    assert_eq!(loaded.map(|c| c.id), Some(first.id));
    assert_eq!(chat.active_id().await, Some(first.id));

    chat.clear_active().await;
    assert!(chat.active_id().await.is_none());
}

#[test]
fn suggestions_come_from_corpus() {
    let chat = service(10);
    let suggestions = chat.suggestions();
    assert_eq!(suggestions.len(), 4);
    for suggestion in &suggestions {
        assert!(chat
            .matcher()
            .corpus()
            .entries
            .iter()
            .any(|e| e.question == suggestion.title));
    }
}
