use relay_chat::llm::ChatMessage;
use relay_chat::message::{Message, MessageKind, Role};

// ============================================
// Role Tests
// ============================================

#[test]
fn test_role_user_prefix() {
    assert_eq!(Role::User.prefix(), "You: ");
}

#[test]
fn test_role_assistant_prefix() {
    assert_eq!(Role::Assistant.prefix(), "Agent: ");
}

#[test]
fn test_role_wire_names() {
    assert_eq!(Role::User.as_str(), "user");
    assert_eq!(Role::Assistant.as_str(), "assistant");
}

#[test]
fn test_role_is_copy() {
    let role = Role::User;
    let role_copy = role; // Copy, not move
    assert_eq!(role, role_copy);
}

// ============================================
// Message Construction Tests
// ============================================

#[test]
fn test_message_user_constructor() {
    let msg = Message::user("Hello!");

    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.content, "Hello!");
    assert_eq!(msg.kind, MessageKind::Reply);
}

#[test]
fn test_message_assistant_constructor() {
    let msg = Message::assistant("Hi there!");

    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content, "Hi there!");
    assert_eq!(msg.kind, MessageKind::Reply);
}

#[test]
fn test_message_failed_turn_constructor() {
    let msg = Message::failed_turn("Stream error: connection reset");

    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content, "Stream error: connection reset");
    assert!(msg.is_failed_turn());
}

#[test]
fn test_message_kind_default_is_reply() {
    let kind: MessageKind = Default::default();
    assert_eq!(kind, MessageKind::Reply);
}

#[test]
fn test_regular_messages_are_not_failed_turns() {
    assert!(!Message::user("User message").is_failed_turn());
    assert!(!Message::assistant("Assistant message").is_failed_turn());
}

// ============================================
// Message Content Tests
// ============================================

#[test]
fn test_message_unicode_content() {
    let content = "Hello 🌴 Miami! こんにちは";
    let msg = Message::user(content);
    assert_eq!(msg.content, content);
}

#[test]
fn test_message_multiline_content() {
    let content = "Line 1\nLine 2\nLine 3";
    let msg = Message::assistant(content);
    assert_eq!(msg.content, content);
}

#[test]
fn test_chat_message_from_message() {
    let wire = ChatMessage::from(&Message::assistant("Hi"));
    assert_eq!(wire, ChatMessage::new("assistant", "Hi"));
}
