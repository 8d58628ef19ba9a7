//! Mock Telegram API Server for testing
//!
//! Simulates the Bot API endpoints the bot calls, using wiremock.

use serde_json::{json, Value};
use teloxide::Bot;
use wiremock::{
    matchers::{method, path_regex},
    Mock, MockServer, ResponseTemplate,
};

/// Mock Telegram API server for testing
pub struct TelegramMockServer {
    pub server: MockServer,
}

impl TelegramMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Bot pointed at the mock server
    pub fn bot(&self) -> Bot {
        Bot::new(test_bot_token()).set_api_url(self.server.uri().parse().expect("Invalid mock server url"))
    }

    /// teloxide spells method names in PascalCase; the Bot API ignores case
    fn endpoint(name: &str) -> String {
        format!("(?i)^/bot{}/{}$", test_bot_token(), name)
    }

    /// getChatMember answers with the given member status
    pub async fn mock_chat_member_status(&self, status: &str) {
        let mut result = json!({
            "status": status,
            "user": {
                "id": test_user_id(),
                "is_bot": false,
                "first_name": "Test"
            }
        });
        if status == "kicked" {
            result["until_date"] = json!(0);
        }

        self.mock_endpoint("getChatMember", json!({ "ok": true, "result": result }), 200)
            .await;
    }

    /// getChatMember answers `restricted`, with the user in the chat or not
    pub async fn mock_restricted_member(&self, is_member: bool) {
        let result = json!({
            "status": "restricted",
            "user": {
                "id": test_user_id(),
                "is_bot": false,
                "first_name": "Test"
            },
            "until_date": 0,
            "is_member": is_member,
            "can_send_messages": false,
            "can_send_audios": false,
            "can_send_documents": false,
            "can_send_photos": false,
            "can_send_videos": false,
            "can_send_video_notes": false,
            "can_send_voice_notes": false,
            "can_send_polls": false,
            "can_send_other_messages": false,
            "can_add_web_page_previews": false,
            "can_change_info": false,
            "can_invite_users": false,
            "can_pin_messages": false,
            "can_manage_topics": false
        });

        self.mock_endpoint("getChatMember", json!({ "ok": true, "result": result }), 200)
            .await;
    }

    /// getChatMember fails the way the Bot API does for unknown chats
    pub async fn mock_chat_member_error(&self) {
        self.mock_endpoint(
            "getChatMember",
            json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            }),
            400,
        )
        .await;
    }

    /// sendMessage, sendPhoto and editMessageText answer with a sent message
    pub async fn mock_message_endpoints(&self) {
        for name in ["sendMessage", "sendPhoto", "editMessageText"] {
            self.mock_endpoint(name, json!({ "ok": true, "result": sent_message() }), 200)
                .await;
        }
    }

    /// answerCallbackQuery succeeds
    pub async fn mock_answer_callback(&self) {
        self.mock_endpoint("answerCallbackQuery", json!({ "ok": true, "result": true }), 200)
            .await;
    }

    /// JSON bodies received for an endpoint, in arrival order
    pub async fn bodies_of(&self, name: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path().to_lowercase().ends_with(&name.to_lowercase()))
            .filter_map(|req| serde_json::from_slice(&req.body).ok())
            .collect()
    }

    async fn mock_endpoint(&self, name: &str, body: Value, status: u16) {
        Mock::given(method("POST"))
            .and(path_regex(Self::endpoint(name)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for an endpoint
    pub async fn calls_to(&self, name: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path().to_lowercase().ends_with(&name.to_lowercase()))
            .count()
    }
}

/// Minimal private-chat message as the Bot API returns it
pub fn sent_message() -> Value {
    json!({
        "message_id": 1,
        "date": 1_746_100_800,
        "chat": {
            "id": test_user_id(),
            "type": "private",
            "first_name": "Test"
        },
        "text": "ok"
    })
}

/// Helper function to create a test bot token
pub fn test_bot_token() -> String {
    "12345:test_token".to_string()
}

/// Helper function to create test user ID
pub fn test_user_id() -> i64 {
    987654321
}
