use chrono::{DateTime, Utc};
use colloquy_types::{Message, Role, Thread};
use serde::{Deserialize, Serialize};

/// Thread document in the `threads` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Message document in the `messages` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl MongoThread {
    pub fn from_thread(thread: &Thread, user_id: &str) -> Self {
        Self {
            id: thread.id.clone(),
            user_id: user_id.to_string(),
            title: thread.title.clone(),
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }

    pub fn into_thread(self, messages: Vec<MongoMessage>) -> Thread {
        Thread {
            id: self.id,
            title: self.title,
            messages: messages.into_iter().map(Message::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl MongoMessage {
    pub fn from_message(thread_id: &str, message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            thread_id: thread_id.to_string(),
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id,
            role: msg.role,
            content: msg.content,
            created_at: msg.created_at,
            partial: false,
        }
    }
}
