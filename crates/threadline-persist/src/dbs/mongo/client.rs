use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection};
use tokio::sync::Mutex;

use crate::dbs::mongo::models::{MongoMessage, MongoSummary, MongoThread};
use crate::error::{PersistError, Result};
use crate::models::{Message, MessageSummary, NewMessage, Thread};
use crate::trait_client::PersistenceClient;

pub struct MongoPersistenceClient {
    threads: Collection<MongoThread>,
    messages: Collection<MongoMessage>,
    summaries: Collection<MongoSummary>,
    // BSON dates are millisecond precision; keep creation times distinct per process
    last_tick: Mutex<Option<DateTime<Utc>>>,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB and create client
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let db = client.database(database);
        Ok(Self {
            threads: db.collection("threads"),
            messages: db.collection("messages"),
            summaries: db.collection("message_summaries"),
            last_tick: Mutex::new(None),
        })
    }

    async fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        let mut last = self.last_tick.lock().await;
        let ts = match *last {
            Some(prev) if now <= prev => prev + Duration::milliseconds(1),
            _ => now,
        };
        *last = Some(ts);
        ts
    }
}

fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn require_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|e| PersistError::InvalidObjectId(e.to_string()))
}

fn bson_time(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

/// Case-insensitive literal title match within one user's threads
fn title_search_filter(user_id: &str, query: &str) -> Document {
    doc! {
        "user_id": user_id,
        "title": { "$regex": regex::escape(query), "$options": "i" },
    }
}

/// `{ field: { "$in": ids } }`
fn ids_filter(field: &str, ids: &[ObjectId]) -> Document {
    let ids: Vec<Bson> = ids.iter().copied().map(Bson::ObjectId).collect();
    let mut filter = Document::new();
    filter.insert(field, doc! { "$in": ids });
    filter
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn insert_thread(&self, user_id: &str, title: &str) -> Result<Thread> {
        let now = self.next_timestamp().await;
        let thread = MongoThread {
            id: ObjectId::new(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            last_message_at: now,
        };
        self.threads.insert_one(&thread).await?;
        Ok(thread.into())
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let Some(id) = parse_id(thread_id) else {
            return Ok(None);
        };
        Ok(self.threads.find_one(doc! { "_id": id }).await?.map(Into::into))
    }

    async fn list_threads(
        &self,
        user_id: &str,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Thread>> {
        let mut find = self
            .threads
            .find(doc! { "user_id": user_id })
            .sort(doc! { "last_message_at": -1 });

        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        if let Some(skip) = skip {
            find = find.skip(skip.max(0) as u64);
        }

        let threads: Vec<MongoThread> = find.await?.try_collect().await?;
        Ok(threads.into_iter().map(Into::into).collect())
    }

    async fn search_threads(&self, user_id: &str, query: &str, limit: i64) -> Result<Vec<Thread>> {
        let filter = title_search_filter(user_id, query);
        let threads: Vec<MongoThread> = self
            .threads
            .find(filter)
            .sort(doc! { "last_message_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(threads.into_iter().map(Into::into).collect())
    }

    async fn update_thread_title(&self, thread_id: &str, title: &str) -> Result<()> {
        let id = require_id(thread_id)?;
        let result = self
            .threads
            .update_one(doc! { "_id": id }, doc! { "$set": { "title": title } })
            .await?;
        if result.matched_count == 0 {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(())
    }

    async fn touch_thread(&self, thread_id: &str, at: DateTime<Utc>) -> Result<()> {
        let id = require_id(thread_id)?;
        self.threads
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "last_message_at": bson_time(at) } },
            )
            .await?;
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let id = require_id(thread_id)?;
        self.messages.delete_many(doc! { "thread_id": id }).await?;
        self.summaries.delete_many(doc! { "thread_id": id }).await?;
        self.threads.delete_one(doc! { "_id": id }).await?;
        Ok(())
    }

    async fn insert_message(&self, thread_id: &str, message: NewMessage) -> Result<Message> {
        let thread_oid = require_id(thread_id)?;
        let created_at = self.next_timestamp().await;
        let message = MongoMessage {
            id: ObjectId::new(),
            thread_id: thread_oid,
            role: message.role,
            content: message.content,
            parts: message.parts,
            created_at,
        };
        self.messages.insert_one(&message).await?;
        Ok(message.into())
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>> {
        let Some(id) = parse_id(message_id) else {
            return Ok(None);
        };
        Ok(self.messages.find_one(doc! { "_id": id }).await?.map(Into::into))
    }

    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let Some(id) = parse_id(thread_id) else {
            return Ok(Vec::new());
        };
        let messages: Vec<MongoMessage> = self
            .messages
            .find(doc! { "thread_id": id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn count_messages(&self, thread_id: &str) -> Result<u64> {
        let Some(id) = parse_id(thread_id) else {
            return Ok(0);
        };
        Ok(self.messages.count_documents(doc! { "thread_id": id }).await?)
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        let id = require_id(message_id)?;
        self.messages.delete_one(doc! { "_id": id }).await?;
        self.summaries.delete_many(doc! { "message_id": id }).await?;
        Ok(())
    }

    async fn delete_messages_from(
        &self,
        thread_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let id = require_id(thread_id)?;
        let filter = doc! {
            "thread_id": id,
            "created_at": { "$gte": bson_time(cutoff) },
        };

        let doomed: Vec<ObjectId> = self
            .messages
            .find(filter)
            .await?
            .map_ok(|m| m.id)
            .try_collect()
            .await?;
        if doomed.is_empty() {
            return Ok(Vec::new());
        }

        // Deletes target the ids read above, so a message inserted meanwhile
        // survives and the returned list is exactly what was removed.
        // Summaries go first: if the second call fails the messages remain
        // and the cut can be retried.
        self.summaries.delete_many(ids_filter("message_id", &doomed)).await?;
        self.messages.delete_many(ids_filter("_id", &doomed)).await?;

        Ok(doomed.into_iter().map(|id| id.to_hex()).collect())
    }

    async fn insert_summary(
        &self,
        thread_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<MessageSummary> {
        let summary = MongoSummary {
            id: ObjectId::new(),
            thread_id: require_id(thread_id)?,
            message_id: require_id(message_id)?,
            content: content.to_string(),
            created_at: self.next_timestamp().await,
        };
        self.summaries.insert_one(&summary).await?;
        Ok(summary.into())
    }

    async fn get_summaries(&self, thread_id: &str) -> Result<Vec<MessageSummary>> {
        let Some(id) = parse_id(thread_id) else {
            return Ok(Vec::new());
        };
        let summaries: Vec<MongoSummary> = self
            .summaries
            .find(doc! { "thread_id": id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(summaries.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.threads.estimated_document_count().await?;
        Ok(())
    }
}
