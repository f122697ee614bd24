//! Per-Command Methods
//!
//! Thin wrappers over [`Client::execute`]: split the arguments into bare
//! tokens and free text, decode the reply. Collections, buckets, objects
//! and other bare arguments must be single tokens; free text may be
//! anything.
//!
//! ### Search channel
//! - `QUERY collection bucket "terms" [LIMIT] [OFFSET] [LANG]`
//! - `SUGGEST collection bucket "word" [LIMIT]`
//! - `LIST collection [bucket] [LIMIT] [OFFSET]`
//!
//! ### Ingest channel
//! - `PUSH collection bucket object "text" [LANG]`
//! - `POP collection bucket object "text"`
//! - `COUNT collection [bucket [object]]`
//! - `FLUSHC collection` / `FLUSHB collection bucket` /
//!   `FLUSHO collection bucket object`
//!
//! ### Control channel
//! - `TRIGGER [action] [data]`
//! - `INFO`
//!
//! ### Every channel
//! - `PING`, `HELP manual`, `QUIT`

use crate::client::Client;
use crate::error::{ClientError, SonicResult};
use crate::protocol::{
    chunk_text, parse_count, parse_info, parse_results, Action, Command, Modifiers,
};
use std::collections::BTreeMap;
use tracing::debug;

impl Client {
    /// Searches `collection`/`bucket` for `terms`; returns matching object
    /// identifiers, best match first.
    pub async fn query(
        &self,
        collection: &str,
        bucket: &str,
        terms: &str,
        modifiers: Modifiers,
    ) -> SonicResult<Vec<String>> {
        let reply = self
            .execute(Command::Query, &[collection, bucket], Some(terms), &modifiers)
            .await?;
        parse_results(Command::Query, &reply)
    }

    /// Completes `word` from the terms indexed in `collection`/`bucket`.
    pub async fn suggest(
        &self,
        collection: &str,
        bucket: &str,
        word: &str,
        modifiers: Modifiers,
    ) -> SonicResult<Vec<String>> {
        let reply = self
            .execute(Command::Suggest, &[collection, bucket], Some(word), &modifiers)
            .await?;
        parse_results(Command::Suggest, &reply)
    }

    /// Enumerates the terms indexed in `collection`, optionally one bucket.
    pub async fn list(
        &self,
        collection: &str,
        bucket: Option<&str>,
        modifiers: Modifiers,
    ) -> SonicResult<Vec<String>> {
        let reply = self
            .execute(
                Command::List,
                &[collection, bucket.unwrap_or_default()],
                None,
                &modifiers,
            )
            .await?;
        parse_results(Command::List, &reply)
    }

    /// Pings the engine; returns `PONG`.
    pub async fn ping(&self) -> SonicResult<String> {
        self.execute(Command::Ping, &[], None, &Modifiers::default())
            .await
    }

    /// Shows a help manual (the engine knows `commands`).
    pub async fn help(&self, manual: &str) -> SonicResult<String> {
        self.execute(Command::Help, &[manual], None, &Modifiers::default())
            .await
    }

    /// Ends the session; returns `ENDED quit`. The pool is closed afterwards.
    pub async fn quit(&self) -> SonicResult<String> {
        self.execute(Command::Quit, &[], None, &Modifiers::default())
            .await
    }

    /// Indexes `text` for `object`.
    ///
    /// Text is trimmed, then sent in as many sequential `PUSH` commands as
    /// the configured buffer size requires. Returns the reply to the last
    /// one.
    pub async fn push(
        &self,
        collection: &str,
        bucket: &str,
        object: &str,
        text: &str,
        locale: Option<&str>,
    ) -> SonicResult<String> {
        self.check(Command::Push)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyText.into());
        }

        let mut modifiers = Modifiers::default();
        if let Some(locale) = locale {
            modifiers = modifiers.locale(locale);
        }

        let mut reply = String::new();
        for (n, chunk) in chunk_text(text, self.config().buffer_size).enumerate() {
            if n > 0 {
                debug!(collection, bucket, object, chunk = n, "Pushing continuation chunk");
            }
            reply = self
                .execute(
                    Command::Push,
                    &[collection, bucket, object],
                    Some(chunk),
                    &modifiers,
                )
                .await?;
        }
        Ok(reply)
    }

    /// Removes `text` from `object`'s index; returns the number of terms
    /// removed.
    pub async fn pop(
        &self,
        collection: &str,
        bucket: &str,
        object: &str,
        text: &str,
    ) -> SonicResult<u64> {
        let reply = self
            .execute(
                Command::Pop,
                &[collection, bucket, object],
                Some(text),
                &Modifiers::default(),
            )
            .await?;
        parse_count(Command::Pop, &reply)
    }

    /// Flushes a whole collection; returns the number of flushed items.
    pub async fn flushc(&self, collection: &str) -> SonicResult<u64> {
        let reply = self
            .execute(Command::Flushc, &[collection], None, &Modifiers::default())
            .await?;
        parse_count(Command::Flushc, &reply)
    }

    /// Flushes one bucket of a collection.
    pub async fn flushb(&self, collection: &str, bucket: &str) -> SonicResult<u64> {
        let reply = self
            .execute(
                Command::Flushb,
                &[collection, bucket],
                None,
                &Modifiers::default(),
            )
            .await?;
        parse_count(Command::Flushb, &reply)
    }

    /// Flushes one object of a bucket.
    pub async fn flusho(&self, collection: &str, bucket: &str, object: &str) -> SonicResult<u64> {
        let reply = self
            .execute(
                Command::Flusho,
                &[collection, bucket, object],
                None,
                &Modifiers::default(),
            )
            .await?;
        parse_count(Command::Flusho, &reply)
    }

    /// Counts indexed data at collection, bucket or object level.
    ///
    /// `object` is only meaningful together with `bucket` and is ignored
    /// without it.
    pub async fn count(
        &self,
        collection: &str,
        bucket: Option<&str>,
        object: Option<&str>,
    ) -> SonicResult<u64> {
        let object = bucket.and(object);
        let reply = self
            .execute(
                Command::Count,
                &[
                    collection,
                    bucket.unwrap_or_default(),
                    object.unwrap_or_default(),
                ],
                None,
                &Modifiers::default(),
            )
            .await?;
        parse_count(Command::Count, &reply)
    }

    /// Runs an administrative action; returns `OK`.
    pub async fn trigger(&self, action: Option<&Action>) -> SonicResult<String> {
        let tokens = action.map(Action::tokens).unwrap_or_default();
        self.execute(Command::Trigger, &tokens, None, &Modifiers::default())
            .await
    }

    /// Fetches engine statistics as `key -> value`.
    pub async fn info(&self) -> SonicResult<BTreeMap<String, String>> {
        let reply = self
            .execute(Command::Info, &[], None, &Modifiers::default())
            .await?;
        parse_info(&reply)
    }
}
