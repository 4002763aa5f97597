//! Transport abstraction between the synchronizer and the backend.
//!
//! The synchronizer only needs two capabilities: a count-only query and a
//! change-notification channel. Both are defined as traits here so the core
//! logic can be exercised against fakes (see [`crate::testkit`]), with the
//! Supabase-style implementation provided by [`postgrest`] and [`realtime`].

pub mod postgrest;
pub mod realtime;

use async_trait::async_trait;

use crate::domain::{ChangeEvent, Filter};
use crate::error::TransportError;

pub use postgrest::PostgrestClient;
pub use realtime::RealtimeChannel;

/// Events delivered by a [`ChangeChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The channel join was acknowledged; notifications will now flow.
    Joined,
    /// A row in the watched table was inserted, updated, or deleted.
    Change(ChangeEvent),
    /// The channel closed or errored and will deliver nothing further.
    Closed { reason: String },
}

/// A live change-notification channel for one table.
///
/// Pull-based: the owner drives the channel by awaiting `next_event()`.
/// Returning `None` means the channel is finished and must be treated the
/// same as [`ChannelEvent::Closed`].
#[async_trait]
pub trait ChangeChannel: Send {
    async fn next_event(&mut self) -> Option<ChannelEvent>;

    /// Release the channel. Safe to call on an already-closed channel.
    async fn close(&mut self);
}

/// Backend collaborator providing count queries and change channels.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Count the rows in `table` matching `filter` without fetching them.
    async fn count_rows(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> std::result::Result<u64, TransportError>;

    /// Open a change channel for `table` restricted to `filter`.
    async fn open_channel(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> std::result::Result<Box<dyn ChangeChannel>, TransportError>;
}

/// Supabase-style transport: PostgREST for counts, Phoenix websocket
/// channels for change notifications.
pub struct SupabaseTransport {
    rest: PostgrestClient,
    realtime_url: String,
    api_key: String,
}

impl SupabaseTransport {
    pub fn new(rest_url: String, realtime_url: String, api_key: String) -> Self {
        Self {
            rest: PostgrestClient::new(rest_url, api_key.clone()),
            realtime_url,
            api_key,
        }
    }
}

#[async_trait]
impl Transport for SupabaseTransport {
    async fn count_rows(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> std::result::Result<u64, TransportError> {
        self.rest.count(table, filter).await
    }

    async fn open_channel(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> std::result::Result<Box<dyn ChangeChannel>, TransportError> {
        let channel =
            RealtimeChannel::open(&self.realtime_url, &self.api_key, table, filter).await?;
        Ok(Box::new(channel))
    }
}
