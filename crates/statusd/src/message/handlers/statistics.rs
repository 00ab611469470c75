//! Popularity rankings over stored subscriptions.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::message::handler::{MessageHandler, undeclared};
use crate::message::{ClientHandle, DispatchError, PopularityEntry, Request, RequestKind, Response};
use crate::persistence::EntityStore;

use super::require_instance;

/// Ranks channels and users of an instance by how many subscriptions they
/// have.
///
/// Entries are ordered by count descending, ties broken by name ascending.
/// A request without a limit falls back to the handler's default limit; no
/// default means the full ranking is returned.
pub struct StatisticsHandler {
    store: Arc<dyn EntityStore>,
    default_limit: Option<usize>,
}

impl StatisticsHandler {
    /// Creates a handler reading from `store`.
    pub fn new(store: Arc<dyn EntityStore>, default_limit: Option<usize>) -> Self {
        Self {
            store,
            default_limit,
        }
    }

    fn popular_channels(
        &self,
        instance_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<PopularityEntry>, DispatchError> {
        let names: BTreeMap<_, _> = self
            .store
            .channels(instance_name)?
            .into_iter()
            .map(|channel| (channel.id, channel.name))
            .collect();
        let mut counts = BTreeMap::new();
        for subscription in self.store.subscriptions(instance_name)? {
            if let Some(name) = names.get(&subscription.channel_id) {
                *counts.entry(name.as_str()).or_insert(0) += 1;
            }
        }
        Ok(rank(counts, limit.or(self.default_limit)))
    }

    fn popular_users(
        &self,
        instance_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<PopularityEntry>, DispatchError> {
        let names: BTreeMap<_, _> = self
            .store
            .users(instance_name)?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();
        let mut counts = BTreeMap::new();
        for subscription in self.store.subscriptions(instance_name)? {
            let Some(name) = subscription.user_id.and_then(|id| names.get(&id)) else {
                continue;
            };
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
        Ok(rank(counts, limit.or(self.default_limit)))
    }
}

fn rank(counts: BTreeMap<&str, usize>, limit: Option<usize>) -> Vec<PopularityEntry> {
    let mut entries: Vec<_> = counts
        .into_iter()
        .map(|(name, count)| PopularityEntry::new(name, count))
        .collect();
    // Stable sort keeps the map's name order among equal counts.
    entries.sort_by(|left, right| right.count.cmp(&left.count));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

impl MessageHandler for StatisticsHandler {
    fn supported_requests(&self) -> &[RequestKind] {
        &[RequestKind::PopularChannels, RequestKind::PopularUsers]
    }

    fn handle(
        &self,
        request: &Request,
        _sender: &ClientHandle,
    ) -> Result<Response, DispatchError> {
        match request {
            Request::PopularChannels {
                instance_name,
                limit,
            } => {
                require_instance(self.store.as_ref(), instance_name)?;
                Ok(Response::PopularChannels {
                    instance_name: instance_name.clone(),
                    channels: self.popular_channels(instance_name, *limit)?,
                })
            }
            Request::PopularUsers {
                instance_name,
                limit,
            } => {
                require_instance(self.store.as_ref(), instance_name)?;
                Ok(Response::PopularUsers {
                    instance_name: instance_name.clone(),
                    users: self.popular_users(instance_name, *limit)?,
                })
            }
            other => Err(undeclared(self, other)),
        }
    }
}
