use super::{RequestContext, ResolutionContext, Source, SourceKind};
use crate::dns::message::is_empty_response;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;
use weir_dns_domain::DomainError;

/// Round robin over its sources.
///
/// The rotation index lives inside a single arbiter task. Callers ask for
/// the next index over a channel, so every dispatch advances the index
/// exactly once no matter how many queries run concurrently.
pub struct LoadBalancedSource {
    name: String,
    sources: Vec<Arc<dyn Source>>,
    picks: mpsc::Sender<oneshot::Sender<usize>>,
    arbiter: JoinHandle<()>,
}

impl LoadBalancedSource {
    /// Must be called from within a tokio runtime.
    pub fn new(name: impl Into<String>, sources: Vec<Arc<dyn Source>>) -> Result<Self, DomainError> {
        let name = name.into();
        if sources.is_empty() {
            return Err(DomainError::InvalidSourceSpec(format!(
                "load balanced source {name} has no sources"
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DomainError::ResolutionFailed(format!("lb:{name}: {e}")))?;

        let (picks, mut requests) = mpsc::channel::<oneshot::Sender<usize>>(64);
        let count = sources.len();
        let arbiter = runtime.spawn(async move {
            let mut index = 0usize;
            while let Some(reply) = requests.recv().await {
                let _ = reply.send(index);
                index = (index + 1) % count;
            }
        });

        Ok(Self {
            name,
            sources,
            picks,
            arbiter,
        })
    }

    async fn next_index(&self) -> Result<usize, DomainError> {
        let (reply, chosen) = oneshot::channel();
        let stopped = || DomainError::ResolutionFailed(format!("lb:{} is closed", self.name));
        self.picks.send(reply).await.map_err(|_| stopped())?;
        chosen.await.map_err(|_| stopped())
    }
}

impl Drop for LoadBalancedSource {
    fn drop(&mut self) {
        self.arbiter.abort();
    }
}

#[async_trait]
impl Source for LoadBalancedSource {
    fn name(&self) -> String {
        format!("lb:{}", self.name)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::LoadBalanced
    }

    async fn answer(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let attempts = self.sources.len();

        for _ in 0..attempts {
            let source = &self.sources[self.next_index().await?];
            match source.answer(rcon, ctx, request).await {
                Ok(response) if !is_empty_response(response.as_ref()) => {
                    ctx.source_used = Some(format!("lb:{}({})", self.name, source.name()));
                    return Ok(response);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(source = %source.name(), group = %self.name, error = %e, "Balanced source failed");
                }
            }
        }

        Err(DomainError::ResolutionFailed(format!(
            "lb:{} could not answer in {} tries",
            self.name, attempts
        )))
    }

    async fn close(&self) {
        self.arbiter.abort();
        for source in &self.sources {
            source.close().await;
        }
    }
}
