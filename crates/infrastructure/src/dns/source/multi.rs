use super::{RequestContext, ResolutionContext, Source, SourceKind};
use crate::dns::message::is_empty_response;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::sync::Arc;
use tracing::debug;
use weir_dns_domain::DomainError;

/// Tries its sources strictly in order until one answers.
pub struct MultiSource {
    name: String,
    sources: Vec<Arc<dyn Source>>,
}

impl MultiSource {
    pub fn new(name: impl Into<String>, sources: Vec<Arc<dyn Source>>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }

    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }
}

#[async_trait]
impl Source for MultiSource {
    fn name(&self) -> String {
        format!("ms:{}", self.name)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Multi
    }

    async fn answer(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let mut failures = 0usize;

        for source in &self.sources {
            match source.answer(rcon, ctx, request).await {
                Ok(response) if !is_empty_response(response.as_ref()) => {
                    ctx.source_used = Some(format!("ms:{}({})", self.name, source.name()));
                    return Ok(response);
                }
                Ok(_) => {}
                Err(e) => {
                    failures += 1;
                    debug!(source = %source.name(), group = %self.name, error = %e, "Source failed, trying next");
                }
            }
        }

        if failures > 0 {
            return Err(DomainError::ResolutionFailed(format!(
                "no source in ms:{} had a response ({} failed)",
                self.name, failures
            )));
        }
        Ok(None)
    }

    async fn close(&self) {
        for source in &self.sources {
            source.close().await;
        }
    }
}
