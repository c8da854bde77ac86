use super::{RequestContext, ResolutionContext, Source, SourceKind};
use crate::dns::message::is_empty_response;
use async_trait::async_trait;
use hickory_proto::op::Message;
use weir_dns_domain::DomainError;

/// Delegates to another resolver of the same [`ResolverMap`](crate::dns::ResolverMap).
pub struct ResolverRefSource {
    resolver: String,
}

impl ResolverRefSource {
    pub fn new(resolver: impl Into<String>) -> Self {
        Self {
            resolver: resolver.into(),
        }
    }
}

#[async_trait]
impl Source for ResolverRefSource {
    fn name(&self) -> String {
        self.resolver.clone()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ResolverRef
    }

    async fn answer(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let Some(map) = ctx.resolver_map else {
            return Ok(None);
        };
        if ctx.has_visited(&self.resolver) {
            return Ok(None);
        }

        let response = map
            .answer_with_context(rcon, ctx, &self.resolver, request)
            .await?;

        if !is_empty_response(response.as_ref()) {
            ctx.set_source_used_if_unset(format!("resolver:{}", self.resolver));
        }
        Ok(response)
    }
}
