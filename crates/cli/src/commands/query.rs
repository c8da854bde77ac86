use crate::di::Services;
use anyhow::{anyhow, Context};
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::RecordType;
use serde::Serialize;
use std::str::FromStr;
use weir_dns_domain::config::DEFAULT_RESOLVER;
use weir_dns_domain::{normalize_domain, Match};
use weir_dns_infrastructure::dns::message::fqdn;
use weir_dns_infrastructure::dns::{RequestContext, ResolutionResult};

const QUERY_ID: u16 = 0x5745;

#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub domain: String,
    pub record_type: String,
    pub group: String,
    pub resolvers: Vec<String>,
}

/// What the filter decided and, unless blocked, how the name resolved.
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    pub domain: String,
    pub record_type: String,
    pub group: String,
    pub decision: Match,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    pub answers: Vec<String>,
}

pub async fn run_query(services: &Services, args: QueryArgs) -> anyhow::Result<QueryOutcome> {
    let record_type = RecordType::from_str(&args.record_type.to_ascii_uppercase())
        .map_err(|e| anyhow!("unknown record type '{}': {}", args.record_type, e))?;
    let domain = normalize_domain(&args.domain);

    let list_names = services
        .config
        .group_list_names(&args.group)
        .ok_or_else(|| anyhow!("unknown group '{}'", args.group))?;
    let verdict = services.check_domain.execute(&list_names, &domain).await;

    let mut outcome = QueryOutcome {
        domain: domain.clone(),
        record_type: record_type.to_string(),
        group: args.group.clone(),
        decision: verdict.decision,
        list: verdict.list_name().map(str::to_string),
        rule: (!verdict.is_none()).then(|| verdict.rule.clone()),
        resolution: None,
        response_code: None,
        answers: Vec::new(),
    };

    if verdict.decision == Match::Block {
        return Ok(outcome);
    }

    let mut request = Message::new();
    request.set_id(QUERY_ID).set_recursion_desired(true);
    request.add_query(Query::query(
        fqdn(&domain).with_context(|| format!("invalid domain '{}'", domain))?,
        record_type,
    ));

    let resolvers = if args.resolvers.is_empty() {
        vec![DEFAULT_RESOLVER.to_string()]
    } else {
        args.resolvers
    };

    let map = services.resolvers.load();
    let answer = map
        .answer_multi_resolvers(&RequestContext::default(), &resolvers, &request)
        .await?;

    if let Some((response, resolution)) = answer {
        outcome.response_code = Some(response.response_code().to_string());
        outcome.answers = response
            .answers()
            .iter()
            .map(|record| record.to_string())
            .collect();
        outcome.resolution = Some(resolution);
    }

    Ok(outcome)
}
