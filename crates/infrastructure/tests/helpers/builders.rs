#![allow(dead_code)]
use async_trait::async_trait;
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use weir_dns_domain::{DomainError, FilterList, RuleType};
use weir_dns_infrastructure::dns::message::reply_to;
use weir_dns_infrastructure::dns::source::{
    RequestContext, ResolutionContext, Source, SourceKind,
};

/// A recursion-desired question for `name`.
pub fn query(name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message.set_id(4242).set_recursion_desired(true);
    message.add_query(Query::query(
        Name::from_str(&format!("{}.", name.trim_end_matches('.'))).unwrap(),
        record_type,
    ));
    message
}

/// First A record of a response.
pub fn first_ipv4(message: &Message) -> Option<Ipv4Addr> {
    message.answers().iter().find_map(|record| match record.data() {
        Some(RData::A(a)) => Some(a.0),
        _ => None,
    })
}

pub fn filter_list(name: &str, list_type: RuleType, path: &Path) -> Arc<FilterList> {
    Arc::new(FilterList::new(
        name,
        list_type,
        path.display().to_string(),
        path,
    ))
}

/// What a [`MockSource`] does with every question.
#[derive(Clone, Copy)]
pub enum Behaviour {
    Answer(Ipv4Addr),
    Empty,
    Fail,
}

/// Scripted source that counts how often it was asked.
pub struct MockSource {
    name: String,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(name: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn answering(name: &str, ip: Ipv4Addr) -> Arc<Self> {
        Self::new(name, Behaviour::Answer(ip))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Dns
    }

    async fn answer(
        &self,
        _rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Fail => Err(DomainError::TransportError(format!("{} is down", self.name))),
            Behaviour::Empty => Ok(Some(reply_to(request))),
            Behaviour::Answer(ip) => {
                let mut response = reply_to(request);
                let name = request.queries()[0].name().clone();
                response.add_answer(Record::from_rdata(name, 30, RData::A(A(ip))));
                ctx.source_used = Some(self.name.clone());
                Ok(Some(response))
            }
        }
    }
}
