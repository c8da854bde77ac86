use super::{RequestContext, ResolutionContext, Source, SourceKind};
use crate::dns::message::{fqdn, reply_to};
use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::rr::rdata::PTR;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_proto::serialize::txt::Parser;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use weir_dns_domain::domain_name::{parent_domain, reverse_lookup_domain};
use weir_dns_domain::{normalize_domain, DomainError};

type TypeIndex = FxHashMap<RecordType, Vec<Record>>;
type ClassIndex = FxHashMap<DNSClass, TypeIndex>;

/// Answers from the records of a master-format zone file.
pub struct ZoneSource {
    path: String,
    records: FxHashMap<String, ClassIndex>,
}

impl ZoneSource {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::parse(path.display().to_string(), &content)
    }

    /// Parse master-format `content`. Names without an `$ORIGIN` are taken
    /// relative to the root. A malformed file is rejected as a whole.
    pub fn parse(path: impl Into<String>, content: &str) -> Result<Self, DomainError> {
        let path = path.into();
        let parser = Parser::new(content, Some(PathBuf::from(&path)), Some(Name::root()));
        let (_, rrsets) = parser.parse().map_err(|e| {
            warn!(path = %path, error = %e, "Rejecting malformed zone file");
            DomainError::ParseError {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut source = Self {
            path,
            records: FxHashMap::default(),
        };

        for record in rrsets.values().flat_map(|rrset| rrset.records_without_rrsigs()) {
            if let Some(ptr) = derived_pointer(record) {
                source.insert(ptr);
            }
            source.insert(record.clone());
        }

        debug!(path = %source.path, names = source.records.len(), "Zone file loaded");
        Ok(source)
    }

    fn insert(&mut self, record: Record) {
        self.records
            .entry(normalize_domain(&record.name().to_ascii()))
            .or_default()
            .entry(record.dns_class())
            .or_default()
            .entry(record.record_type())
            .or_default()
            .push(record);
    }

    fn collect(&self, name: &str, qclass: DNSClass, qtype: RecordType, out: &mut Vec<Record>) {
        let Some(classes) = self.records.get(name) else {
            return;
        };

        let types: Vec<&TypeIndex> = if qclass == DNSClass::ANY {
            classes.values().collect()
        } else {
            classes.get(&qclass).into_iter().collect()
        };

        for index in types {
            if qtype == RecordType::ANY {
                out.extend(index.values().flatten().cloned());
            } else if let Some(records) = index.get(&qtype) {
                out.extend(records.iter().cloned());
            }
        }
    }

    fn lookup(&self, name: &str, qclass: DNSClass, qtype: RecordType) -> Vec<Record> {
        let mut records = Vec::new();
        if matches!(qtype, RecordType::A | RecordType::AAAA) {
            self.collect(name, qclass, RecordType::CNAME, &mut records);
        }
        self.collect(name, qclass, qtype, &mut records);
        records
    }
}

/// PTR record pointing back at the owner of an A or AAAA record.
fn derived_pointer(record: &Record) -> Option<Record> {
    let ip = match record.data()? {
        RData::A(a) => std::net::IpAddr::V4(a.0),
        RData::AAAA(aaaa) => std::net::IpAddr::V6(aaaa.0),
        _ => return None,
    };
    let owner = fqdn(&reverse_lookup_domain(&ip)).ok()?;
    let mut ptr = Record::from_rdata(owner, record.ttl(), RData::PTR(PTR(record.name().clone())));
    ptr.set_dns_class(record.dns_class());
    Some(ptr)
}

#[async_trait]
impl Source for ZoneSource {
    fn name(&self) -> String {
        format!("zonefile:{}", self.path)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Zone
    }

    async fn answer(
        &self,
        _rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let Some(question) = request.queries().first() else {
            return Ok(None);
        };

        let owner: Name = question.name().clone();
        let name = normalize_domain(&owner.to_ascii());
        let (qclass, qtype) = (question.query_class(), question.query_type());

        let mut records = self.lookup(&name, qclass, qtype);
        if records.is_empty() {
            if let Some(parent) = parent_domain(&name) {
                records = self.lookup(&format!("*.{parent}"), qclass, qtype);
            }
        }

        if records.is_empty() {
            return Ok(None);
        }

        for record in &mut records {
            record.set_name(owner.clone());
        }

        let mut response = reply_to(request);
        response.set_authoritative(true);
        response.add_answers(records);

        ctx.stored = true;
        ctx.source_used = Some(self.name());
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query;
    use hickory_proto::rr::rdata::A;
    use std::io::Write;
    use std::net::Ipv4Addr;

    const ZONE: &str = "\
$ORIGIN home.lan.
$TTL 600
nas       A     192.168.2.10
web       CNAME nas
*.apps    A     192.168.2.50
";

    fn request(name: &str, qtype: RecordType) -> Message {
        let mut message = Message::new();
        message.add_query(Query::query(fqdn(name).unwrap(), qtype));
        message
    }

    async fn ask(source: &ZoneSource, name: &str, qtype: RecordType) -> Option<Message> {
        let mut ctx = ResolutionContext::new();
        source
            .answer(&RequestContext::default(), &mut ctx, &request(name, qtype))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_answers_from_zone() {
        let source = ZoneSource::parse("home.zone", ZONE).unwrap();
        let response = ask(&source, "nas.home.lan", RecordType::A).await.unwrap();
        assert!(response.authoritative());
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].ttl(), 600);
        assert_eq!(
            response.answers()[0].data(),
            Some(&RData::A(A(Ipv4Addr::new(192, 168, 2, 10))))
        );
    }

    #[tokio::test]
    async fn test_cname_comes_first() {
        let source = ZoneSource::parse("home.zone", ZONE).unwrap();
        let response = ask(&source, "web.home.lan", RecordType::A).await.unwrap();
        assert_eq!(response.answers()[0].record_type(), RecordType::CNAME);
    }

    #[tokio::test]
    async fn test_wildcard_fallback_one_level() {
        let source = ZoneSource::parse("home.zone", ZONE).unwrap();
        let response = ask(&source, "grafana.apps.home.lan", RecordType::A).await.unwrap();
        assert_eq!(response.answers()[0].name(), &fqdn("grafana.apps.home.lan").unwrap());

        assert!(ask(&source, "a.b.apps.home.lan", RecordType::A).await.is_none());
    }

    #[tokio::test]
    async fn test_derived_pointer_records() {
        let source = ZoneSource::parse("home.zone", ZONE).unwrap();
        let response = ask(&source, "10.2.168.192.in-addr.arpa", RecordType::PTR)
            .await
            .unwrap();
        match response.answers()[0].data() {
            Some(RData::PTR(ptr)) => assert_eq!(ptr.0.to_ascii(), "nas.home.lan."),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_marks_stored() {
        let source = ZoneSource::parse("home.zone", ZONE).unwrap();
        let mut ctx = ResolutionContext::new();
        source
            .answer(
                &RequestContext::default(),
                &mut ctx,
                &request("nas.home.lan", RecordType::A),
            )
            .await
            .unwrap();
        assert!(ctx.stored);
        assert_eq!(ctx.source_used.as_deref(), Some("zonefile:home.zone"));
    }

    #[tokio::test]
    async fn test_multi_line_soa_and_other_types() {
        let zone = "\
$ORIGIN lab.test.
$TTL 300
@   IN SOA ns1 admin (
        2024010101 ; serial
        3600 900 604800 60 )
    IN NS  ns1
    IN MX  10 mail
ns1 IN A   10.1.0.1
mail 120 IN AAAA fd00::25
";
        let source = ZoneSource::parse("lab.zone", zone).unwrap();

        let soa = ask(&source, "lab.test", RecordType::SOA).await.unwrap();
        assert_eq!(soa.answers()[0].record_type(), RecordType::SOA);

        let mx = ask(&source, "lab.test", RecordType::MX).await.unwrap();
        match mx.answers()[0].data() {
            Some(RData::MX(mx)) => assert_eq!(mx.exchange().to_ascii(), "mail.lab.test."),
            other => panic!("unexpected {:?}", other),
        }

        let aaaa = ask(&source, "mail.lab.test", RecordType::AAAA).await.unwrap();
        assert_eq!(aaaa.answers()[0].ttl(), 120);

        let any = ask(&source, "lab.test", RecordType::ANY).await.unwrap();
        assert_eq!(any.answers().len(), 3);
    }

    #[test]
    fn test_malformed_zone_is_rejected() {
        let zone = "$ORIGIN home.lan.\n$TTL 600\nnas A not-an-address\n";
        match ZoneSource::parse("bad.zone", zone) {
            Err(DomainError::ParseError { path, .. }) => assert_eq!(path, "bad.zone"),
            other => panic!("unexpected {:?}", other.map(|source| source.path)),
        }
    }

    #[test]
    fn test_load_from_disk_and_missing_file() {
        let mut file = tempfile::Builder::new().suffix(".zone").tempfile().unwrap();
        file.write_all(ZONE.as_bytes()).unwrap();
        assert!(ZoneSource::load(file.path()).is_ok());

        assert!(ZoneSource::load("/nonexistent/weir/home.zone").is_err());
    }
}
