use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, Record};
use std::str::FromStr;
use weir_dns_domain::{normalize_domain, DomainError};

/// The uniform failover signal: no message, NXDOMAIN, or no record with
/// data in any of the three sections.
pub fn is_empty_response(message: Option<&Message>) -> bool {
    let Some(message) = message else {
        return true;
    };

    if message.response_code() == ResponseCode::NXDomain {
        return true;
    }

    !has_content(message.answers())
        && !has_content(message.name_servers())
        && !has_content(message.additionals())
}

#[inline]
fn has_content(records: &[Record]) -> bool {
    records.iter().any(|record| record.data().is_some())
}

/// Empty response skeleton for `request`: same id, opcode, questions and
/// recursion-desired bit.
pub fn reply_to(request: &Message) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(ResponseCode::NoError);
    response.add_queries(request.queries().iter().cloned());
    response
}

/// Normalized name of the first question.
pub fn question_domain(request: &Message) -> Option<String> {
    request
        .queries()
        .first()
        .map(|q| normalize_domain(&q.name().to_ascii()))
}

/// Fully qualified [`Name`] for a domain written with or without the root dot.
pub fn fqdn(domain: &str) -> Result<Name, DomainError> {
    let domain = domain.trim();
    let absolute = if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    };
    Name::from_str(&absolute).map_err(|e| DomainError::InvalidDomainName(format!("{domain}: {e}")))
}

/// Same request with every question renamed to `name`.
pub fn with_question_name(request: &Message, name: &Name) -> Message {
    let mut renamed = request.clone();
    let queries: Vec<Query> = renamed
        .take_queries()
        .into_iter()
        .map(|mut q| {
            q.set_name(name.clone());
            q
        })
        .collect();
    renamed.add_queries(queries);
    renamed
}

/// Rename records owned by `from` to `to` across all three sections.
pub fn rename_records(message: &mut Message, from: &Name, to: &Name) {
    let rename = |records: Vec<Record>| -> Vec<Record> {
        records
            .into_iter()
            .map(|mut record| {
                if record.name() == from {
                    record.set_name(to.clone());
                }
                record
            })
            .collect()
    };

    let answers = rename(message.take_answers());
    let name_servers = rename(message.take_name_servers());
    let additionals = rename(message.take_additionals());
    message.insert_answers(answers);
    message.insert_name_servers(name_servers);
    message.insert_additionals(additionals);
}
