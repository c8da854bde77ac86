use hickory_proto::op::Message;
use std::fmt::Write;

/// `partition|name|class|type[|name|class|type...]`, lowercased.
///
/// Question order matters; `None` when the request has no question.
pub fn cache_key(partition: &str, request: &Message) -> Option<String> {
    let queries = request.queries();
    if queries.is_empty() {
        return None;
    }

    let mut key = String::with_capacity(partition.len() + queries.len() * 32);
    key.push_str(partition);
    for query in queries {
        // writing into a String cannot fail
        let _ = write!(
            key,
            "|{}|{}|{}",
            query.name(),
            query.query_class(),
            query.query_type()
        );
    }
    key.make_ascii_lowercase();
    Some(key)
}
