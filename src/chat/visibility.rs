use super::log::{Message, MessageKind};

/// Audience filter over the message log. This is the sole authorization
/// boundary for reads; it runs before any limit slicing.
///
/// A message passes when it is a broadcast (status notices count, being
/// system broadcasts), when it is addressed to the requester, or when the
/// requester authored it. An absent or empty requester sees only the
/// broadcast kinds.
pub fn visible(messages: Vec<Message>, requester: Option<&str>) -> Vec<Message> {
    let requester = requester.filter(|name| !name.is_empty());
    messages
        .into_iter()
        .filter(|message| can_see(message, requester))
        .collect()
}

fn can_see(message: &Message, requester: Option<&str>) -> bool {
    match message.kind {
        MessageKind::Broadcast | MessageKind::Status => true,
        MessageKind::Private => {
            requester.is_some_and(|name| message.to == name || message.from == name)
        }
    }
}
