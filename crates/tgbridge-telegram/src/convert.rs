//! teloxide types → core update model.

use teloxide::types as tg;

use tgbridge_core::{
    domain::{Chat, ChatId, ChatKind, MessageId, User, UserId},
    update::{CallbackQuery, IncomingMessage, Update, UpdateKind},
};

pub fn update(u: tg::Update) -> Update {
    let kind = match u.kind {
        tg::UpdateKind::Message(m) => UpdateKind::Message(message(&m)),
        tg::UpdateKind::CallbackQuery(q) => UpdateKind::CallbackQuery(callback_query(&q)),
        _ => UpdateKind::Other,
    };
    Update { id: u.id, kind }
}

pub fn message(m: &tg::Message) -> IncomingMessage {
    IncomingMessage {
        id: MessageId(m.id.0),
        chat: chat(&m.chat),
        from: m.from().map(user),
        text: m.text().map(str::to_string),
        caption: m.caption().map(str::to_string),
    }
}

pub fn callback_query(q: &tg::CallbackQuery) -> CallbackQuery {
    CallbackQuery {
        id: q.id.clone(),
        from: user(&q.from),
        data: q.data.clone(),
        message: q.message.as_ref().map(message),
    }
}

pub fn user(u: &tg::User) -> User {
    User {
        id: UserId(u.id.0),
        is_bot: u.is_bot,
        first_name: u.first_name.clone(),
        username: u.username.clone(),
    }
}

pub fn chat(c: &tg::Chat) -> Chat {
    let kind = if c.is_private() {
        ChatKind::Private
    } else if c.is_channel() {
        ChatKind::Channel
    } else if c.is_supergroup() {
        ChatKind::Supergroup
    } else {
        ChatKind::Group
    };

    Chat {
        id: ChatId(c.id.0),
        kind,
        title: c.title().map(str::to_string),
        username: c.username().map(str::to_string),
    }
}
