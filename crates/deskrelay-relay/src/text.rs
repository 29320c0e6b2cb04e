// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic titles, user-facing notices, and callback-data strings.
//!
//! Titles carry a color marker so operators can scan the topic list:
//! red for open, green for closed or banned.

use deskrelay_core::{TicketId, UserId};

use crate::ticket::ClosedBy;

/// Callback data: user pressed "contact support" on the main menu.
pub const CB_CONTACT: &str = "ticket:start";
/// Callback data: user cancelled the problem prompt.
pub const CB_CANCEL: &str = "ticket:cancel";
/// Callback data: user closes their own ticket.
pub const CB_CLOSE: &str = "ticket:close";
/// Callback-data prefix: operator closes a ticket from the topic notice.
pub const CB_TOPIC_CLOSE_PREFIX: &str = "topic:close:";

/// Settings keys written by the admin tooling.
pub const SETTING_MAIN_MENU: &str = "main_menu_text";
pub const SETTING_BAN_CONTACT: &str = "ban_contact";
pub const SETTING_PANEL_URL: &str = "panel_base_url";

pub fn topic_close_data(id: TicketId) -> String {
    format!("{CB_TOPIC_CLOSE_PREFIX}{id}")
}

pub fn parse_topic_close(data: &str) -> Option<TicketId> {
    data.strip_prefix(CB_TOPIC_CLOSE_PREFIX)?
        .parse::<i64>()
        .ok()
        .map(TicketId)
}

fn handle(username: Option<&str>) -> String {
    format!("@{}", username.unwrap_or("user"))
}

pub fn open_title(id: TicketId, username: Option<&str>, user: UserId) -> String {
    format!("🔴 #ID{id} — {} — {user}", handle(username))
}

pub fn closed_title(id: TicketId, user: UserId) -> String {
    format!("🟢 #ID{id} — CLOSED — {user}")
}

pub fn banned_title(id: TicketId, user: UserId) -> String {
    format!("🟢 #ID{id} — BAN — {user}")
}

/// Provisional topic name used between creation and the rename that
/// adds the ticket id.
pub fn provisional_title(username: Option<&str>, user: UserId) -> String {
    format!("🔴 {} — {user}", handle(username))
}

pub fn main_menu_text(custom: Option<&str>) -> String {
    match custom {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => "Hello! Press the button below to contact support.".to_string(),
    }
}

pub const PROMPT_TEXT: &str =
    "Describe your problem in one message. You can attach photos or files.";

pub fn ticket_notice(id: TicketId, username: Option<&str>, user: UserId) -> String {
    format!(
        "New ticket #ID{id}\nUser: {} ({user})\nMessages below are mirrored to the user.",
        handle(username)
    )
}

pub fn ticket_confirmation(id: TicketId) -> String {
    format!("Ticket #ID{id} created. Support will reply here. You can close it any time.")
}

pub const OPEN_FAILED_TEXT: &str =
    "Could not create your ticket right now. Please try again in a moment.";

pub const FLOOD_WARNING: &str = "Please slow down. Your previous message is being processed.";

pub const CLOSED_TOPIC_WARNING: &str =
    "This ticket is closed. The message was not delivered to the user.";

pub const USER_UNREACHABLE_WARNING: &str =
    "The user can no longer be reached. The message was not delivered.";

pub const DELIVERY_FAILED_TO_USER: &str =
    "Your message could not be delivered to support. Please try again.";

pub const DELIVERY_FAILED_TO_TOPIC: &str =
    "The reply could not be delivered to the user right now.";

pub const ALREADY_CLOSED_NOTICE: &str = "This ticket is already closed.";

pub const ACTIVE_TICKET_TEXT: &str =
    "You already have an open ticket. Write here and support will see it.";

pub fn close_notice(closed_by: ClosedBy) -> &'static str {
    match closed_by {
        ClosedBy::User => "You closed your ticket. Open a new one whenever you need help.",
        ClosedBy::Operator => "Support closed your ticket. Open a new one if the problem returns.",
        ClosedBy::Admin => "Your ticket was closed.",
    }
}

pub fn ban_notice(contact: Option<&str>) -> String {
    match contact {
        Some(contact) if !contact.is_empty() => {
            format!("You are banned from support. To appeal, contact {contact}.")
        }
        _ => "You are banned from support.".to_string(),
    }
}

pub fn unban_notice() -> &'static str {
    "Your support ban has been lifted. You can contact support again."
}

/// Button labels.
pub const BTN_CONTACT: &str = "📨 Contact support";
pub const BTN_CANCEL: &str = "✖️ Cancel";
pub const BTN_CLOSE: &str = "✅ Close ticket";
pub const BTN_PROFILE: &str = "👤 Profile";

pub fn profile_url(base: &str, user: UserId) -> String {
    format!("{}/{user}", base.trim_end_matches('/'))
}
