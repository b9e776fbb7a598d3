//! Turn-window trimming.
//!
//! History is cut only in front of a user turn, so an assistant's tool
//! requests are never separated from their results.

use calmate_core::message::{Conversation, Role};

/// Drop the oldest whole exchanges until at most `max_turns` remain.
///
/// When the newest exchange alone is longer than the window, everything
/// before it is dropped and the exchange is kept whole. `0` disables
/// trimming. Returns the number of turns removed.
pub fn trim_to_window(conversation: &mut Conversation, max_turns: usize) -> usize {
    let len = conversation.messages.len();
    if max_turns == 0 || len <= max_turns {
        return 0;
    }
    let excess = len - max_turns;

    let user_turns = conversation
        .messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == Role::User)
        .map(|(i, _)| i);

    let mut last_user = None;
    let mut cut = None;
    for i in user_turns {
        last_user = Some(i);
        if i >= excess {
            cut = Some(i);
            break;
        }
    }

    match cut.or(last_user) {
        Some(cut) if cut > 0 => {
            conversation.messages.drain(..cut);
            cut
        }
        _ => 0,
    }
}
