// Turns inbound Discord messages into ledger writes.
//
// The chat never hears back from this path: a message that is not a bet
// slip is ignored, and a failed write is only logged.

use chrono::NaiveDate;

use crate::core::ledger::{ledger_today, parse_bet_slip, BetRecord, FormatStatus};
use crate::discord::Data;
use poise::serenity_prelude as serenity;

/// The parts of a Discord message the dispatcher looks at.
struct InboundMessage<'a> {
    author_id: u64,
    content: &'a str,
    embed_descriptions: Vec<&'a str>,
}

impl<'a> From<&'a serenity::Message> for InboundMessage<'a> {
    fn from(message: &'a serenity::Message) -> Self {
        Self {
            author_id: message.author.id.get(),
            content: &message.content,
            embed_descriptions: message
                .embeds
                .iter()
                .filter_map(|embed| embed.description.as_deref())
                .collect(),
        }
    }
}

pub async fn handle_message(bot_id: serenity::UserId, data: &Data, message: &serenity::Message) {
    let inbound = InboundMessage::from(message);
    let today = ledger_today(data.timezone);

    let Some(record) = bet_from_message(&inbound, bot_id.get(), &data.prefix, today) else {
        tracing::trace!(message_id = message.id.get(), "Not a bet slip");
        return;
    };

    match data.ledger.record_bet(&record).await {
        Ok(write) => {
            if write.format == FormatStatus::Pending {
                tracing::warn!(
                    row = write.row,
                    "Bet #{} recorded but first-of-day bold is pending",
                    record.bet_number
                );
            }
        }
        Err(err) => {
            tracing::error!(
                message_id = message.id.get(),
                channel_id = message.channel_id.get(),
                "Failed to record bet #{}: {}",
                record.bet_number,
                err
            );
        }
    }
}

/// The bet slip carried by `message`, if any. The bot's own messages and
/// prefixed commands never are.
fn bet_from_message(
    message: &InboundMessage<'_>,
    bot_id: u64,
    prefix: &str,
    date: NaiveDate,
) -> Option<BetRecord> {
    if message.author_id == bot_id {
        return None;
    }

    let text = best_text(message.content, &message.embed_descriptions)?;
    if text.starts_with(prefix) {
        return None;
    }

    parse_bet_slip(text, date)
}

/// The message body, or for posts without one (attachments relayed by
/// bots and webhooks) the first embed description.
fn best_text<'a>(content: &'a str, embed_descriptions: &[&'a str]) -> Option<&'a str> {
    if !content.is_empty() {
        return Some(content);
    }
    embed_descriptions.iter().copied().find(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: u64 = 1;
    const PUNTER: u64 = 2;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 14).unwrap()
    }

    fn from_punter<'a>(content: &'a str, embeds: &[&'a str]) -> InboundMessage<'a> {
        InboundMessage {
            author_id: PUNTER,
            content,
            embed_descriptions: embeds.to_vec(),
        }
    }

    fn bet_from(message: &InboundMessage<'_>) -> Option<BetRecord> {
        bet_from_message(message, BOT, "!", day())
    }

    #[test]
    fn slip_in_message_body_is_recorded() {
        let record = bet_from(&from_punter("#123 1.5u @1.9 nice bet", &[])).unwrap();
        assert_eq!(record.bet_number, "123");
        assert_eq!(record.odds, "1.90");
        assert_eq!(record.date, day());
    }

    #[test]
    fn slip_in_embed_description_is_recorded() {
        let record = bet_from(&from_punter("", &["#77 2u @3"])).unwrap();
        assert_eq!(record.bet_number, "77");
    }

    #[test]
    fn commands_are_never_slips() {
        assert_eq!(bet_from(&from_punter("!SetSheetName x", &[])), None);
        assert_eq!(
            bet_from_message(&from_punter("#1 1u @2", &[]), BOT, "#1", day()),
            None
        );
    }

    #[test]
    fn chatter_and_unanchored_slips_are_ignored() {
        assert_eq!(bet_from(&from_punter("good luck today", &[])), None);
        assert_eq!(bet_from(&from_punter(" #1 1u @2", &[])), None);
        assert_eq!(bet_from(&from_punter("#abc 1u @2", &[])), None);
    }

    #[test]
    fn own_messages_are_ignored() {
        let own = InboundMessage {
            author_id: BOT,
            content: "#1 1u @2",
            embed_descriptions: Vec::new(),
        };
        assert_eq!(bet_from(&own), None);
    }

    #[test]
    fn prefers_message_body() {
        assert_eq!(
            best_text("#1 1u @2", &["#2 1u @3"]),
            Some("#1 1u @2")
        );
    }

    #[test]
    fn falls_back_to_embed_description() {
        assert_eq!(best_text("", &["", "#2 1u @3"]), Some("#2 1u @3"));
        assert_eq!(best_text("", &[]), None);
    }

    #[test]
    fn leading_whitespace_is_preserved() {
        assert_eq!(best_text(" #1 1u @2", &[]), Some(" #1 1u @2"));
    }
}
