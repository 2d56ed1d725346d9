// Bet slip extraction.
//
// A bet slip is a chat message that starts with `#<bet> <unit>u @<odds>`,
// e.g. `#123 1.5u @1.9 nice bet`. Anything after the odds is ignored.
// Most chat traffic is not a bet slip, so a mismatch is simply `None`.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Format used for the date column of the ledger.
pub const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// One bet extracted from a chat message.
///
/// The date is the day the bot processed the message in the ledger
/// timezone, never anything the sender typed.
#[derive(Debug, Clone, PartialEq)]
pub struct BetRecord {
    pub date: NaiveDate,
    /// Kept as text so leading zeros survive until the ledger sees them.
    pub bet_number: String,
    pub unit: f64,
    /// Odds rendered with exactly two decimal places.
    pub odds: String,
}

impl BetRecord {
    pub fn date_label(&self) -> String {
        self.date.format(DATE_LABEL_FORMAT).to_string()
    }
}

/// Today's calendar date in the ledger timezone.
pub fn ledger_today(tz: Tz) -> NaiveDate {
    ledger_date(Utc::now(), tz)
}

/// The calendar date `now` falls on in `tz`.
pub fn ledger_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Renders odds with exactly two decimal places.
pub fn format_odds(odds: f64) -> String {
    format!("{:.2}", odds)
}

/// Parses a bet slip from the start of `text`.
///
/// Returns `None` for anything that does not match the grammar, including
/// a match that does not begin at the first character.
pub fn parse_bet_slip(text: &str, date: NaiveDate) -> Option<BetRecord> {
    let mut cursor = Cursor::new(text);

    if !cursor.eat('#') {
        return None;
    }
    let bet_number = cursor.digits();
    if bet_number.is_empty() || !cursor.whitespace() {
        return None;
    }

    let unit = cursor.unit()?;
    if !cursor.eat('u') || !cursor.whitespace() {
        return None;
    }

    if !cursor.eat('@') {
        return None;
    }
    let odds = cursor.odds()?;

    let unit: f64 = unit.parse().ok()?;
    let odds: f64 = odds.parse().ok()?;
    if !unit.is_finite() || !odds.is_finite() {
        return None;
    }

    Some(BetRecord {
        date,
        bet_number: bet_number.to_string(),
        unit,
        odds: format_odds(odds),
    })
}

/// Byte cursor over the message. Every token is ASCII except whitespace,
/// which is skipped one char at a time.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        let len = self
            .rest()
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        self.pos += len;
        &self.text[start..self.pos]
    }

    /// Skips one or more whitespace chars. Returns false if there were none.
    fn whitespace(&mut self) -> bool {
        let start = self.pos;
        for c in self.rest().chars() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.pos > start
    }

    /// `digits* . digits+` or `digits+`. A bare trailing dot is not a unit.
    fn unit(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let whole = self.digits();
        if self.eat('.') {
            if self.digits().is_empty() {
                return None;
            }
        } else if whole.is_empty() {
            return None;
        }
        Some(&self.text[start..self.pos])
    }

    /// `digits+ (. digits*)?`. `2.` is accepted and means 2.
    fn odds(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if self.digits().is_empty() {
            return None;
        }
        if self.eat('.') {
            self.digits();
        }
        Some(&self.text[start..self.pos])
    }
}
