//! The post entity: validation, derived accessors and archive months.

use serde::Serialize;
use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::domain::bloggers::{Blogger, blogger_display_name};
use crate::domain::entities::{BloggerRef, PostRecord};
use crate::domain::error::{DomainError, ValidationErrors};
use crate::domain::slug;
use crate::domain::types::StateCatalog;
use crate::util::markup::escape_html;

pub const TITLE_MIN_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 100;
pub const BODY_MIN_CHARS: usize = 10;
/// Number of posts in the "recent" view.
pub const RECENT_LIMIT: u32 = 5;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const MONTH_LABEL_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [year]");
const FORM_DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

/// Caller-supplied fields permitted on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostAttributes {
    pub title: Option<String>,
    pub published_at: Option<String>,
    pub body: Option<String>,
    pub footnotes: Option<String>,
    pub tag_list: Option<String>,
    pub state: Option<String>,
}

/// An unsaved post, either fresh or loaded for editing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDraft {
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    pub footnotes: Option<String>,
    pub state: String,
    pub published_at: Option<OffsetDateTime>,
    /// Raw `published_at` text as typed, kept for redisplay.
    pub published_at_input: String,
    pub tag_list: String,
    pub blogger: Option<BloggerRef>,
}

impl PostDraft {
    pub fn new(blogger: Option<BloggerRef>, catalog: &StateCatalog) -> Self {
        Self {
            id: None,
            title: String::new(),
            body: String::new(),
            footnotes: None,
            state: catalog.initial_state().to_string(),
            published_at: None,
            published_at_input: String::new(),
            tag_list: String::new(),
            blogger,
        }
    }

    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            id: Some(record.id),
            title: record.title.clone(),
            body: record.body.clone(),
            footnotes: record.footnotes.clone(),
            state: record.state.clone(),
            published_at: Some(record.published_at),
            published_at_input: format_form_datetime(record.published_at),
            tag_list: format_tag_list(&record.tags),
            blogger: Some(record.blogger.clone()),
        }
    }

    /// Overwrite every supplied attribute; absent ones keep their current value.
    pub fn assign(&mut self, attributes: PostAttributes) {
        let PostAttributes {
            title,
            published_at,
            body,
            footnotes,
            tag_list,
            state,
        } = attributes;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(body) = body {
            self.body = body;
        }
        if let Some(footnotes) = footnotes {
            self.footnotes = (!footnotes.trim().is_empty()).then_some(footnotes);
        }
        if let Some(tag_list) = tag_list {
            self.tag_list = tag_list;
        }
        if let Some(state) = state {
            self.state = state.trim().to_string();
        }
        if let Some(raw) = published_at {
            self.published_at = parse_published_at(&raw);
            self.published_at_input = raw;
        }
    }

    pub fn validate(&self, catalog: &StateCatalog) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title_len = self.title.chars().count();
        if self.title.trim().is_empty() {
            errors.add("title", "can't be blank");
        }
        if title_len < TITLE_MIN_CHARS {
            errors.add(
                "title",
                format!("is too short (minimum is {TITLE_MIN_CHARS} characters)"),
            );
        } else if title_len > TITLE_MAX_CHARS {
            errors.add(
                "title",
                format!("is too long (maximum is {TITLE_MAX_CHARS} characters)"),
            );
        }

        if self.body.trim().is_empty() {
            errors.add("body", "can't be blank");
        }
        if self.body.chars().count() < BODY_MIN_CHARS {
            errors.add(
                "body",
                format!("is too short (minimum is {BODY_MIN_CHARS} characters)"),
            );
        }

        if self.blogger.is_none() {
            errors.add("blogger", "can't be blank");
        }

        if self.state.is_empty() {
            errors.add("state", "can't be blank");
        } else if !catalog.contains(&self.state) {
            errors.add("state", "is not included in the list");
        }

        if !self.published_at_input.trim().is_empty() && self.published_at.is_none() {
            errors.add("published_at", "is invalid");
        }

        errors.into_result()
    }

    pub fn tags(&self) -> Vec<String> {
        parse_tag_list(&self.tag_list)
    }

    /// URL param of the persisted post; `None` before the first save.
    pub fn to_param(&self) -> Option<String> {
        self.id.map(|id| slug::post_param(id, &self.title))
    }
}

/// Split a comma-separated tag list into trimmed, de-duplicated names.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for name in input.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if !tags.iter().any(|existing| existing == name) {
            tags.push(name.to_string());
        }
    }
    tags
}

pub fn format_tag_list(tags: &[String]) -> String {
    tags.join(", ")
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM` and bare dates (UTC).
pub fn parse_published_at(input: &str) -> Option<OffsetDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(value);
    }

    let normalized = trimmed.replacen(' ', "T", 1);
    let minutes = normalized.get(..16).unwrap_or(&normalized);
    if let Ok(value) = PrimitiveDateTime::parse(minutes, FORM_DATETIME_FORMAT)
        && (normalized.len() == 16 || normalized[16..].starts_with(':'))
    {
        return Some(value.assume_offset(UtcOffset::UTC));
    }

    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_offset(UtcOffset::UTC))
}

pub fn format_form_datetime(value: OffsetDateTime) -> String {
    value
        .to_offset(UtcOffset::UTC)
        .format(FORM_DATETIME_FORMAT)
        .unwrap_or_default()
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value.date().format(HUMAN_DATE_FORMAT).unwrap_or_default()
}

/// How a body is shortened for previews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncateOptions {
    pub length: usize,
    pub separator: Option<String>,
    pub omission: String,
    pub escape: bool,
}

impl TruncateOptions {
    /// Previews cut on line breaks, with no omission marker and no escaping.
    pub fn short_body(length: usize) -> Self {
        Self {
            length,
            separator: Some("\n".to_string()),
            omission: String::new(),
            escape: false,
        }
    }
}

pub fn truncate(text: &str, options: &TruncateOptions) -> String {
    let chars: Vec<char> = text.chars().collect();
    let truncated = if chars.len() <= options.length {
        text.to_string()
    } else {
        let room = options
            .length
            .saturating_sub(options.omission.chars().count());
        let stop = options
            .separator
            .as_deref()
            .and_then(|separator| rfind_chars(&chars, separator, room))
            .unwrap_or(room);
        let mut out: String = chars[..stop].iter().collect();
        out.push_str(&options.omission);
        out
    };

    if options.escape {
        escape_html(&truncated)
    } else {
        truncated
    }
}

/// Char index of the last `needle` occurrence starting at or before `limit`.
fn rfind_chars(haystack: &[char], needle: &str, limit: usize) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let last_start = limit.min(haystack.len() - needle.len());
    (0..=last_start)
        .rev()
        .find(|&start| haystack[start..start + needle.len()] == needle[..])
}

impl PostRecord {
    pub fn to_param(&self) -> String {
        slug::post_param(self.id, &self.title)
    }

    pub fn short_body(&self, options: &TruncateOptions) -> String {
        truncate(&self.body, options)
    }

    pub fn blogger_display_name(
        &self,
        blogger: Option<&dyn Blogger>,
        accessor: &str,
    ) -> Result<String, DomainError> {
        blogger_display_name(blogger, accessor)
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.published_at)
    }
}

/// A calendar month used to bucket and filter posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u8,
}

impl MonthKey {
    pub fn new(year: i32, month: u8) -> Result<Self, DomainError> {
        let key = Self { year, month };
        key.first_day()?;
        Ok(key)
    }

    /// Parse archive query parameters; anything that is not a real calendar month fails.
    pub fn parse(year: Option<&str>, month: Option<&str>) -> Result<Self, DomainError> {
        let year_raw = year.map(str::trim).unwrap_or_default();
        let month_raw = month.map(str::trim).unwrap_or_default();

        let year: i32 = year_raw
            .parse()
            .map_err(|_| DomainError::malformed(format!("invalid archive year `{year_raw}`")))?;
        let month: u8 = month_raw
            .parse()
            .map_err(|_| DomainError::malformed(format!("invalid archive month `{month_raw}`")))?;

        Self::new(year, month)
    }

    pub fn of(value: OffsetDateTime) -> Self {
        let utc = value.to_offset(UtcOffset::UTC);
        Self {
            year: utc.year(),
            month: u8::from(utc.month()),
        }
    }

    pub fn first_day(&self) -> Result<Date, DomainError> {
        let month = Month::try_from(self.month).map_err(|_| {
            DomainError::malformed(format!("invalid archive month `{}`", self.month))
        })?;
        Date::from_calendar_date(self.year, month, 1).map_err(|_| {
            DomainError::malformed(format!("invalid archive year `{}`", self.year))
        })
    }

    /// Half-open `[start, end)` range covering the month in UTC.
    pub fn bounds(&self) -> Result<(OffsetDateTime, OffsetDateTime), DomainError> {
        let first = self.first_day()?;
        let next = if first.month() == Month::December {
            Date::from_calendar_date(self.year + 1, Month::January, 1)
        } else {
            Date::from_calendar_date(self.year, first.month().next(), 1)
        }
        .map_err(|_| DomainError::malformed(format!("invalid archive year `{}`", self.year)))?;

        Ok((
            first.midnight().assume_offset(UtcOffset::UTC),
            next.midnight().assume_offset(UtcOffset::UTC),
        ))
    }

    pub fn contains(&self, value: OffsetDateTime) -> bool {
        Self::of(value) == *self
    }

    /// `October 2026`.
    pub fn label(&self) -> String {
        self.first_day()
            .ok()
            .and_then(|date| date.format(MONTH_LABEL_FORMAT).ok())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub month: MonthKey,
    pub label: String,
    pub count: u64,
}

impl MonthCount {
    pub fn new(month: MonthKey, count: u64) -> Self {
        Self {
            label: month.label(),
            month,
            count,
        }
    }
}
