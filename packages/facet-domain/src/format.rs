use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
	field::{DateTimeFormat, Format, FormatKind, NumberFormat},
	value::Val,
};

const DEFAULT_DATE_PATTERN: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

// Formats cell values for presentation. The offset comes from the request's
// date/time locale; date values are shifted into it before rendering.
#[derive(Clone, Debug)]
pub struct FieldFormatter {
	offset: UtcOffset,
}
impl FieldFormatter {
	pub fn new(date_time_locale: Option<&str>) -> Self {
		Self { offset: parse_offset(date_time_locale) }
	}

	pub fn format(&self, value: &Val, format: Option<&Format>) -> String {
		match format {
			Some(Format { kind: FormatKind::Number, number, .. }) =>
				self.format_number(value, number.as_ref()),
			Some(Format { kind: FormatKind::DateTime, date_time, .. }) =>
				self.format_date(value, date_time.as_ref()),
			Some(Format { kind: FormatKind::Text, .. }) => value.to_text(),
			Some(Format { kind: FormatKind::General, .. }) | None => self.general(value),
		}
	}

	fn general(&self, value: &Val) -> String {
		match value {
			Val::Date(_) => self.format_date(value, None),
			other => other.to_text(),
		}
	}

	fn format_number(&self, value: &Val, number: Option<&NumberFormat>) -> String {
		let Some(numeric) = value.to_number() else {
			return value.to_text();
		};
		let Some(number) = number else {
			return value.to_text();
		};
		let rendered = format!("{numeric:.places$}", places = number.decimal_places as usize);

		if number.use_separator { with_separators(&rendered) } else { rendered }
	}

	fn format_date(&self, value: &Val, date_time: Option<&DateTimeFormat>) -> String {
		let Val::Date(date) = value else {
			return value.to_text();
		};
		let localized = date.to_offset(self.offset);

		if let Some(pattern) = date_time.and_then(|format| format.pattern.as_deref())
			&& let Ok(items) = time::format_description::parse(pattern)
			&& let Ok(rendered) = localized.format(&items)
		{
			return rendered;
		}

		localized.format(DEFAULT_DATE_PATTERN).unwrap_or_else(|_| value.to_text())
	}
}

// Groups the integer part of an already-rendered decimal number.
fn with_separators(rendered: &str) -> String {
	let (sign, unsigned) = match rendered.strip_prefix('-') {
		Some(rest) => ("-", rest),
		None => ("", rendered),
	};
	let (integer, fraction) = match unsigned.split_once('.') {
		Some((integer, fraction)) => (integer, Some(fraction)),
		None => (unsigned, None),
	};
	let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);

	for (index, ch) in integer.chars().enumerate() {
		if index > 0 && (integer.len() - index) % 3 == 0 {
			grouped.push(',');
		}

		grouped.push(ch);
	}

	let mut out = String::with_capacity(rendered.len() + 4);

	out.push_str(sign);
	out.push_str(&grouped);

	if let Some(fraction) = fraction {
		out.push('.');
		out.push_str(fraction);
	}

	out
}

// Accepts "UTC", "Z", or "+HH:MM" / "-HH:MM"; anything else falls back to
// UTC.
fn parse_offset(raw: Option<&str>) -> UtcOffset {
	let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
		return UtcOffset::UTC;
	};

	if raw.eq_ignore_ascii_case("utc") || raw == "Z" {
		return UtcOffset::UTC;
	}

	let (sign, rest) = match raw.split_at_checked(1) {
		Some(("+", rest)) => (1, rest),
		Some(("-", rest)) => (-1, rest),
		_ => return UtcOffset::UTC,
	};
	let Some((hours, minutes)) = rest.split_once(':') else {
		return UtcOffset::UTC;
	};
	let (Ok(hours), Ok(minutes)) = (hours.parse::<i8>(), minutes.parse::<i8>()) else {
		return UtcOffset::UTC;
	};

	UtcOffset::from_hms(sign * hours, sign * minutes, 0).unwrap_or(UtcOffset::UTC)
}
