use time::{format_description::FormatItem, macros::format_description, Date};

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_iso_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), ISO_DATE).ok()
}

pub fn format_iso_date(d: Date) -> String {
    d.format(ISO_DATE).unwrap_or_else(|_| d.to_string())
}
