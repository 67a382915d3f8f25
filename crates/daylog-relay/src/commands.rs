use chrono::{DateTime, Days, Duration, NaiveTime, Utc};

/// What a chat message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/start`, optionally carrying a link token.
    Start(Option<&'a str>),
    /// `/yesterday` or `/y`, optionally carrying entry text.
    Yesterday(Option<&'a str>),
    /// Any other slash command; ignored.
    Unknown,
    /// Plain text, recorded as an entry.
    Text(&'a str),
}

pub fn parse(text: &str) -> Command<'_> {
    let text = text.trim();
    let Some(rest) = text.strip_prefix('/') else {
        return Command::Text(text);
    };

    let (head, arg) = match rest.split_once(char::is_whitespace) {
        Some((head, arg)) => (head, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    // Group chats address commands as `/start@daylog_bot`
    let name = head.split('@').next().unwrap_or(head);

    match name {
        "start" => Command::Start(arg),
        "yesterday" | "y" => Command::Yesterday(arg),
        _ => Command::Unknown,
    }
}

/// Noon (UTC) of the day before `sent`.
pub fn yesterday_noon(sent: DateTime<Utc>) -> DateTime<Utc> {
    let noon = NaiveTime::MIN + Duration::hours(12);
    (sent.date_naive() - Days::new(1)).and_time(noon).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn start_with_and_without_token() {
        assert_eq!(parse("/start abc123"), Command::Start(Some("abc123")));
        assert_eq!(parse("/start"), Command::Start(None));
        assert_eq!(parse("/start   "), Command::Start(None));
        assert_eq!(parse("/start@daylog_bot abc"), Command::Start(Some("abc")));
    }

    #[test]
    fn yesterday_aliases() {
        assert_eq!(parse("/y walked the dog"), Command::Yesterday(Some("walked the dog")));
        assert_eq!(parse("/yesterday  rain all day "), Command::Yesterday(Some("rain all day")));
        assert_eq!(parse("/y"), Command::Yesterday(None));
        assert_eq!(parse("/yesterday"), Command::Yesterday(None));
    }

    #[test]
    fn other_commands_and_text() {
        assert_eq!(parse("/help"), Command::Unknown);
        assert_eq!(parse("/yes please"), Command::Unknown);
        assert_eq!(parse("  had coffee  "), Command::Text("had coffee"));
    }

    #[test]
    fn yesterday_is_noon_of_previous_day() {
        let sent = Utc.with_ymd_and_hms(2025, 3, 1, 0, 30, 0).unwrap();
        assert_eq!(
            yesterday_noon(sent),
            Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap()
        );
    }
}
