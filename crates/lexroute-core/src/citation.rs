//! Reporter citation parsing and formatting shared by adapters.

use crate::domain::{CitationFormat, ParsedCitation};

/// Parses `<volume> <reporter> <page>[, <pin>] [(<court> <year>)]`.
///
/// Returns `None` when the text is not a reporter citation.
pub fn parse(text: &str) -> Option<ParsedCitation> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (body, parenthetical) = match text.find('(') {
        Some(open) => {
            let close = text[open..].find(')')? + open;
            (&text[..open], Some(&text[open + 1..close]))
        }
        None => (text, None),
    };

    let year = match parenthetical {
        Some(inner) => Some(trailing_year(inner)?),
        None => None,
    };

    let mut parts = body.split(',');
    let main = parts.next()?.trim();
    let pin_cite = match parts.next().map(str::trim) {
        Some(pin) if !pin.is_empty() => Some(pin.parse::<u32>().ok()?),
        _ => None,
    };
    if parts.next().is_some() {
        return None;
    }

    let tokens = main.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < 3 {
        return None;
    }

    let volume = tokens[0].parse::<u32>().ok()?;
    let page = tokens[tokens.len() - 1].parse::<u32>().ok()?;
    let reporter = tokens[1..tokens.len() - 1].join(" ");
    if !reporter.chars().any(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }

    Some(ParsedCitation {
        volume,
        reporter,
        page,
        pin_cite,
        year,
    })
}

/// Renders a case citation in the requested style.
pub fn format_case(
    case_name: &str,
    citation: &ParsedCitation,
    court: Option<&str>,
    format: CitationFormat,
) -> String {
    let mut reporter = format!("{} {} {}", citation.volume, citation.reporter, citation.page);
    if let Some(pin) = citation.pin_cite {
        reporter.push_str(&format!(", {pin}"));
    }

    let year = citation.year.map(|year| year.to_string());
    match format {
        CitationFormat::Bluebook => match year {
            Some(year) => format!("{case_name}, {reporter} ({year})"),
            None => format!("{case_name}, {reporter}"),
        },
        CitationFormat::Alwd => {
            let paren = [court.map(str::to_owned), year]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if paren.is_empty() {
                format!("{case_name}, {reporter}")
            } else {
                format!("{case_name}, {reporter} ({paren})")
            }
        }
        CitationFormat::Apa => match year {
            Some(year) => format!("{case_name}, {reporter} ({year})."),
            None => format!("{case_name}, {reporter}."),
        },
    }
}

fn trailing_year(inner: &str) -> Option<i32> {
    let token = inner.split_whitespace().last()?;
    if token.len() != 4 {
        return None;
    }
    token.parse::<i32>().ok()
}
