//! Tokenizer for comma-separated `key` / `key=value` parameter lists.

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SequenceErrorKind {
    LeadingDelimiter,
    TrailingDelimiter,
    DoubleDelimiter,
    MissingDelimiterBetweenTerms,
}

impl SequenceErrorKind {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            SequenceErrorKind::LeadingDelimiter => "leading delimiter",
            SequenceErrorKind::TrailingDelimiter => "trailing delimiter",
            SequenceErrorKind::DoubleDelimiter => "empty parameter between delimiters",
            SequenceErrorKind::MissingDelimiterBetweenTerms => "missing delimiter between parameters",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SequenceError<'a> {
    pub rest: &'a str,
    pub kind: SequenceErrorKind,
}

/// Returns the next parameter (a non-empty slice without surrounding
/// whitespace) or the delimiter as a one-character slice, plus the
/// remaining input. Whitespace around `=` stays inside the parameter, so
/// `clamp = 1` is a single term.
fn next_token_with(input: &str, delim: char) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    // A delimiter is a token of its own
    let chars = input.char_indices();
    if let Some((_, first)) = chars.clone().next() {
        if first == delim {
            let len = first.len_utf8();
            return Some((&input[..len], &input[len..]));
        }
    }

    for (i, ch) in chars {
        if ch == delim {
            return Some((input[..i].trim_end(), &input[i..]));
        }
        if ch.is_whitespace() {
            let rest = input[i..].trim_start();
            if input[..i].ends_with('=') || rest.starts_with('=') {
                continue;
            }
            return Some((&input[..i], rest));
        }
    }

    Some((input.trim_end(), ""))
}

/// Splits `input` on `delim`. The sequence must not start or end with a
/// delimiter, repeat one, or put two parameters next to each other.
///
/// Returned slices carry neither delimiters nor surrounding whitespace.
pub(crate) fn parse_terms_with_delim(
    mut input: &str,
    delim: char,
) -> Result<Vec<&str>, SequenceError<'_>> {
    #[derive(PartialEq, Eq, Clone, Copy)]
    enum Last {
        None,
        Term,
        Delimiter,
    }

    let mut terms = Vec::new();
    let mut last = Last::None;

    while let Some((token, rest)) = next_token_with(input, delim) {
        input = rest;

        let is_delim = token.chars().count() == 1 && token.starts_with(delim);
        if is_delim {
            match last {
                Last::None => {
                    return Err(SequenceError {
                        rest: input,
                        kind: SequenceErrorKind::LeadingDelimiter,
                    });
                }
                Last::Delimiter => {
                    return Err(SequenceError {
                        rest: input,
                        kind: SequenceErrorKind::DoubleDelimiter,
                    });
                }
                Last::Term => last = Last::Delimiter,
            }
        } else {
            if last == Last::Term {
                // `invert scale`: whitespace is not a separator
                return Err(SequenceError {
                    rest: input,
                    kind: SequenceErrorKind::MissingDelimiterBetweenTerms,
                });
            }
            terms.push(token);
            last = Last::Term;
        }
    }

    if last == Last::Delimiter {
        return Err(SequenceError {
            rest: "",
            kind: SequenceErrorKind::TrailingDelimiter,
        });
    }

    Ok(terms)
}

/// Splits `key=value`; a bare key has no value.
pub(crate) fn split_key_value(term: &str) -> (&str, Option<&str>) {
    match term.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value.trim())),
        None => (term.trim(), None),
    }
}
