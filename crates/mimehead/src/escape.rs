//! Header value escaping: RFC 5322 quoting and minimal RFC 2047 encoding.

use crate::charset::Charset;
use crate::encoded_word;

/// Characters that can form part of an RFC 5322 atom.
const ATEXT: [bool; 128] = {
    let mut table = [false; 128];
    let atext = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&'*+-/=?^_`{|}~";
    let mut i = 0;
    while i < atext.len() {
        table[atext[i] as usize] = true;
        i += 1;
    }
    table
};

fn is_atext(c: char) -> bool {
    u8::try_from(c).is_ok_and(|b| b < 0x80 && ATEXT[usize::from(b)])
}

/// Makes `value` safe to place in a header.
///
/// Non-ASCII, NUL, CR or LF anywhere forces RFC 2047 encoding, but only of
/// the span from the first word needing it through the last; clean leading
/// and trailing words stay readable. In `phrase` mode (display names and
/// similar) a value with specials, a leading space or a trailing space is
/// quoted instead, escaping `"` and `\`.
#[must_use]
pub fn escape(value: &str, charset: Option<Charset>, phrase: bool) -> String {
    let len = value.len();
    let mut needs_quote = false;
    let mut needs_2047 = false;
    let mut needs_escape = 0usize;
    let mut wsp = true;
    let mut clean_to = 0;
    let mut clean_from = len;

    for (i, c) in value.char_indices() {
        if !c.is_ascii() || c == '\0' || c == '\r' || c == '\n' {
            needs_2047 = true;
            clean_from = len;
        } else if !phrase {
            // outside a phrase there is nothing to quote
        } else if c == '"' || c == '\\' {
            needs_quote = true;
            needs_escape += 1;
            clean_from = len;
        } else if (c != ' ' && !is_atext(c)) || (c == ' ' && wsp) {
            needs_quote = true;
            clean_from = len;
        }

        wsp = c == ' ';
        if wsp {
            if !needs_quote && !needs_2047 && i != len - 1 {
                clean_to = i + 1;
            } else if clean_from == len && i > clean_to + 1 {
                clean_from = i;
            }
        }
    }
    if phrase {
        needs_quote |= wsp;
    }
    if wsp {
        clean_from = len;
    }

    if needs_2047 {
        let mut escaped = String::with_capacity(len * 2);
        escaped.push_str(&value[..clean_to]);
        escaped.push_str(&encoded_word::encode(&value[clean_to..clean_from], charset));
        escaped.push_str(&value[clean_from..]);
        escaped
    } else if needs_quote && needs_escape > 0 {
        quote_with_hint(value, needs_escape)
    } else if needs_quote {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Wraps `value` in double quotes, backslash-escaping `"` and `\`.
#[must_use]
pub fn quote(value: &str) -> String {
    quote_with_hint(value, 0)
}

fn quote_with_hint(value: &str, escapes: usize) -> String {
    let mut quoted = String::with_capacity(value.len() + escapes + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
