//! Inline pass: turns the text of a block into inline events.
//!
//! The scanner walks the characters once, handling backslash escapes, code spans,
//! images and links (whose text is scanned recursively) eagerly. Emphasis is deferred:
//! every run of `*`, `_` or `~~` becomes a delimiter item, and a second pass pairs
//! closers with the nearest compatible opener, adding a mark to every item between
//! them. That way `***x***` resolves to strong + em and `**` is never split into two
//! emphasis markers.
//!
//! Pairing follows the CommonMark delimiter rules: left/right flanking decides which
//! runs may open or close, `_` may not open or close inside a word, and the "rule of
//! three" stops `*a**` style mismatches. Two characters of each run are used when both
//! sides have at least two (strong), otherwise one (em). Strikethrough only pairs runs
//! of exactly two tildes.
//!
//! Unmatched delimiters and unclosed brackets stay literal text.

use crate::ir::events::Event;
use crate::schema::{ImageAttrs, Mark, MarkSet};
use tracing::trace;

#[derive(Debug, Clone)]
struct Delim {
    ch: char,
    count: usize,
    can_open: bool,
    can_close: bool,
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Image(ImageAttrs),
    HardBreak,
    Delim(Delim),
}

#[derive(Debug, Clone)]
struct Item {
    piece: Piece,
    marks: MarkSet,
}

impl Item {
    fn new(piece: Piece) -> Self {
        Item {
            piece,
            marks: MarkSet::new(),
        }
    }
}

/// Parse the inline content of a block. A `'\n'` in `text` is a hard break.
pub fn parse_inline(text: &str) -> Vec<Event> {
    let chars: Vec<char> = text.chars().collect();
    to_events(scan(&chars))
}

fn scan(chars: &[char]) -> Vec<Item> {
    let mut scanner = Scanner {
        chars,
        pos: 0,
        items: Vec::new(),
        buf: String::new(),
    };
    scanner.run();
    resolve_emphasis(&mut scanner.items);
    finalize(scanner.items)
}

struct Scanner<'a> {
    chars: &'a [char],
    pos: usize,
    items: Vec<Item>,
    buf: String,
}

impl Scanner<'_> {
    fn run(&mut self) {
        while let Some(&c) = self.chars.get(self.pos) {
            let next = self.chars.get(self.pos + 1).copied();
            match c {
                '\\' => match next {
                    Some(n) if n.is_ascii_punctuation() => {
                        self.buf.push(n);
                        self.pos += 2;
                    }
                    Some('\n') => {
                        self.push(Piece::HardBreak);
                        self.pos += 2;
                    }
                    _ => {
                        self.buf.push('\\');
                        self.pos += 1;
                    }
                },
                '\n' => {
                    self.push(Piece::HardBreak);
                    self.pos += 1;
                }
                '`' => self.code_span(),
                '!' if next == Some('[') => {
                    if !self.image() {
                        self.buf.push('!');
                        self.pos += 1;
                    }
                }
                '[' => {
                    if !self.link() {
                        self.buf.push('[');
                        self.pos += 1;
                    }
                }
                '*' | '_' | '~' => self.delimiter_run(c),
                _ => {
                    self.buf.push(c);
                    self.pos += 1;
                }
            }
        }
        self.flush();
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let text = std::mem::take(&mut self.buf);
            self.items.push(Item::new(Piece::Text(text)));
        }
    }

    fn push(&mut self, piece: Piece) {
        self.flush();
        self.items.push(Item::new(piece));
    }

    fn run_length(&self, start: usize, ch: char) -> usize {
        self.chars[start..].iter().take_while(|&&c| c == ch).count()
    }

    fn code_span(&mut self) {
        let open = self.run_length(self.pos, '`');
        let content_start = self.pos + open;
        let mut k = content_start;
        while k < self.chars.len() {
            if self.chars[k] == '`' {
                let run = self.run_length(k, '`');
                if run == open {
                    let raw: String = self.chars[content_start..k]
                        .iter()
                        .map(|&c| if c == '\n' { ' ' } else { c })
                        .collect();
                    let content = strip_code_padding(&raw);
                    if content.is_empty() {
                        break;
                    }
                    self.flush();
                    self.items.push(Item {
                        piece: Piece::Text(content.to_string()),
                        marks: MarkSet::from_marks([Mark::Code]),
                    });
                    self.pos = k + run;
                    return;
                }
                k += run;
            } else {
                k += 1;
            }
        }
        trace!(backticks = open, "unmatched code span opener kept as text");
        self.buf.extend(std::iter::repeat('`').take(open));
        self.pos += open;
    }

    fn image(&mut self) -> bool {
        let bracket = self.pos + 1;
        let Some(close) = find_close_bracket(self.chars, bracket) else {
            return false;
        };
        let Some((src, title, end)) = link_destination(self.chars, close + 1) else {
            return false;
        };
        if src.is_empty() {
            return false;
        }
        let alt = unescape(&self.chars[bracket + 1..close]);
        let mut attrs = ImageAttrs::new(src).with_alt(alt);
        attrs.title = title;
        self.push(Piece::Image(attrs));
        self.pos = end;
        true
    }

    fn link(&mut self) -> bool {
        let Some(close) = find_close_bracket(self.chars, self.pos) else {
            trace!(offset = self.pos, "unclosed bracket kept as text");
            return false;
        };
        if close == self.pos + 1 {
            return false;
        }
        let Some((href, title, end)) = link_destination(self.chars, close + 1) else {
            return false;
        };
        let link = Mark::link(href, title);
        let inner = scan(&self.chars[self.pos + 1..close]);
        self.flush();
        for mut item in inner {
            if matches!(item.piece, Piece::Text(_)) {
                item.marks = item.marks.with(link.clone());
            }
            self.items.push(item);
        }
        self.pos = end;
        true
    }

    fn delimiter_run(&mut self, ch: char) {
        let count = self.run_length(self.pos, ch);
        let end = self.pos + count;
        if ch == '~' && count != 2 {
            self.buf.extend(std::iter::repeat('~').take(count));
            self.pos = end;
            return;
        }

        let before = if self.pos == 0 {
            ' '
        } else {
            self.chars[self.pos - 1]
        };
        let after = self.chars.get(end).copied().unwrap_or(' ');

        let left_flanking = !after.is_whitespace()
            && (!is_punctuation(after) || before.is_whitespace() || is_punctuation(before));
        let right_flanking = !before.is_whitespace()
            && (!is_punctuation(before) || after.is_whitespace() || is_punctuation(after));

        let (can_open, can_close) = if ch == '_' {
            (
                left_flanking && (!right_flanking || is_punctuation(before)),
                right_flanking && (!left_flanking || is_punctuation(after)),
            )
        } else {
            (left_flanking, right_flanking)
        };

        self.push(Piece::Delim(Delim {
            ch,
            count,
            can_open,
            can_close,
        }));
        self.pos = end;
    }
}

/// Pair delimiter runs and mark the items between each pair.
fn resolve_emphasis(items: &mut [Item]) {
    let mut closer = 0;
    while closer < items.len() {
        let (ch, closer_count, closer_can_open) = match &items[closer].piece {
            Piece::Delim(d) if d.can_close && d.count > 0 => (d.ch, d.count, d.can_open),
            _ => {
                closer += 1;
                continue;
            }
        };

        let opener = (0..closer).rev().find(|&i| match &items[i].piece {
            Piece::Delim(o) if o.ch == ch && o.can_open && o.count > 0 => {
                let multiple_of_three = ch != '~'
                    && (o.can_close || closer_can_open)
                    && (o.count + closer_count) % 3 == 0
                    && (o.count % 3 != 0 || closer_count % 3 != 0);
                !multiple_of_three
            }
            _ => false,
        });

        let Some(opener) = opener else {
            closer += 1;
            continue;
        };

        let opener_count = match &items[opener].piece {
            Piece::Delim(o) => o.count,
            _ => 0,
        };
        let (used, mark) = if ch == '~' {
            (2, Mark::Strike)
        } else if opener_count >= 2 && closer_count >= 2 {
            (2, Mark::Strong)
        } else {
            (1, Mark::Em)
        };

        for item in &mut items[opener + 1..closer] {
            item.marks = item.marks.with(mark.clone());
            if let Piece::Delim(d) = &mut item.piece {
                d.can_open = false;
                d.can_close = false;
            }
        }
        if let Piece::Delim(o) = &mut items[opener].piece {
            o.count -= used;
        }
        if let Piece::Delim(c) = &mut items[closer].piece {
            c.count -= used;
            if c.count == 0 {
                closer += 1;
            }
        }
    }
}

/// Turn leftover delimiters into literal text.
fn finalize(items: Vec<Item>) -> Vec<Item> {
    items
        .into_iter()
        .filter_map(|item| match item.piece {
            Piece::Delim(d) if d.count == 0 => None,
            Piece::Delim(d) => {
                trace!(delimiter = %d.ch, count = d.count, "unmatched delimiter kept as text");
                Some(Item {
                    piece: Piece::Text(std::iter::repeat(d.ch).take(d.count).collect()),
                    marks: item.marks,
                })
            }
            _ => Some(item),
        })
        .collect()
}

fn to_events(items: Vec<Item>) -> Vec<Event> {
    let mut events: Vec<Event> = Vec::with_capacity(items.len());
    for item in items {
        match item.piece {
            Piece::Text(text) => {
                if let Some(Event::Text {
                    text: prev,
                    marks: prev_marks,
                }) = events.last_mut()
                {
                    if *prev_marks == item.marks {
                        prev.push_str(&text);
                        continue;
                    }
                }
                events.push(Event::Text {
                    text,
                    marks: item.marks,
                });
            }
            Piece::Image(attrs) => events.push(Event::Image(attrs)),
            Piece::HardBreak => events.push(Event::HardBreak),
            Piece::Delim(_) => {}
        }
    }
    events
}

fn strip_code_padding(raw: &str) -> &str {
    let padded = raw.len() >= 2 && raw.starts_with(' ') && raw.ends_with(' ');
    if padded && !raw.chars().all(|c| c == ' ') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}

/// Index of the `]` matching the `[` at `open`, honouring nesting and escapes.
fn find_close_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut k = open + 1;
    while k < chars.len() {
        match chars[k] {
            '\\' => k += 1,
            '[' => depth += 1,
            ']' if depth == 0 => return Some(k),
            ']' => depth -= 1,
            _ => {}
        }
        k += 1;
    }
    None
}

/// Parse `(dest "title")` starting at `start`. Returns the destination, the title and
/// the index just past the closing parenthesis.
fn link_destination(chars: &[char], start: usize) -> Option<(String, Option<String>, usize)> {
    if chars.get(start) != Some(&'(') {
        return None;
    }
    let mut k = start + 1;
    let skip_ws = |mut k: usize| {
        while chars.get(k).is_some_and(|c| *c == ' ' || *c == '\t') {
            k += 1;
        }
        k
    };
    k = skip_ws(k);

    let mut dest = String::new();
    if chars.get(k) == Some(&'<') {
        k += 1;
        loop {
            match chars.get(k)? {
                '>' => {
                    k += 1;
                    break;
                }
                '\n' | '<' => return None,
                '\\' if chars.get(k + 1).is_some_and(char::is_ascii_punctuation) => {
                    dest.push(chars[k + 1]);
                    k += 2;
                }
                c => {
                    dest.push(*c);
                    k += 1;
                }
            }
        }
    } else {
        let mut depth = 0usize;
        while let Some(&c) = chars.get(k) {
            match c {
                '\\' if chars.get(k + 1).is_some_and(char::is_ascii_punctuation) => {
                    dest.push(chars[k + 1]);
                    k += 2;
                    continue;
                }
                '(' => depth += 1,
                ')' if depth == 0 => break,
                ')' => depth -= 1,
                c if c.is_whitespace() => break,
                _ => {}
            }
            dest.push(c);
            k += 1;
        }
    }

    let after_dest = k;
    k = skip_ws(k);
    let mut title = None;
    if let Some(&quote @ ('"' | '\'')) = chars.get(k) {
        if k == after_dest {
            return None;
        }
        k += 1;
        let mut value = String::new();
        loop {
            match chars.get(k)? {
                c if *c == quote => {
                    k += 1;
                    break;
                }
                '\\' if chars.get(k + 1).is_some_and(char::is_ascii_punctuation) => {
                    value.push(chars[k + 1]);
                    k += 2;
                }
                c => {
                    value.push(*c);
                    k += 1;
                }
            }
        }
        title = Some(value);
        k = skip_ws(k);
    }

    if chars.get(k) == Some(&')') {
        Some((dest, title, k + 1))
    } else {
        None
    }
}

fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut k = 0;
    while k < chars.len() {
        if chars[k] == '\\' && chars.get(k + 1).is_some_and(char::is_ascii_punctuation) {
            out.push(chars[k + 1]);
            k += 2;
        } else {
            out.push(chars[k]);
            k += 1;
        }
    }
    out
}
