//! Source positions for YAML record documents.
//!
//! `serde_yaml` drops node positions once a document is parsed, which leaves
//! validation findings with only a logical field path (`categories.0`). The
//! [`SourceMap`] recovers positions by scanning the block structure of the
//! text: indentation, `key:` entries, `- ` sequence items, block scalars, flow
//! collections and quoted scalars. Flow collections and quoted scalars may span
//! several lines; they are read as one logical line whose byte offsets map
//! back to the physical line and column. The scan never fails, and paths it
//! cannot resolve fall back to their deepest known ancestor.
//!
//! Paths are dot-separated; sequence elements are addressed by their 0-based
//! index (`versions.1.prices.0.currency`).

use std::collections::VecDeque;
use std::ops::Range;

/// A 1-indexed line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}
impl Position {
    fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone)]
struct Node {
    /// Position of the mapping key or sequence dash that introduces the node.
    position: Position,
    /// First line of block scalar content (`|` / `>`).
    block: Option<usize>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Scalar,
    Mapping(Vec<(String, Node)>),
    Sequence(Vec<Node>),
}

/// Maps logical field paths to their position in the source text.
#[derive(Debug, Clone)]
pub struct SourceMap {
    root: Node,
}
impl SourceMap {
    /// Scans the block structure of YAML text.
    pub fn parse(text: &str) -> Self {
        let mut cursor = Cursor::new(text);
        let root = match cursor.peek() {
            Some(line) => {
                let indent = line.indent;
                let mut node = parse_node(&mut cursor, indent);
                node.position = Position::new(1, 1);
                node
            },
            None => Node { position: Position::new(1, 1), block: None, kind: NodeKind::Scalar },
        };
        Self { root }
    }

    fn resolve(&self, path: &str) -> (&Node, bool) {
        let mut node = &self.root;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let next = match &node.kind {
                NodeKind::Mapping(entries) => entries.iter().find(|(key, _)| key == segment).map(|(_, n)| n),
                NodeKind::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                NodeKind::Scalar => None,
            };
            match next {
                Some(n) => node = n,
                None => return (node, false),
            }
        }
        (node, true)
    }

    /// Position of the node at `path`, or of its deepest existing ancestor.
    ///
    /// The document root is reported as line 1, column 1.
    pub fn locate(&self, path: &str) -> Position {
        self.resolve(path).0.position
    }

    /// Position of the node at `path`, only if the whole path exists.
    pub fn position(&self, path: &str) -> Option<Position> {
        match self.resolve(path) {
            (node, true) => Some(node.position),
            (_, false) => None,
        }
    }

    /// Line of the node at `path`, only if the whole path exists.
    pub fn line(&self, path: &str) -> Option<usize> {
        self.position(path).map(|p| p.line)
    }

    /// Source line of the `offset`-th (0-based) line inside a text value.
    ///
    /// For block scalars this is counted from the first content line; inline
    /// scalars live on the line of their key.
    pub fn text_line(&self, path: &str, offset: usize) -> usize {
        let (node, _) = self.resolve(path);
        match node.block {
            Some(start) => start + offset,
            None => node.position.line,
        }
    }
}

/// Byte offsets of line starts, for turning offsets back into positions.
#[derive(Debug)]
struct LineIndex {
    starts: Vec<usize>,
}
impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1)).collect();
        Self { starts }
    }

    fn position(&self, offset: usize) -> Position {
        // `starts[0]` is zero, so the partition point is at least one.
        let line = self.starts.partition_point(|&start| start <= offset);
        Position::new(line, offset - self.starts[line - 1] + 1)
    }
}

/// One logical line: a physical line, extended over following lines while a
/// flow collection or quoted scalar that starts on it is still open.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    indent: usize,
    /// Byte offset of `text` in the document.
    offset: usize,
    text: &'a str,
}

struct Cursor<'a> {
    lines: VecDeque<Line<'a>>,
    index: LineIndex,
}
impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        let mut physical = text.split_inclusive('\n').scan(0, |offset, raw| {
            let start = *offset;
            *offset += raw.len();
            Some((start, raw.trim_end_matches(['\n', '\r'])))
        });
        let mut lines = VecDeque::new();
        let mut number = 0;
        // Lines indented deeper than this continue a scalar and are not scanned
        // for flow brackets or quotes.
        let mut opaque: Option<usize> = None;
        while let Some((start, raw)) = physical.next() {
            number += 1;
            let trimmed = raw.trim_start_matches(' ');
            let indent = raw.len() - trimmed.len();
            let content = trimmed.trim_end();
            let skip = content.is_empty()
                || content.starts_with('#')
                || (indent == 0 && (content == "---" || content == "..."));
            if skip {
                continue;
            }
            let first = number;
            let offset = start + indent;
            let mut end = offset + content.len();
            if opaque.is_some_and(|threshold| indent > threshold) {
                lines.push_back(Line { number, indent, offset, text: content });
                continue;
            }
            opaque = None;

            let (owner, value_at) = line_value(content);
            match content[value_at..].chars().next() {
                Some('[' | '{' | '"' | '\'') => {
                    let mut lexer = Lexer::new();
                    for c in content[value_at..].chars() {
                        lexer.step(c);
                    }
                    while !lexer.is_balanced() {
                        let Some((next, raw)) = physical.next() else { break };
                        number += 1;
                        for c in std::iter::once('\n').chain(raw.chars()) {
                            lexer.step(c);
                        }
                        end = next + raw.trim_end().len();
                    }
                },
                None | Some('#') => {},
                Some(_) => opaque = Some(indent + owner),
            }
            lines.push_back(Line { number: first, indent, offset, text: &text[offset..end] });
        }
        Self { lines, index: LineIndex::new(text) }
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.front().copied()
    }

    fn next(&mut self) -> Option<Line<'a>> {
        self.lines.pop_front()
    }

    fn push_front(&mut self, line: Line<'a>) {
        self.lines.push_front(line);
    }

    /// Consumes every following line indented deeper than `indent`.
    fn skip_deeper(&mut self, indent: usize) {
        while self.peek().is_some_and(|l| l.indent > indent) {
            self.next();
        }
    }
}

/// Locates the value a line introduces, past any `- ` item markers and a
/// `key:` prefix. Returns the offset of the key or dash owning the value and
/// the offset of the value itself.
fn line_value(text: &str) -> (usize, usize) {
    let mut owner = 0;
    let mut start = 0;
    loop {
        let rest = &text[start..];
        if is_sequence_item(rest) {
            owner = start;
            start = text.len() - rest[1..].trim_start().len();
            continue;
        }
        return match split_key(rest) {
            Some((_, _, offset)) => (start, start + offset),
            None => (owner, start),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Separator,
    Text,
    Trivia,
}

/// Tracks flow brackets, quoted scalars and comments one character at a time.
#[derive(Debug)]
struct Lexer {
    depth: usize,
    quote: Option<char>,
    escaped: bool,
    comment: bool,
    /// Whether a quote here would open a quoted scalar.
    token_start: bool,
    prev: Option<char>,
}
impl Lexer {
    fn new() -> Self {
        Self { depth: 0, quote: None, escaped: false, comment: false, token_start: true, prev: None }
    }

    fn is_balanced(&self) -> bool {
        self.depth == 0 && self.quote.is_none()
    }

    fn step(&mut self, c: char) -> Token {
        let prev = self.prev.replace(c);
        if self.comment {
            self.comment = c != '\n';
            return Token::Trivia;
        }
        match self.quote {
            Some('"') if self.escaped => {
                self.escaped = false;
                return Token::Text;
            },
            Some('"') if c == '\\' => {
                self.escaped = true;
                return Token::Text;
            },
            Some(quote) if c == quote => {
                self.quote = None;
                // `''` inside a single-quoted scalar is an escaped quote.
                self.token_start = quote == '\'';
                return Token::Text;
            },
            Some(_) => return Token::Text,
            None => {},
        }
        let token = match c {
            '#' if prev.is_none_or(char::is_whitespace) => {
                self.comment = true;
                return Token::Trivia;
            },
            c if c.is_whitespace() => return Token::Trivia,
            '"' | '\'' if self.token_start => {
                self.quote = Some(c);
                return Token::Text;
            },
            '[' | '{' => {
                self.depth += 1;
                Token::Open
            },
            ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                Token::Close
            },
            ',' => Token::Separator,
            _ => Token::Text,
        };
        self.token_start = matches!(c, '[' | '{' | ',' | ':');
        token
    }
}

fn is_sequence_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

/// Splits `key: rest` into the key, the remaining value text and the byte
/// offset of that value within `text`.
fn split_key(text: &str) -> Option<(String, &str, usize)> {
    if is_sequence_item(text) || text.starts_with(['[', '{', '|', '>', '&', '*', '!']) {
        return None;
    }
    let (key, after) = match text.chars().next()? {
        quote @ ('"' | '\'') => {
            let close = text[1..].find(quote)? + 1;
            let after = close + 1;
            if !text[after..].starts_with(':') {
                return None;
            }
            (text[1..close].to_string(), after)
        },
        _ => {
            let bytes = text.as_bytes();
            let colon = (0..bytes.len()).find(|&i| {
                bytes[i] == b':' && bytes.get(i + 1).is_none_or(|b| b.is_ascii_whitespace())
            })?;
            (text[..colon].trim_end().to_string(), colon)
        },
    };
    let rest_start = after + 1;
    let rest = &text[rest_start..];
    let trimmed = rest.trim_start();
    let offset = rest_start + (rest.len() - trimmed.len());
    let trimmed = if trimmed.starts_with('#') { "" } else { trimmed };
    Some((key, trimmed, offset))
}

fn parse_node(cursor: &mut Cursor<'_>, indent: usize) -> Node {
    let Some(line) = cursor.peek() else {
        return Node { position: Position::new(1, 1), block: None, kind: NodeKind::Scalar };
    };
    if is_sequence_item(line.text) {
        parse_sequence(cursor, indent)
    } else if split_key(line.text).is_some() {
        parse_mapping(cursor, indent)
    } else {
        cursor.next();
        cursor.skip_deeper(indent);
        let kind = flow_collection(line.text, line.offset, &cursor.index).unwrap_or(NodeKind::Scalar);
        Node { position: Position::new(line.number, line.indent + 1), block: None, kind }
    }
}

fn parse_mapping(cursor: &mut Cursor<'_>, indent: usize) -> Node {
    let mut entries = Vec::new();
    let mut position = None;
    while let Some(line) = cursor.peek() {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            // Stray deeper line (continuation of something we did not model).
            cursor.next();
            continue;
        }
        let Some((key, rest, offset)) = split_key(line.text) else {
            break;
        };
        cursor.next();
        let key_position = Position::new(line.number, line.indent + 1);
        position.get_or_insert(key_position);
        let value = if rest.is_empty() {
            match cursor.peek() {
                Some(next) if next.indent > indent => parse_node(cursor, next.indent),
                // Sequences may sit at the same indentation as their key.
                Some(next) if next.indent == indent && is_sequence_item(next.text) => parse_sequence(cursor, indent),
                _ => Node { position: key_position, block: None, kind: NodeKind::Scalar },
            }
        } else if rest.starts_with(['|', '>']) {
            cursor.skip_deeper(indent);
            Node { position: key_position, block: Some(line.number + 1), kind: NodeKind::Scalar }
        } else {
            cursor.skip_deeper(indent);
            let kind = flow_collection(rest, line.offset + offset, &cursor.index).unwrap_or(NodeKind::Scalar);
            Node { position: key_position, block: None, kind }
        };
        entries.push((key, Node { position: key_position, ..value }));
    }
    Node {
        position: position.unwrap_or(Position::new(1, 1)),
        block: None,
        kind: NodeKind::Mapping(entries),
    }
}

fn parse_sequence(cursor: &mut Cursor<'_>, indent: usize) -> Node {
    let mut items = Vec::new();
    let mut position = None;
    while let Some(line) = cursor.peek() {
        if line.indent != indent || !is_sequence_item(line.text) {
            break;
        }
        cursor.next();
        let dash = Position::new(line.number, line.indent + 1);
        position.get_or_insert(dash);
        let rest = line.text[1..].trim_start();
        let node = if rest.is_empty() || rest.starts_with('#') {
            match cursor.peek() {
                Some(next) if next.indent > indent => parse_node(cursor, next.indent),
                _ => Node { position: dash, block: None, kind: NodeKind::Scalar },
            }
        } else {
            // Re-queue the item content as a line of its own, indented to where
            // it starts, so `- key: value` opens a mapping at that column.
            let skipped = line.text.len() - rest.len();
            cursor.push_front(Line {
                number: line.number,
                indent: line.indent + skipped,
                offset: line.offset + skipped,
                text: rest,
            });
            parse_node(cursor, line.indent + skipped)
        };
        items.push(Node { position: dash, ..node });
    }
    Node {
        position: position.unwrap_or(Position::new(1, 1)),
        block: None,
        kind: NodeKind::Sequence(items),
    }
}

/// Parses a flow collection (`[a, b]` or `{a: 1}`) starting at byte `offset`
/// of the document, giving each element the position it starts at. Nested
/// flow collections are parsed too.
fn flow_collection(text: &str, offset: usize, index: &LineIndex) -> Option<NodeKind> {
    let mapping = match text.chars().next()? {
        '[' => false,
        '{' => true,
        _ => return None,
    };
    let mut lexer = Lexer::new();
    let mut elements: Vec<Range<usize>> = Vec::new();
    let mut start = 1;
    let mut closed = false;
    for (i, c) in text.char_indices() {
        match lexer.step(c) {
            Token::Separator if lexer.depth == 1 => {
                elements.push(start..i);
                start = i + 1;
            },
            Token::Close if lexer.depth == 0 => {
                elements.push(start..i);
                closed = true;
                break;
            },
            _ => {},
        }
    }
    if !closed {
        elements.push(start..text.len());
    }

    let elements = elements.into_iter().filter_map(|range| {
        let lead = first_significant(&text[range.clone()])?;
        let at = range.start + lead;
        Some((offset + at, &text[at..range.end]))
    });
    Some(match mapping {
        false => NodeKind::Sequence(
            elements
                .map(|(at, raw)| Node {
                    position: index.position(at),
                    block: None,
                    kind: flow_collection(raw, at, index).unwrap_or(NodeKind::Scalar),
                })
                .collect(),
        ),
        true => NodeKind::Mapping(
            elements
                .map(|(at, raw)| {
                    let (key, kind) = match split_key(raw) {
                        Some((key, value, value_at)) => {
                            (key, flow_collection(value, at + value_at, index).unwrap_or(NodeKind::Scalar))
                        },
                        None => {
                            let key = raw.split(':').next().unwrap_or_default();
                            (key.trim().trim_matches(['"', '\'']).to_string(), NodeKind::Scalar)
                        },
                    };
                    (key, Node { position: index.position(at), block: None, kind })
                })
                .collect(),
        ),
    })
}

/// Offset of the first character that is neither whitespace nor part of a
/// comment.
fn first_significant(text: &str) -> Option<usize> {
    let mut comment = false;
    let mut prev: Option<char> = None;
    text.char_indices()
        .find(|&(_, c)| {
            let significant = if comment {
                comment = c != '\n';
                false
            } else if c == '#' && prev.is_none_or(char::is_whitespace) {
                comment = true;
                false
            } else {
                !c.is_whitespace()
            };
            prev = Some(c);
            significant
        })
        .map(|(i, _)| i)
}
