use std::borrow::Cow;
use std::sync::LazyLock;

use logos::Lexer;
use logos::Logos;
use regex::Captures;
use regex::Regex;

use crate::tokens::Notation;
use crate::tokens::Tag;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// `<!-- # ... -->`. A comment alone on its line takes the line with it.
static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?m)^[ \t]*<!-- #(?s:.*?)-->[ \t]*(?:\r?\n|\z)|<!-- #(?s:.*?)-->")
		.expect("comment pattern is valid")
});

/// MiniJinja style regions: `{{ ... }}`, `{% ... %}` and `{# ... #}`.
static HOST_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)\{([{%#])(.*?)([}%#])\}").expect("host snippet pattern is valid")
});

/// Controls how source text is prepared before tags are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexOptions {
	/// Remove host snippets (`{{ expr }}`, `{% stmt %}`, `{# note #}`) from
	/// the source before compilation.
	pub strip_host_snippets: bool,
	/// When stripping, snippets that do not look like directives are kept as
	/// escaped literal text instead of being removed.
	pub passthrough_literals: bool,
}

impl Default for LexOptions {
	fn default() -> Self {
		Self {
			strip_host_snippets: false,
			passthrough_literals: true,
		}
	}
}

/// Raw tokens produced by logos. Everything that is not the start of a tag
/// ends up in one of the text variants.
#[derive(Logos, Debug, PartialEq)]
enum RawToken {
	#[token("<tpl:")]
	AngleOpen,
	#[token("<~tpl:")]
	AngleOpenStrip,
	#[token("</tpl:")]
	AngleClose,
	#[token("</~tpl:")]
	AngleCloseStrip,
	#[token("{{tpl:")]
	BraceOpen,
	#[token("{{~tpl:")]
	BraceOpenStrip,
	#[regex(r"[^<{]+")]
	Text,
	#[token("<")]
	LessThan,
	#[token("{")]
	BraceStart,
}

/// Remove template comments and apply the host snippet policy.
pub fn preprocess<'a>(source: &'a str, options: &LexOptions) -> Cow<'a, str> {
	let source = COMMENT.replace_all(source, "");

	if !options.strip_host_snippets {
		return source;
	}

	let stripped = HOST_SNIPPET
		.replace_all(&source, |captures: &Captures<'_>| {
			host_snippet_replacement(captures, options)
		})
		.into_owned();

	Cow::Owned(stripped)
}

fn host_snippet_replacement(captures: &Captures<'_>, options: &LexOptions) -> String {
	let whole = &captures[0];
	let body = &captures[2];
	let closes = match &captures[1] {
		"{" => "}",
		"%" => "%",
		_ => "#",
	};

	// Our own tags and unbalanced delimiters are none of our business here.
	if &captures[3] != closes || body.starts_with("tpl:") || body.starts_with("~tpl:") {
		return whole.to_string();
	}

	let is_directive = closes == "#"
		|| body.starts_with(|c: char| c.is_whitespace() || c == '-' || c == '+');

	if is_directive || !options.passthrough_literals {
		String::new()
	} else {
		format!("{{% raw %}}{whole}{{% endraw %}}")
	}
}

/// Split template text into an ordered sequence of text and tag tokens and
/// apply whitespace control.
pub fn tokenize(source: &str) -> Vec<Token> {
	let mut walker = TokenWalker::new(source);
	walker.process();
	let mut tokens = walker.tokens;
	apply_whitespace_control(&mut tokens);
	tokens
}

struct TokenWalker<'a> {
	lexer: Lexer<'a, RawToken>,
	/// Start of the pending text run, if any.
	text_start: Option<usize>,
	tokens: Vec<Token>,
}

impl<'a> TokenWalker<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			lexer: RawToken::lexer(source),
			text_start: None,
			tokens: vec![],
		}
	}

	fn process(&mut self) {
		while let Some(result) = self.lexer.next() {
			let start = self.lexer.span().start;
			let scanned = match result {
				Ok(RawToken::AngleOpen) => self.scan_open(false),
				Ok(RawToken::AngleOpenStrip) => self.scan_open(true),
				Ok(RawToken::AngleClose) => self.scan_close(false),
				Ok(RawToken::AngleCloseStrip) => self.scan_close(true),
				Ok(RawToken::BraceOpen) => self.scan_value(false),
				Ok(RawToken::BraceOpenStrip) => self.scan_value(true),
				Ok(RawToken::Text | RawToken::LessThan | RawToken::BraceStart) | Err(()) => None,
			};

			match scanned {
				Some(kind) => {
					self.flush_text(start);
					let end = self.lexer.span().end;
					self.tokens.push(Token {
						kind,
						span: start..end,
					});
				}
				None => {
					self.text_start.get_or_insert(start);
				}
			}
		}

		let end = self.lexer.source().len();
		self.flush_text(end);
	}

	fn flush_text(&mut self, end: usize) {
		let Some(start) = self.text_start.take() else {
			return;
		};

		if start < end {
			let text = self.lexer.source()[start..end].to_string();
			self.tokens.push(Token {
				kind: TokenKind::Text(text),
				span: start..end,
			});
		}
	}

	/// `<tpl:Name attrs ~/>` after the opener was consumed.
	fn scan_open(&mut self, strip_before: bool) -> Option<TokenKind> {
		let remainder = self.lexer.remainder();
		let name_len = name_length(remainder)?;
		let close = find_outside_quotes(&remainder[name_len..], ">")?;
		let mut body = remainder[name_len..name_len + close].trim_end();

		let mut strip_after = false;
		let mut self_closing = false;
		for _ in 0..2 {
			if let Some(rest) = body.strip_suffix('~').filter(|_| !strip_after) {
				strip_after = true;
				body = rest.trim_end();
			} else if let Some(rest) = body.strip_suffix('/').filter(|_| !self_closing) {
				self_closing = true;
				body = rest.trim_end();
			}
		}

		if !body.is_empty() && !body.starts_with(char::is_whitespace) {
			return None;
		}

		let tag = Tag {
			name: remainder[..name_len].to_string(),
			attrs_raw: body.trim().to_string(),
			notation: Notation::Angle,
			strip_before,
			strip_after,
			self_closing,
		};
		self.lexer.bump(name_len + close + 1);

		Some(TokenKind::OpenBlock(tag))
	}

	/// `</tpl:Name~>` after the opener was consumed.
	fn scan_close(&mut self, strip_before: bool) -> Option<TokenKind> {
		let remainder = self.lexer.remainder();
		let name_len = name_length(remainder)?;
		let rest = &remainder[name_len..];
		let trimmed = rest.trim_start_matches([' ', '\t']);
		let (strip_after, after_marker) = match trimmed.strip_prefix('~') {
			Some(after) => (true, after),
			None => (false, trimmed),
		};

		if !after_marker.starts_with('>') {
			return None;
		}

		let consumed = name_len + (rest.len() - after_marker.len()) + 1;
		let tag = Tag {
			name: remainder[..name_len].to_string(),
			attrs_raw: String::new(),
			notation: Notation::Angle,
			strip_before,
			strip_after,
			self_closing: false,
		};
		self.lexer.bump(consumed);

		Some(TokenKind::CloseBlock(tag))
	}

	/// `{{tpl:Name attrs~}}` after the opener was consumed.
	fn scan_value(&mut self, strip_before: bool) -> Option<TokenKind> {
		let remainder = self.lexer.remainder();
		let name_len = name_length(remainder)?;
		let close = find_outside_quotes(&remainder[name_len..], "}}")?;
		let mut body = remainder[name_len..name_len + close].trim_end();

		let strip_after = match body.strip_suffix('~') {
			Some(rest) => {
				body = rest;
				true
			}
			None => false,
		};

		if !body.is_empty() && !body.starts_with(char::is_whitespace) {
			return None;
		}

		let tag = Tag {
			name: remainder[..name_len].to_string(),
			attrs_raw: body.trim().to_string(),
			notation: Notation::Brace,
			strip_before,
			strip_after,
			self_closing: false,
		};
		self.lexer.bump(name_len + close + 2);

		Some(TokenKind::Value(tag))
	}
}

/// Length of the `[A-Za-z0-9_]+` name at the start of `text`.
fn name_length(text: &str) -> Option<usize> {
	let len = text
		.bytes()
		.take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
		.count();

	(len > 0).then_some(len)
}

/// Byte offset of the first `needle` in `haystack` that is not inside a
/// double-quoted attribute value.
fn find_outside_quotes(haystack: &str, needle: &str) -> Option<usize> {
	let mut in_quotes = false;

	for (index, ch) in haystack.char_indices() {
		if ch == '"' {
			in_quotes = !in_quotes;
		} else if !in_quotes && haystack[index..].starts_with(needle) {
			return Some(index);
		}
	}

	None
}

fn apply_whitespace_control(tokens: &mut [Token]) {
	for index in 0..tokens.len() {
		let Some(tag) = tokens[index].tag() else {
			continue;
		};
		let (strip_before, strip_after) = (tag.strip_before, tag.strip_after);

		if strip_before && index > 0 {
			if let TokenKind::Text(text) = &mut tokens[index - 1].kind {
				let kept = text.trim_end_matches([' ', '\t']).len();
				text.truncate(kept);
			}
		}

		if strip_after {
			if let Some(Token {
				kind: TokenKind::Text(text),
				..
			}) = tokens.get_mut(index + 1)
			{
				let rest = text.trim_start_matches([' ', '\t']);
				let rest = rest
					.strip_prefix("\r\n")
					.or_else(|| rest.strip_prefix('\n'))
					.unwrap_or(rest);
				*text = rest.to_string();
			}
		}
	}
}
