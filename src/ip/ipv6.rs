use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use regex::Regex;

static MAPPED_V4_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(
	r"^(?i)::ffff:((?:[0-9]{1,3}\.){3}[0-9]{1,3})$"
).expect("Unable to compile regex"));

/// Expands an IPv6 literal to its full eight-group form.
///
/// Groups are lower-case hex with leading zeros dropped, e.g.
/// `2001:db8:0:0:0:0:0:1`. An `::ffff:a.b.c.d` literal has its IPv4 value
/// spliced into the last two groups of an otherwise zero address. Text that
/// isn't an IPv6 literal comes back trimmed and lower-cased.
pub fn normalize(text: &str) -> String {
	let text = text.trim();
	if let Some(v4) = mapped_ipv4(text) {
		let bits = u32::from(v4);
		return format_groups(&[0, 0, 0, 0, 0, 0, (bits >> 16) as u16, bits as u16]);
	}
	match expand(text) {
		Some(groups) => format_groups(&groups),
		None => text.to_ascii_lowercase(),
	}
}

/// Shortens an IPv6 literal: leading zeros dropped, longest zero run as `::`.
pub fn reduce(text: &str) -> String {
	let text = text.trim();
	let Some(groups) = expand(text) else { return text.to_ascii_lowercase() };
	let (mut run_start, mut run_len) = (0, 0);
	let mut i = 0;
	while i < groups.len() {
		if groups[i] != 0 {
			i += 1;
			continue;
		}
		let start = i;
		while i < groups.len() && groups[i] == 0 {
			i += 1;
		}
		if i - start > run_len {
			run_start = start;
			run_len = i - start;
		}
	}
	if run_len < 2 {
		return format_groups(&groups);
	}
	format!(
		"{}::{}",
		format_groups(&groups[..run_start]),
		format_groups(&groups[run_start + run_len..]),
	)
}

fn mapped_ipv4(text: &str) -> Option<Ipv4Addr> {
	let captures = MAPPED_V4_PATTERN.captures(text)?;
	captures[1].parse().ok()
}

fn expand(text: &str) -> Option<[u16; 8]> {
	text.parse::<Ipv6Addr>().ok()?;
	let mut groups = [0u16; 8];
	match text.split_once("::") {
		Some((head, tail)) => {
			let head = parse_hextets(head)?;
			let tail = parse_hextets(tail)?;
			if head.len() + tail.len() > 7 {
				return None;
			}
			groups[..head.len()].copy_from_slice(&head);
			groups[8 - tail.len()..].copy_from_slice(&tail);
		}
		None => {
			let all = parse_hextets(text)?;
			if all.len() != 8 {
				return None;
			}
			groups.copy_from_slice(&all);
		}
	}
	Some(groups)
}

fn parse_hextets(part: &str) -> Option<Vec<u16>> {
	let mut out = Vec::with_capacity(8);
	if part.is_empty() {
		return Some(out);
	}
	for token in part.split(':') {
		if token.contains('.') {
			let bits = u32::from(token.parse::<Ipv4Addr>().ok()?);
			out.push((bits >> 16) as u16);
			out.push(bits as u16);
		} else {
			out.push(u16::from_str_radix(token, 16).ok()?);
		}
	}
	Some(out)
}

fn format_groups(groups: &[u16]) -> String {
	groups.iter()
		.map(|group| format!("{group:x}"))
		.collect::<Vec<_>>()
		.join(":")
}
