use ahash::AHashMap;
use axum::http::HeaderMap;

const CGI_PREFIX: &str = "HTTP_";

/// Request headers keyed by canonical name (`X-Forwarded-For`, `Cf-Ray`).
#[derive(Debug, Clone, Default)]
pub struct HeaderBag {
	headers: AHashMap<String, String>,
}

impl HeaderBag {
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot of an HTTP header map. Values that aren't visible ASCII are
	/// skipped, repeated headers are joined with `", "`.
	pub fn from_header_map(headers: &HeaderMap) -> Self {
		let mut bag = Self::new();
		for (name, value) in headers {
			let Ok(value) = value.to_str() else { continue };
			bag.insert(name.as_str(), value);
		}
		bag
	}

	pub fn insert(&mut self, name: &str, value: &str) {
		self.headers
			.entry(canonical_header_name(name))
			.and_modify(|existing| {
				existing.push_str(", ");
				existing.push_str(value);
			})
			.or_insert_with(|| value.to_owned());
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.headers.get(&canonical_header_name(name)).map(String::as_str)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.headers.contains_key(&canonical_header_name(name))
	}

	/// True if every one of `names` is present.
	pub fn contains_all(&self, names: &[&str]) -> bool {
		names.iter().all(|name| self.contains(name))
	}

	/// First comma-separated token of a header, trimmed.
	pub fn first_token(&self, name: &str) -> Option<&str> {
		self.get(name)?
			.split(',')
			.next()
			.map(str::trim)
	}

	pub fn len(&self) -> usize {
		self.headers.len()
	}
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for HeaderBag {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		let mut bag = Self::new();
		for (name, value) in iter {
			bag.insert(name.as_ref(), value.as_ref());
		}
		bag
	}
}

/// `x-forwarded-for`, `X_FORWARDED_FOR`, `HTTP_X_FORWARDED_FOR` and
/// `X-FORWARDED-for` all become `X-Forwarded-For`.
pub fn canonical_header_name(name: &str) -> String {
	let name = name.trim();
	let name = match name.get(..CGI_PREFIX.len()) {
		Some(prefix) if prefix.eq_ignore_ascii_case(CGI_PREFIX) => &name[CGI_PREFIX.len()..],
		_ => name,
	};
	name.split(['-', '_'])
		.map(|segment| {
			let mut chars = segment.chars();
			match chars.next() {
				Some(first) => first.to_ascii_uppercase().to_string()
					+ &chars.as_str().to_ascii_lowercase(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join("-")
}
