//! Deny-by-default path allow-list guarding the generic proxy.

// crates.io
use regex::Regex;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, ValidationError},
};

/// Downstream path patterns the generic proxy may reach.
///
/// The list is the capability boundary preventing arbitrary-path SSRF through the proxy:
/// a path is checked before any URL construction or network work, and anything that does
/// not match one of the compiled patterns is rejected.
#[derive(Clone, Debug)]
pub struct PathAllowList {
	patterns: Vec<Regex>,
}
impl PathAllowList {
	/// Patterns compiled by [`PathAllowList::default`].
	pub const DEFAULT_PATTERNS: [&'static str; 2] =
		["^/api/flows(/.*)?$", "^/api/runs(/.*)?$"];

	/// Compiles an allow-list from the provided patterns.
	pub fn new<I>(patterns: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator,
		I::Item: AsRef<str>,
	{
		let patterns = patterns
			.into_iter()
			.map(|pattern| {
				let pattern = pattern.as_ref();

				Regex::new(pattern).map_err(|source| ConfigError::InvalidAllowListPattern {
					pattern: pattern.to_owned(),
					source,
				})
			})
			.collect::<Result<_, _>>()?;

		Ok(Self { patterns })
	}

	/// Whether the path matches at least one pattern.
	pub fn permits(&self, path: &str) -> bool {
		self.patterns.iter().any(|pattern| pattern.is_match(path))
	}

	/// Rejects paths outside the list with the validation taxonomy.
	pub fn ensure(&self, path: &str) -> Result<(), ValidationError> {
		if self.permits(path) {
			Ok(())
		} else {
			Err(ValidationError::PathNotAllowed { path: path.to_owned() })
		}
	}
}
impl Default for PathAllowList {
	fn default() -> Self {
		Self::new(Self::DEFAULT_PATTERNS)
			.expect("Built-in allow-list patterns compile unconditionally.")
	}
}
