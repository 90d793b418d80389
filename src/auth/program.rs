//! Program identity: the logical client on whose behalf tokens are requested.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::RequestError};

/// Validated program identity.
///
/// The trimmed form is what the token URL carries; the lower-cased [`normalized`](Self::normalized)
/// form is what the token store keys on, so `Encentivize` and `encentivize` share cached tokens.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProgramName {
	name: String,
	normalized: String,
}
impl ProgramName {
	/// Trims `value` and rejects blank input.
	pub fn new(value: impl AsRef<str>) -> Result<Self, RequestError> {
		let trimmed = value.as_ref().trim();

		if trimmed.is_empty() {
			return Err(RequestError::ProgramNameBlank);
		}

		Ok(Self { name: trimmed.to_owned(), normalized: normalize(trimmed) })
	}

	/// Trimmed name as supplied by the caller.
	pub fn as_str(&self) -> &str {
		&self.name
	}

	/// Lower-cased name used for cache partitioning.
	pub fn normalized(&self) -> &str {
		&self.normalized
	}
}
impl Deref for ProgramName {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.name
	}
}
impl AsRef<str> for ProgramName {
	fn as_ref(&self) -> &str {
		&self.name
	}
}
impl From<ProgramName> for String {
	fn from(value: ProgramName) -> Self {
		value.name
	}
}
impl TryFrom<String> for ProgramName {
	type Error = RequestError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for ProgramName {
	type Err = RequestError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for ProgramName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Program({})", self.name)
	}
}
impl Display for ProgramName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.name)
	}
}

/// Store-side normalization shared with cache invalidation by raw name.
pub(crate) fn normalize(name: &str) -> String {
	name.trim().to_lowercase()
}
