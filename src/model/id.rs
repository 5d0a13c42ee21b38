//! Identifiers issued by the server for tasks, users, and completion records.
//!
//! Identifiers are opaque to the client, but they are interpolated into request paths
//! (`/api/tasks/{id}`), so construction rejects anything that could escape a path segment.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const MAX_LEN: usize = 128;

macro_rules! resource_ids {
	($($(#[$meta:meta])* $name:ident => $kind:literal;)+) => {$(
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Label naming the resource in errors and debug output.
			pub const KIND: &'static str = $kind;

			/// Validates `value` as a path-safe identifier.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				if let Some(reason) = Rejection::of(&value) {
					return Err(IdentifierError { kind: Self::KIND, reason });
				}

				Ok(Self(value))
			}

			/// Raw identifier.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl From<$name> for String {
			fn from(id: $name) -> Self {
				id.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				self.as_str()
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				self.as_str()
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				self.as_str()
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.debug_tuple(Self::KIND).field(&self.0).finish()
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	)+};
}

resource_ids! {
	/// Server-issued identifier of a task.
	TaskId => "Task";
	/// Server-issued identifier of a user account.
	UserId => "User";
	/// Server-issued identifier of a completion record.
	RecordId => "Record";
}

/// Identifier rejected during construction or deserialization.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{kind} identifier {reason}.")]
pub struct IdentifierError {
	/// Resource the identifier was meant for.
	pub kind: &'static str,
	/// Why the value was rejected.
	pub reason: Rejection,
}

/// Reason an identifier was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
	/// The value was empty.
	Empty,
	/// The value contains whitespace.
	Whitespace,
	/// The value contains a character that would break out of a path segment.
	Reserved(char),
	/// The value exceeds the length limit.
	TooLong {
		/// Maximum permitted length in bytes.
		max: usize,
	},
}
impl Rejection {
	fn of(value: &str) -> Option<Self> {
		if value.is_empty() {
			return Some(Self::Empty);
		}
		if value.len() > MAX_LEN {
			return Some(Self::TooLong { max: MAX_LEN });
		}

		value.chars().find_map(|c| match c {
			c if c.is_whitespace() => Some(Self::Whitespace),
			'/' | '?' | '#' | '%' => Some(Self::Reserved(c)),
			_ => None,
		})
	}
}
impl Display for Rejection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Empty => f.write_str("cannot be empty"),
			Self::Whitespace => f.write_str("contains whitespace"),
			Self::Reserved(c) => write!(f, "contains the reserved character {c:?}"),
			Self::TooLong { max } => write!(f, "exceeds {max} bytes"),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn path_breaking_values_are_rejected() {
		let err = TaskId::new("65f1c2/../users").expect_err("Path separators must be rejected.");

		assert_eq!(err.reason, Rejection::Reserved('/'));
		assert_eq!(err.to_string(), "Task identifier contains the reserved character '/'.");
		assert_eq!(
			UserId::new("").expect_err("Empty ids must be rejected.").reason,
			Rejection::Empty
		);
		assert_eq!(
			TaskId::new(" 65f1c2").expect_err("Whitespace must be rejected.").reason,
			Rejection::Whitespace
		);
	}

	#[test]
	fn accepted_ids_keep_their_raw_form() {
		let task = TaskId::new("65f1c2a9e4b0").expect("Object ids should be accepted.");

		assert_eq!(task.as_str(), "65f1c2a9e4b0");
		assert_eq!(format!("/api/tasks/{task}"), "/api/tasks/65f1c2a9e4b0");
		assert_eq!(format!("{task:?}"), "Task(\"65f1c2a9e4b0\")");
	}

	#[test]
	fn deserialization_validates() {
		let record: RecordId =
			serde_json::from_str("\"r-1\"").expect("Record id should deserialize.");

		assert_eq!(&*record, "r-1");
		assert!(serde_json::from_str::<RecordId>("\"a?b\"").is_err());
		assert!(serde_json::from_str::<UserId>(&format!("\"{}\"", "u".repeat(MAX_LEN))).is_ok());
		assert!(
			serde_json::from_str::<UserId>(&format!("\"{}\"", "u".repeat(MAX_LEN + 1))).is_err()
		);
	}

	#[test]
	fn ids_key_maps_by_str() {
		let map = HashMap::from([(TaskId::new("t-1").expect("Fixture id should be valid."), 7_u8)]);

		assert_eq!(map.get("t-1"), Some(&7));
	}
}
