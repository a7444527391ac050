//! The two credential kinds carried by gateway calls.

// self
use crate::_prelude::*;

/// Credential kind required by a request or held by a store bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
	/// Token identifying the calling application, independent of any user.
	System,
	/// Token identifying the signed-in user; paired with a refresh token.
	User,
}
impl CredentialKind {
	/// Both kinds, in the order the lifecycle check renews them.
	pub const ALL: [Self; 2] = [Self::System, Self::User];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::System => "system",
			Self::User => "user",
		}
	}

	/// Suffix appended to the caller's key name to form this kind's bucket key.
	pub const fn bucket_suffix(self) -> &'static str {
		match self {
			Self::System => "SYSTEM",
			Self::User => "USER",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
