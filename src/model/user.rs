//! Account and profile payloads.

// self
use crate::{
	_prelude::*,
	model::{Secret, UserId},
};

/// Profile of the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	/// Account identifier.
	#[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
	pub id: Option<UserId>,
	/// Full name.
	#[serde(default)]
	pub fullname: String,
	/// Username.
	#[serde(default)]
	pub username: String,
	/// Email address.
	#[serde(default)]
	pub email: String,
	/// IANA timezone recorded at registration.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timezone: Option<String>,
	/// Relative URL of the profile picture.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub profile_picture_url: Option<String>,
}

/// Login credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
	/// Account email.
	pub email: String,
	/// Account password.
	pub password: Secret,
}
impl Credentials {
	/// Creates credentials for `email`.
	pub fn new(email: impl Into<String>, password: impl Into<Secret>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}

/// Account registration payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
	/// Full name.
	pub fullname: String,
	/// Username.
	pub username: String,
	/// Email address.
	pub email: String,
	/// Password.
	pub password: Secret,
	/// IANA timezone of the user.
	pub timezone: String,
}

/// Profile update payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
	/// Full name.
	pub fullname: String,
	/// Username.
	pub username: String,
	/// Email address.
	pub email: String,
}
impl From<&UserProfile> for ProfileUpdate {
	fn from(profile: &UserProfile) -> Self {
		Self {
			fullname: profile.fullname.clone(),
			username: profile.username.clone(),
			email: profile.email.clone(),
		}
	}
}

/// Password change payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
	/// Password currently in use.
	pub current_password: Secret,
	/// Replacement password.
	pub new_password: Secret,
}
impl PasswordChange {
	/// Builds a change from form input, rejecting a confirmation that differs from
	/// `new_password` before anything is sent.
	pub fn confirmed(
		current_password: impl Into<Secret>,
		new_password: impl Into<Secret>,
		confirmation: impl Into<Secret>,
	) -> Result<Self, PasswordMismatch> {
		let new_password = new_password.into();

		if new_password != confirmation.into() {
			return Err(PasswordMismatch);
		}

		Ok(Self { current_password: current_password.into(), new_password })
	}
}

/// The new password and its confirmation differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("New password and confirmation do not match.")]
pub struct PasswordMismatch;

/// Image uploaded as the profile picture.
#[derive(Clone, PartialEq, Eq)]
pub struct ProfilePicture {
	/// File name reported to the server.
	pub file_name: String,
	/// MIME type, such as `image/png`.
	pub content_type: String,
	/// Encoded image.
	pub bytes: Vec<u8>,
}
impl ProfilePicture {
	/// Wraps an encoded image.
	pub fn new(
		file_name: impl Into<String>,
		content_type: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		Self { file_name: file_name.into(), content_type: content_type.into(), bytes: bytes.into() }
	}
}
impl Debug for ProfilePicture {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProfilePicture")
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// `data` member of a successful login response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct LoginData {
	pub(crate) user: UserProfile,
}
