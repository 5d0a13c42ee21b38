//! Typed task and profile endpoints.
//!
//! Each helper is a thin wrapper over [`ApiClient::send`]: it encodes the payload, lets the
//! coordinator handle session recovery, and decodes the `{ message, data }` envelope.

// self
use crate::{
	_prelude::*,
	client::ApiClient,
	http::ApiHttpClient,
	model::{
		Completion, CompletionRecord, HistoryEntry, HistorySummary, HistoryWindow, PasswordChange,
		ProfilePicture, ProfileUpdate, Task, TaskDraft, TaskId, UserProfile, task::CompletionUpdate,
	},
	request::{ApiRequest, MultipartForm},
	store::SessionRecord,
};

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Lists the signed-in user's tasks.
	pub async fn list_tasks(&self) -> Result<Vec<Task>> {
		self.send(ApiRequest::get(self.config.endpoints.tasks.as_str())).await?.data()
	}

	/// Creates a task.
	pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task> {
		let request = ApiRequest::post(self.config.endpoints.tasks.as_str()).with_json(draft)?;

		self.send(request).await?.data()
	}

	/// Replaces the editable fields of a task.
	pub async fn update_task(&self, id: &TaskId, draft: &TaskDraft) -> Result<Task> {
		let request = ApiRequest::put(self.task_path(id)).with_json(draft)?;

		self.send(request).await?.data()
	}

	/// Deletes a task.
	pub async fn delete_task(&self, id: &TaskId) -> Result<()> {
		self.send(ApiRequest::delete(self.task_path(id))).await?;

		Ok(())
	}

	/// Records `completion` for `id` on `date` and returns the stored record.
	pub async fn set_completion(
		&self,
		id: &TaskId,
		date: Date,
		completion: Completion,
	) -> Result<CompletionRecord> {
		let update = CompletionUpdate { date: date.to_string(), completion };
		let request =
			ApiRequest::post(format!("{}/complete", self.task_path(id))).with_json(&update)?;

		self.send(request).await?.data()
	}

	/// Returns the completion history across every task.
	pub async fn task_history(&self) -> Result<Vec<HistoryEntry>> {
		self.send(ApiRequest::get(self.config.endpoints.task_history.as_str())).await?.data()
	}

	/// Summarizes the completion history inside `window`, ending today (UTC).
	pub async fn history_summary(&self, window: HistoryWindow) -> Result<HistorySummary> {
		let history = self.task_history().await?;

		Ok(HistorySummary::new(history, window, OffsetDateTime::now_utc().date()))
	}

	/// Fetches the signed-in user's profile.
	pub async fn fetch_profile(&self) -> Result<UserProfile> {
		self.send(ApiRequest::get(self.config.endpoints.profile.as_str())).await?.data()
	}

	/// Updates the profile and refreshes the cached copy.
	pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
		let request =
			ApiRequest::put(self.config.endpoints.profile_update.as_str()).with_json(update)?;
		let user: UserProfile = self.send(request).await?.data()?;

		self.store.save(SessionRecord::new(user.clone())).await?;

		Ok(user)
	}

	/// Uploads a new profile picture and refreshes the cached profile.
	pub async fn upload_profile_picture(&self, picture: ProfilePicture) -> Result<UserProfile> {
		let ProfilePicture { file_name, content_type, bytes } = picture;
		let form = MultipartForm::new().file("profilePicture", file_name, content_type, bytes);
		let request =
			ApiRequest::post(self.config.endpoints.profile_picture.as_str()).with_form(form);
		let user: UserProfile = self.send(request).await?.data()?;

		self.store.save(SessionRecord::new(user.clone())).await?;

		Ok(user)
	}

	/// Changes the password and returns the server's confirmation message.
	pub async fn change_password(&self, change: &PasswordChange) -> Result<Option<String>> {
		let request =
			ApiRequest::put(self.config.endpoints.password_change.as_str()).with_json(change)?;

		Ok(self.send(request).await?.envelope::<serde_json::Value>()?.message)
	}

	fn task_path(&self, id: &TaskId) -> String {
		format!("{}/{id}", self.config.endpoints.tasks.trim_end_matches('/'))
	}
}
