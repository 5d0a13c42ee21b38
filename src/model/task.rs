//! Task, completion, and history payloads.

// self
use crate::{
	_prelude::*,
	model::{RecordId, TaskId},
};

/// Error returned when a completion percentage is not one of the supported steps.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Completion must be one of 0, 25, 50, 75, or 100; got {value}.")]
pub struct CompletionError {
	/// Rejected percentage.
	pub value: u8,
}

/// Incremental completion step of a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Completion {
	/// 0 %.
	#[default]
	NotStarted,
	/// 25 %.
	JustStarted,
	/// 50 %.
	InProgress,
	/// 75 %.
	AlmostDone,
	/// 100 %.
	Completed,
}
impl Completion {
	/// Every step, in ascending order.
	pub const ALL: [Completion; 5] = [
		Completion::NotStarted,
		Completion::JustStarted,
		Completion::InProgress,
		Completion::AlmostDone,
		Completion::Completed,
	];

	/// Percentage represented by the step.
	pub const fn percent(self) -> u8 {
		match self {
			Completion::NotStarted => 0,
			Completion::JustStarted => 25,
			Completion::InProgress => 50,
			Completion::AlmostDone => 75,
			Completion::Completed => 100,
		}
	}

	/// Display label for the step.
	pub const fn label(self) -> &'static str {
		match self {
			Completion::NotStarted => "Not Started",
			Completion::JustStarted => "Just Started",
			Completion::InProgress => "In Progress",
			Completion::AlmostDone => "Almost Done",
			Completion::Completed => "Completed",
		}
	}

	/// Step closest to `percent` after clamping it to 0..=100; halfway values round up.
	pub fn nearest(percent: f64) -> Self {
		let step = (percent.clamp(0.0, 100.0) / 25.0).round() as usize;

		Self::ALL.get(step).copied().unwrap_or_default()
	}

	/// Returns `true` once the task is fully done.
	pub const fn is_complete(self) -> bool {
		matches!(self, Completion::Completed)
	}
}
impl TryFrom<u8> for Completion {
	type Error = CompletionError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Self::ALL.into_iter().find(|step| step.percent() == value).ok_or(CompletionError { value })
	}
}
impl From<Completion> for u8 {
	fn from(value: Completion) -> Self {
		value.percent()
	}
}
impl Display for Completion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}%", self.percent())
	}
}

/// Task priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
	/// High priority.
	High,
	/// Medium priority.
	#[default]
	Medium,
	/// Low priority.
	Low,
}

/// How often a task repeats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recurrence {
	/// Every day.
	#[default]
	Daily,
	/// Every week.
	Weekly,
	/// User-defined schedule.
	Custom,
	/// One-off task.
	#[serde(rename = "None")]
	Once,
}

/// One completion entry recorded against a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
	/// Record identifier.
	#[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
	pub id: Option<RecordId>,
	/// Day the record applies to (ISO-8601 date or timestamp).
	pub date: String,
	/// Recorded completion.
	#[serde(rename = "completionPercentage", default)]
	pub completion: Completion,
}
impl CompletionRecord {
	/// Returns `true` when the record belongs to `day`.
	pub fn is_on(&self, day: Date) -> bool {
		self.date.starts_with(&day.to_string())
	}
}

/// Task as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
	/// Task identifier.
	#[serde(rename = "_id")]
	pub id: TaskId,
	/// Task name.
	pub name: String,
	/// Free-form description.
	#[serde(default)]
	pub description: String,
	/// Priority.
	#[serde(default)]
	pub priority: Priority,
	/// Start of the task's time box.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_time: Option<String>,
	/// End of the task's time box.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end_time: Option<String>,
	/// Recurrence.
	#[serde(default)]
	pub recurrence: Recurrence,
	/// Stored completion.
	#[serde(rename = "completionPercentage", default)]
	pub completion: Completion,
	/// Completion records, newest first.
	#[serde(rename = "completionHistory", default)]
	pub completion_history: Vec<CompletionRecord>,
}
impl Task {
	/// Completion that applies on `today`: the newest record when it belongs to `today`,
	/// otherwise the stored completion.
	pub fn completion_on(&self, today: Date) -> Completion {
		match self.completion_history.first() {
			Some(latest) if latest.is_on(today) => latest.completion,
			_ => self.completion,
		}
	}
}

/// Payload used to create or update a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
	/// Task name.
	pub name: String,
	/// Free-form description.
	pub description: String,
	/// Priority.
	pub priority: Priority,
	/// Start of the time box.
	pub start_time: String,
	/// End of the time box.
	pub end_time: String,
	/// Recurrence.
	pub recurrence: Recurrence,
}
impl TaskDraft {
	/// Creates a draft with default priority and recurrence.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			description: String::new(),
			priority: Priority::default(),
			start_time: String::new(),
			end_time: String::new(),
			recurrence: Recurrence::default(),
		}
	}

	/// Sets the description.
	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();

		self
	}

	/// Sets the priority.
	pub fn priority(mut self, priority: Priority) -> Self {
		self.priority = priority;

		self
	}

	/// Sets the time box.
	pub fn time_box(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
		self.start_time = start.into();
		self.end_time = end.into();

		self
	}

	/// Sets the recurrence.
	pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
		self.recurrence = recurrence;

		self
	}
}
impl From<&Task> for TaskDraft {
	fn from(task: &Task) -> Self {
		Self {
			name: task.name.clone(),
			description: task.description.clone(),
			priority: task.priority,
			start_time: task.start_time.clone().unwrap_or_default(),
			end_time: task.end_time.clone().unwrap_or_default(),
			recurrence: task.recurrence,
		}
	}
}

/// Body of a completion update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct CompletionUpdate {
	pub(crate) date: String,
	#[serde(rename = "completionPercentage")]
	pub(crate) completion: Completion,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::date;
	// self
	use super::*;

	#[test]
	fn completion_accepts_only_supported_steps() {
		assert_eq!(Completion::try_from(75_u8), Ok(Completion::AlmostDone));
		assert_eq!(Completion::try_from(30_u8), Err(CompletionError { value: 30 }));
		assert_eq!(Completion::Completed.label(), "Completed");
		assert_eq!(Completion::JustStarted.to_string(), "25%");
		assert!(serde_json::from_str::<Completion>("60").is_err());
		assert_eq!(Completion::nearest(60.0), Completion::InProgress);
		assert_eq!(Completion::nearest(62.5), Completion::AlmostDone);
		assert_eq!(Completion::nearest(140.0), Completion::Completed);
		assert_eq!(Completion::nearest(-3.0), Completion::NotStarted);
		assert_eq!(Completion::nearest(f64::NAN), Completion::NotStarted);
		assert_eq!(
			serde_json::to_string(&Completion::InProgress).expect("Completion should serialize."),
			"50"
		);
	}

	#[test]
	fn task_decodes_api_shape_and_picks_todays_completion() {
		let payload = serde_json::json!({
			"_id": "65f1c2",
			"name": "Morning run",
			"priority": "High",
			"start_time": "06:00",
			"end_time": "07:00",
			"recurrence": "None",
			"completionPercentage": 25,
			"completionHistory": [
				{ "_id": "rec-2", "date": "2025-11-10T00:00:00.000Z", "completionPercentage": 75 },
				{ "_id": "rec-1", "date": "2025-11-09T00:00:00.000Z", "completionPercentage": 100 }
			],
			"user": "ignored"
		});
		let task: Task = serde_json::from_value(payload).expect("Task should decode.");

		assert_eq!(task.priority, Priority::High);
		assert_eq!(task.recurrence, Recurrence::Once);
		assert_eq!(task.completion_on(date!(2025 - 11 - 10)), Completion::AlmostDone);
		assert_eq!(task.completion_on(date!(2025 - 11 - 11)), Completion::JustStarted);

		let draft = TaskDraft::from(&task);

		assert_eq!(draft.start_time, "06:00");
		assert_eq!(draft.recurrence, Recurrence::Once);
	}
}
