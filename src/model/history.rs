//! Completion history rows and the trend summary built from them.
//!
//! History rows may carry percentages recorded before completion was restricted to steps, so
//! they are snapped to the nearest [`Completion`] instead of being rejected.

// crates.io
use serde::Deserializer;
use time::macros::format_description;
// self
use crate::{
	_prelude::*,
	model::{Completion, RecordId, TaskId},
};

/// Minimal task view embedded in history entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
	/// Task identifier.
	#[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
	pub id: Option<TaskId>,
	/// Task name.
	#[serde(default)]
	pub name: String,
}

/// One row of the completion history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
	/// Record identifier.
	#[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
	pub id: Option<RecordId>,
	/// Task the record belongs to, when the server populated it.
	#[serde(rename = "task_id", default, skip_serializing_if = "Option::is_none")]
	pub task: Option<TaskSummary>,
	/// Day the record applies to (ISO-8601 date or timestamp).
	pub date: String,
	/// Recorded completion, snapped to the nearest step.
	#[serde(rename = "completionPercentage", default, deserialize_with = "snap_completion")]
	pub completion: Completion,
}
impl HistoryEntry {
	/// Name of the task, falling back to `"Unnamed Task"`.
	pub fn task_name(&self) -> &str {
		self.task
			.as_ref()
			.map(|task| task.name.as_str())
			.filter(|name| !name.is_empty())
			.unwrap_or("Unnamed Task")
	}

	/// Calendar day of the record, if `date` starts with `YYYY-MM-DD`.
	pub fn day(&self) -> Option<Date> {
		let format = format_description!("[year]-[month]-[day]");

		Date::parse(self.date.get(..10)?, &format).ok()
	}
}

/// Range of history a [`HistorySummary`] covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HistoryWindow {
	/// Every row the server returned.
	#[default]
	All,
	/// Rows dated within the seven days before `today`, or later.
	LastWeek,
}
impl HistoryWindow {
	/// Returns `true` when `entry` falls inside the window ending on `today`.
	///
	/// Rows without a readable date only appear in [`HistoryWindow::All`].
	pub fn contains(self, entry: &HistoryEntry, today: Date) -> bool {
		match self {
			Self::All => true,
			Self::LastWeek => match (entry.day(), today.checked_sub(Duration::days(7))) {
				(Some(day), Some(start)) => day >= start,
				(Some(_), None) => true,
				(None, _) => false,
			},
		}
	}
}

/// Completion trend over a window of history rows.
#[derive(Clone, Debug, PartialEq)]
pub struct HistorySummary {
	/// Window the summary covers.
	pub window: HistoryWindow,
	/// Rows inside the window, in server order.
	pub entries: Vec<HistoryEntry>,
	/// Mean completion percentage of `entries`; `0.0` when there are none.
	pub average_completion: f64,
}
impl HistorySummary {
	/// Keeps the rows of `history` inside `window` and averages their completion.
	pub fn new(history: Vec<HistoryEntry>, window: HistoryWindow, today: Date) -> Self {
		let entries = history
			.into_iter()
			.filter(|entry| window.contains(entry, today))
			.collect::<Vec<_>>();
		let average_completion = if entries.is_empty() {
			0.0
		} else {
			entries.iter().map(|entry| f64::from(entry.completion.percent())).sum::<f64>()
				/ entries.len() as f64
		};

		Self { window, entries, average_completion }
	}

	/// Number of rows that reached 100 %.
	pub fn completed(&self) -> usize {
		self.entries.iter().filter(|entry| entry.completion.is_complete()).count()
	}
}

fn snap_completion<'de, D>(deserializer: D) -> Result<Completion, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<f64>::deserialize(deserializer)?.map(Completion::nearest).unwrap_or_default())
}
