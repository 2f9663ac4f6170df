// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plain-text rendering for terminal output.

use switchboard_server_flags::{FlagPage, Revision};

pub fn revision_line(revision: &Revision) -> String {
	let subject = match &revision.user {
		Some(user) => format!("user={user}"),
		None => "global".to_string(),
	};
	format!(
		"#{} {} {} {} value={} by={}",
		revision.sequence,
		revision.recorded_at.to_rfc3339(),
		revision.change,
		subject,
		revision.value,
		revision.actor.as_deref().unwrap_or("-"),
	)
}

pub fn page_text(page: &FlagPage) -> String {
	let mut out = String::new();
	for name in &page.flags {
		out.push_str(name);
		out.push('\n');
	}
	if let Some(next) = &page.next_cursor {
		out.push_str(&format!("next cursor: {next}\n"));
	}
	out
}
