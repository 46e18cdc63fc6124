//! Maps the adaptation layer's internal failures to legacy `errno` values.

use crate::error::{CoreError, FailureKind};
use errno::{set_errno, Errno};

/// Set the process-global `errno` from a pending cooperative failure (or its
/// absence) and return the `-1` sentinel callers of the legacy adapters use.
///
/// `EINTR` covers both "no failure was pending" (a spurious wakeup) and
/// [`FailureKind::Other`], which is additionally logged as a warning since it
/// represents a callback-raised failure the caller has no other way to see.
pub fn map_failure(failure: Option<FailureKind>) -> i32 {
	let code = match failure {
		None => libc::EINTR,
		Some(FailureKind::Cancelled) => libc::ECANCELED,
		Some(FailureKind::TimedOut) => libc::ETIMEDOUT,
		Some(FailureKind::Other) => {
			log::warn!("adapter resumed with an unclassified failure, surfacing as EINTR");
			libc::EINTR
		}
	};
	set_errno(Errno(code));
	-1
}

/// Set `errno` from a [`CoreError`] raised synchronously (context/alloc errors,
/// never [`CoreError::Cooperative`] — that path goes through [`map_failure`]).
pub fn map_core_error(err: &CoreError) -> i32 {
	let code = match err {
		CoreError::Context => libc::EINVAL,
		CoreError::Alloc(_) => libc::ENOMEM,
		CoreError::Cooperative(kind) => return map_failure(Some(*kind)),
		CoreError::EngineMulti(_) | CoreError::Engine(_) => libc::EIO,
	};
	log::debug!("adapter failed synchronously: {}", err);
	set_errno(Errno(code));
	-1
}
