//! Raises the process's open-file-descriptor soft limit at driver startup
//! (REDESIGN FLAGS: resource limits raised via process-wide state are
//! isolated here as a single side-effecting call, not threaded through
//! every component that might open a file).

/// Read the current `RLIMIT_NOFILE` soft and hard limits.
#[must_use]
pub fn current_nofile_limit() -> (u64, u64) {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, fully-initialized `libc::rlimit` and
    // `RLIMIT_NOFILE` is a well-known resource id; `getrlimit` only writes
    // through the pointer we provide.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc == 0 {
        (limit.rlim_cur, limit.rlim_max)
    } else {
        (256, 256)
    }
}

/// Raise the soft `RLIMIT_NOFILE` limit to `wanted`, clamped to the
/// process's hard limit. Returns the soft limit actually in effect
/// afterward. Best-effort: a failed `setrlimit` call just leaves the
/// existing soft limit in place.
#[must_use]
pub fn raise_nofile_limit(wanted: u64) -> u64 {
    let (soft, hard) = current_nofile_limit();
    if soft >= wanted || soft >= hard {
        return soft;
    }
    let target = wanted.min(hard);
    let limit = libc::rlimit {
        rlim_cur: target,
        rlim_max: hard,
    };
    // SAFETY: `limit` is a valid `libc::rlimit` with `rlim_cur <= rlim_max`
    // as required by `setrlimit`; we only ever raise the soft limit toward
    // (never past) the existing hard limit.
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) };
    if rc == 0 {
        target
    } else {
        soft
    }
}

/// The descriptor budget to hand to the joiner: leaves headroom for stdio,
/// the output file, and whatever else the process already has open.
#[must_use]
pub fn descriptor_budget() -> usize {
    let (soft, hard) = current_nofile_limit();
    let raised = raise_nofile_limit(hard.min(65536));
    let budget = raised.max(soft);
    usize::try_from(budget.saturating_sub(32)).unwrap_or(usize::MAX).max(2)
}
