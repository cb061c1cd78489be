//! Real-time scheduling helpers (Linux SCHED_FIFO / mlockall).

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock) {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    #[inline]
    fn is_retryable_memlock_error(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    #[inline]
    fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
        let rc = unsafe { libc::mlockall(flags) };
        if rc != 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    // Lock memory per `lock`; `All` falls back to `Current` on EPERM/ENOMEM.
    fn try_apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
        let result = match lock {
            RtLock::None => return Ok(()),
            RtLock::Current => mlockall(libc::MCL_CURRENT),
            RtLock::All => mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE),
        };
        let Err(err) = result else {
            return Ok(());
        };
        if lock == RtLock::All && is_retryable_memlock_error(&err) {
            match mlockall(libc::MCL_CURRENT) {
                Ok(()) => {
                    tracing::warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
                    return Ok(());
                }
                Err(e2) => {
                    eyre::bail!(
                        "mlockall failed: {err}; fallback mlockall(current) also failed: {e2}; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'"
                    );
                }
            }
        }
        let mut msg = format!("mlockall failed: {err}");
        if is_retryable_memlock_error(&err) {
            msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
        }
        Err(eyre::eyre!(msg))
    }

    // Apply SCHED_FIFO priority, clamped to the system range.
    fn try_apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
        let (min, max) = unsafe {
            let min = sched_get_priority_min(SCHED_FIFO);
            let max = sched_get_priority_max(SCHED_FIFO);
            if min < 0 || max < 0 { (1, 99) } else { (min, max) }
        };
        let prio_val = prio.unwrap_or(max).clamp(min, max);
        let param = sched_param {
            sched_priority: prio_val,
        };
        let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            eyre::bail!(
                "sched_setscheduler(SCHED_FIFO, {prio_val}) failed: {err}; hint: needs CAP_SYS_NICE or root"
            );
        }
        Ok(prio_val)
    }

    RT_ONCE.get_or_init(|| {
        match try_apply_mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "rt memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "rt memory lock not applied"),
        }
        match try_apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "rt SCHED_FIFO applied"),
            Err(err) => tracing::warn!(error = %err, "rt SCHED_FIFO not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(_prio: Option<i32>, _lock: RtLock) {
    tracing::warn!("real-time mode is only supported on Linux; continuing without it");
}
