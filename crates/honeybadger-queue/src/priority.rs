//! Worker thread scheduling priority
//!
//! Priorities use a 1..=10 scale (5 is normal). On Linux, values below normal raise the
//! calling thread's nice value; values at or above normal leave it unchanged since raising
//! priority needs privileges. Elsewhere this is a no-op.

pub const LOWEST: i32 = 1;
pub const NORMAL: i32 = 5;
pub const HIGHEST: i32 = 10;

/// Maps a 1..=10 priority onto a nice value in 0..=19
pub fn nice_value(priority: i32) -> i32 {
    let priority = priority.clamp(LOWEST, HIGHEST);
    if priority >= NORMAL {
        0
    } else {
        (NORMAL - priority) * 19 / (NORMAL - LOWEST)
    }
}

#[cfg(target_os = "linux")]
pub fn set_current_thread_priority(priority: i32) -> std::io::Result<()> {
    let nice = nice_value(priority);
    if nice == 0 {
        return Ok(());
    }

    // With PRIO_PROCESS and who = 0, Linux applies the value to the calling thread only.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, nice) };
    if rc == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_current_thread_priority(_priority: i32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nice_value_mapping() {
        assert_eq!(nice_value(LOWEST), 19);
        assert_eq!(nice_value(3), 9);
        assert_eq!(nice_value(4), 4);
        assert_eq!(nice_value(NORMAL), 0);
        assert_eq!(nice_value(HIGHEST), 0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(nice_value(-7), 19);
        assert_eq!(nice_value(99), 0);
    }

    #[test]
    fn test_lowering_priority_succeeds() {
        let result = std::thread::spawn(|| set_current_thread_priority(LOWEST))
            .join()
            .unwrap();
        assert!(result.is_ok());
    }
}
