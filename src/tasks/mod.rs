use std::time::Duration;

use chrono::Utc;

use crate::config::SchedulerConfig;
use crate::services::attendance::AttendanceService;
use crate::services::slots::SlotService;

/// Background sweeps: expired lock release, learner auto-confirmation, tutor
/// non-response escalation, session reminders. Each runs on its own interval;
/// a failed pass is logged and retried on the next tick.
pub fn spawn_sweepers(
    config: SchedulerConfig,
    slots: SlotService,
    attendance: AttendanceService,
) {
    tokio::spawn({
        let slots = slots.clone();
        let period = Duration::from_secs(config.lock_sweep_secs);
        async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match slots.sweep_expired_locks(Utc::now()).await {
                    Ok(0) => {}
                    Ok(released) => log::info!("Lock sweep released {} expired slots", released),
                    Err(e) => log::error!("Lock sweep failed: {}", e),
                }
            }
        }
    });

    tokio::spawn({
        let attendance = attendance.clone();
        let period = Duration::from_secs(config.attendance_sweep_secs);
        async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match attendance.auto_confirm_learner_join(Utc::now()).await {
                    Ok(0) => {}
                    Ok(confirmed) => {
                        log::info!("Attendance sweep auto-confirmed {} sessions", confirmed)
                    }
                    Err(e) => log::error!("Attendance sweep failed: {}", e),
                }
            }
        }
    });

    tokio::spawn({
        let attendance = attendance.clone();
        let period = Duration::from_secs(config.complaint_sweep_secs);
        async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match attendance.auto_mark_tutor_absent(Utc::now()).await {
                    Ok(0) => {}
                    Ok(marked) => {
                        log::info!("Complaint sweep marked {} tutors absent for non-response", marked)
                    }
                    Err(e) => log::error!("Complaint sweep failed: {}", e),
                }
            }
        }
    });

    tokio::spawn({
        let attendance = attendance.clone();
        let period = Duration::from_secs(config.reminder_sweep_secs);
        async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match attendance.send_session_reminders(Utc::now()).await {
                    Ok(0) => {}
                    Ok(sent) => log::info!("Reminder sweep notified {} sessions", sent),
                    Err(e) => log::error!("Reminder sweep failed: {}", e),
                }
            }
        }
    });
}
