use std::time::Duration;

use chk_db::repositories::order_repo::OrderRepository;

use crate::services::notify_service::Notifier;

const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Hours an approved order may sit unconfirmed before the first prompt.
const INITIAL_PROMPT_HOURS: i64 = 48;
/// Minimum hours between follow-up reminders.
const REMINDER_SPACING_HOURS: i64 = 4;
/// Reminders sent before the sweep is allowed to auto-complete.
const MAX_REMINDERS: i32 = 6;
/// Hours since approval before auto-completion is considered.
const AUTO_COMPLETE_HOURS: i64 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    None,
    InitialPrompt,
    Reminder { number: i32 },
    AutoComplete,
}

/// Decides what the hourly sweep should do with one approved, unconfirmed
/// order. Auto-completion requires BOTH the age threshold and the full
/// reminder count, so a client always sees every reminder first.
pub fn sweep_action(
    reminders_sent: i32,
    hours_since_approval: i64,
    hours_since_last_reminder: Option<i64>,
) -> SweepAction {
    if hours_since_approval >= AUTO_COMPLETE_HOURS && reminders_sent >= MAX_REMINDERS {
        return SweepAction::AutoComplete;
    }

    if reminders_sent == 0 {
        if hours_since_approval >= INITIAL_PROMPT_HOURS {
            return SweepAction::InitialPrompt;
        }
        return SweepAction::None;
    }

    if reminders_sent < MAX_REMINDERS {
        let spaced = hours_since_last_reminder
            .map(|h| h >= REMINDER_SPACING_HOURS)
            .unwrap_or(true);
        if spaced {
            return SweepAction::Reminder {
                number: reminders_sent + 1,
            };
        }
    }

    SweepAction::None
}

pub struct ConfirmationScheduler {
    orders: OrderRepository,
    notifier: Notifier,
}

impl ConfirmationScheduler {
    pub fn new(orders: OrderRepository, notifier: Notifier) -> Self {
        Self { orders, notifier }
    }

    pub async fn start(&self) {
        tracing::info!("Confirmation scheduler started");
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep().await {
                tracing::error!("Confirmation sweep failed: {}", e);
            }
        }
    }

    async fn sweep(&self) -> anyhow::Result<()> {
        let now = chrono::Utc::now();
        let pending = self.orders.approved_unconfirmed().await?;

        for order in pending {
            let approved_at = match order.approved_at {
                Some(ts) => ts,
                None => continue,
            };
            let hours_since_approval = (now - approved_at).num_hours();
            let hours_since_last = order
                .last_reminder_at
                .map(|ts| (now - ts).num_hours());

            match sweep_action(order.reminders_sent, hours_since_approval, hours_since_last) {
                SweepAction::None => {}
                SweepAction::InitialPrompt => {
                    if let Err(e) = self.notifier.send_confirmation_prompt(&order, 0).await {
                        tracing::warn!("Failed to prompt order {}: {}", order.id, e);
                        continue;
                    }
                    self.orders.record_reminder(order.id, 1, now).await?;
                }
                SweepAction::Reminder { number } => {
                    if let Err(e) = self.notifier.send_confirmation_prompt(&order, number).await {
                        tracing::warn!("Failed to remind order {}: {}", order.id, e);
                        continue;
                    }
                    self.orders.record_reminder(order.id, number, now).await?;
                }
                SweepAction::AutoComplete => {
                    let completed = self.orders.complete_if_approved(order.id, true).await?;
                    if let Some(completed) = completed {
                        tracing::info!("Order {} auto-completed after silence", completed.id);
                        if let Err(e) = self.notifier.notify_auto_completed(&completed).await {
                            tracing::warn!(
                                "Failed to notify auto-completion of order {}: {}",
                                completed.id,
                                e
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_order_waits() {
        assert_eq!(sweep_action(0, 10, None), SweepAction::None);
        assert_eq!(sweep_action(0, 47, None), SweepAction::None);
    }

    #[test]
    fn initial_prompt_at_48_hours() {
        assert_eq!(sweep_action(0, 48, None), SweepAction::InitialPrompt);
        assert_eq!(sweep_action(0, 100, None), SweepAction::InitialPrompt);
    }

    #[test]
    fn reminders_respect_spacing() {
        assert_eq!(
            sweep_action(1, 52, Some(4)),
            SweepAction::Reminder { number: 2 }
        );
        assert_eq!(sweep_action(1, 52, Some(3)), SweepAction::None);
        assert_eq!(
            sweep_action(5, 70, Some(10)),
            SweepAction::Reminder { number: 6 }
        );
    }

    #[test]
    fn auto_complete_needs_both_age_and_reminder_count() {
        assert_eq!(sweep_action(6, 72, Some(1)), SweepAction::AutoComplete);
        assert_eq!(sweep_action(6, 200, Some(1)), SweepAction::AutoComplete);
        // Old but under-reminded: keep reminding, never complete.
        assert_eq!(sweep_action(6, 71, Some(10)), SweepAction::None);
        assert_eq!(sweep_action(3, 100, Some(2)), SweepAction::None);
        assert_eq!(
            sweep_action(3, 100, Some(5)),
            SweepAction::Reminder { number: 4 }
        );
    }

    #[test]
    fn capped_reminders_without_age_do_nothing() {
        assert_eq!(sweep_action(6, 60, Some(20)), SweepAction::None);
    }
}
