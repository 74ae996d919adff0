//! Overdue loan notifier
//!
//! A single recurring job: on every tick of the configured cron schedule it
//! collects the customers with overdue loans and hands their addresses to
//! the notification gateway in one call. Failures end that run only.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{email::Notifier, loans::LoansService};
use crate::{
    config::SchedulerConfig,
    error::{AppError, AppResult},
};

pub struct OverdueNotifier {
    loans: LoansService,
    notifier: Arc<dyn Notifier>,
    message: String,
    schedule: Schedule,
    timezone: Tz,
}

impl OverdueNotifier {
    pub fn new(
        loans: LoansService,
        notifier: Arc<dyn Notifier>,
        config: &SchedulerConfig,
        message: impl Into<String>,
    ) -> AppResult<Self> {
        let schedule = Schedule::from_str(&config.overdue_cron).map_err(|e| {
            AppError::invalid(format!("Invalid cron expression '{}': {}", config.overdue_cron, e))
        })?;
        let timezone = config
            .time_zone()
            .map_err(|e| AppError::invalid(e.to_string()))?;

        Ok(Self {
            loans,
            notifier,
            message: message.into(),
            schedule,
            timezone,
        })
    }

    /// Next fire time strictly after `after`
    pub fn next_run_after(&self, after: DateTime<Utc>) -> Option<DateTime<Tz>> {
        self.schedule.after(&after.with_timezone(&self.timezone)).next()
    }

    /// Notify every customer with an overdue loan; returns how many were addressed
    pub async fn run_once(&self) -> AppResult<usize> {
        let overdue = self.loans.get_all_overdue_loans().await?;
        if overdue.is_empty() {
            tracing::info!("No overdue loans, nothing to notify");
            return Ok(0);
        }

        let recipients: Vec<String> = overdue.into_iter().map(|loan| loan.customer_email).collect();
        self.notifier.send_messages(&self.message, &recipients).await?;

        tracing::info!("Notified {} customer(s) with overdue loans", recipients.len());
        Ok(recipients.len())
    }

    /// Run the job on its schedule until `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(next) = self.next_run_after(now) else {
                    tracing::warn!("Overdue notifier schedule has no upcoming runs, stopping");
                    break;
                };
                let delay = (next.with_timezone(&Utc) - now)
                    .to_std()
                    .unwrap_or_default();
                tracing::debug!("Next overdue notification run at {}", next);

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        if let Err(e) = self.run_once().await {
                            tracing::error!("Overdue notification run failed: {}", e);
                        }
                    }
                }
            }
            tracing::info!("Overdue notifier stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{CreateBook, NewLoan},
        repository::Repository,
        services::{books::BooksService, email::MockNotifier},
    };
    use chrono::{Duration, TimeZone};

    const MESSAGE: &str = "Please return your book";

    struct Fixture {
        repository: Repository,
        loans: LoansService,
    }

    fn fixture() -> Fixture {
        let repository = Repository::in_memory();
        let books = BooksService::new(repository.clone());
        let loans = LoansService::new(repository.clone(), books, chrono_tz::UTC);
        Fixture { repository, loans }
    }

    impl Fixture {
        async fn loan_days_ago(&self, isbn: &str, email: &str, days: i64) -> i64 {
            let book = self
                .repository
                .books
                .save(&CreateBook {
                    title: format!("Book {}", isbn),
                    author: "Author".to_string(),
                    isbn: isbn.to_string(),
                })
                .await
                .unwrap();
            self.repository
                .loans
                .insert(&NewLoan {
                    book_id: book.id,
                    customer: "Customer".to_string(),
                    customer_email: email.to_string(),
                    loan_date: self.loans.today() - Duration::days(days),
                })
                .await
                .unwrap()
                .id
        }

        fn job(&self, notifier: MockNotifier) -> OverdueNotifier {
            OverdueNotifier::new(
                self.loans.clone(),
                Arc::new(notifier),
                &SchedulerConfig::default(),
                MESSAGE,
            )
            .unwrap()
        }
    }

    #[tokio::test]
    async fn sends_overdue_customers_in_one_call() {
        let fx = fixture();
        fx.loan_days_ago("111", "alice@example.com", 10).await;
        fx.loan_days_ago("222", "bob@example.com", 5).await;
        fx.loan_days_ago("333", "carol@example.com", 4).await;

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_messages()
            .withf(|body, recipients| {
                body == MESSAGE && recipients.to_vec() == vec!["alice@example.com", "bob@example.com"]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let sent = fx.job(notifier).run_once().await.unwrap();
        assert_eq!(sent, 2);
    }

    #[tokio::test]
    async fn returned_loans_are_not_notified() {
        let fx = fixture();
        let id = fx.loan_days_ago("111", "alice@example.com", 10).await;
        fx.loans.mark_returned(id, true).await.unwrap();

        let mut notifier = MockNotifier::new();
        notifier.expect_send_messages().times(0);

        assert_eq!(fx.job(notifier).run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn gateway_failure_is_reported_not_retried() {
        let fx = fixture();
        fx.loan_days_ago("111", "alice@example.com", 10).await;

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_messages()
            .times(1)
            .returning(|_, _| Err(AppError::Notification("relay down".to_string())));

        let result = fx.job(notifier).run_once().await;
        assert!(matches!(result, Err(AppError::Notification(_))));
    }

    #[test]
    fn default_schedule_fires_daily_at_local_midnight() {
        let fx = fixture();
        let config = SchedulerConfig {
            timezone: "Europe/Paris".to_string(),
            ..SchedulerConfig::default()
        };
        let job = OverdueNotifier::new(fx.loans, Arc::new(MockNotifier::new()), &config, MESSAGE).unwrap();

        let noon = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let next = job.next_run_after(noon).unwrap();
        assert_eq!(next.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap());

        let following = job.next_run_after(next.with_timezone(&Utc)).unwrap();
        assert_eq!(following - next, Duration::days(1));
    }

    #[test]
    fn rejects_invalid_cron_expression() {
        let fx = fixture();
        let config = SchedulerConfig {
            overdue_cron: "every day".to_string(),
            ..SchedulerConfig::default()
        };
        let result = OverdueNotifier::new(fx.loans, Arc::new(MockNotifier::new()), &config, MESSAGE);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn spawned_job_stops_on_shutdown() {
        let fx = fixture();
        let shutdown = CancellationToken::new();
        let handle = fx.job(MockNotifier::new()).spawn(shutdown.clone());

        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("job did not stop")
            .unwrap();
    }
}
