use cron::Schedule;
use std::future::Future;
use tokio::task::JoinHandle;

/// Spawns a background task running `job` on every tick of `schedule`.
pub fn spawn_job<F, Fut>(schedule: Schedule, name: &'static str, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            let sleep_duration = match schedule.upcoming(chrono::Utc).next() {
                Some(datetime) => (datetime - chrono::Utc::now())
                    .to_std()
                    .unwrap_or_default(),
                None => {
                    tracing::warn!("no more scheduled runs for job '{}'", name);
                    break;
                }
            };
            tokio::time::sleep(sleep_duration).await;
            tracing::debug!("running scheduled job '{}'", name);
            job().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        str::FromStr,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    #[tokio::test]
    async fn job_runs_on_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let schedule = Schedule::from_str("* * * * * * *").unwrap(); // every second
        let handle = {
            let counter = counter.clone();
            spawn_job(schedule, "test job", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.abort();
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }
}
