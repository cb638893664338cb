// src/services/scraping.rs

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::{
    sync::{mpsc, watch, RwLock},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplianceRepository, PriceRepository},
    integrations::{
        lowes::{average_price, PriceSource},
        redfin::HousingSource,
    },
    models::{
        property::ApplianceType,
        scraping::{HousingDataResult, JobAccepted, JobKind, JobStatus, PriceUpdateResult, ScrapeJob},
    },
};

type JobRegistry = Arc<RwLock<HashMap<Uuid, ScrapeJob>>>;

/// Finished jobs stay readable this long after their last update.
const FINISHED_JOB_TTL: TimeDelta = TimeDelta::hours(1);
const MAX_FINISHED_JOBS: usize = 256;

// Drops expired finished jobs, then the oldest finished ones past the cap.
// Queued and running jobs are bounded by the queue and always kept.
fn prune_finished(jobs: &mut HashMap<Uuid, ScrapeJob>, now: DateTime<Utc>) {
    jobs.retain(|_, job| !job.status.is_finished() || now - job.updated_at < FINISHED_JOB_TTL);

    let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
        .values()
        .filter(|job| job.status.is_finished())
        .map(|job| (job.updated_at, job.id))
        .collect();
    if finished.len() <= MAX_FINISHED_JOBS {
        return;
    }
    finished.sort_unstable();
    let excess = finished.len() - MAX_FINISHED_JOBS;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
}

#[derive(Debug)]
pub struct QueuedJob {
    pub id: Uuid,
    pub kind: JobKind,
}

/// Producer side of the scraping queue, shared by the HTTP handlers.
#[derive(Clone)]
pub struct ScrapingService {
    sender: mpsc::Sender<QueuedJob>,
    jobs: JobRegistry,
}

impl ScrapingService {
    /// The receiver goes to exactly one [`ScrapingWorker`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender, jobs: Arc::default() }, receiver)
    }

    pub async fn enqueue(&self, user_id: Uuid, kind: JobKind) -> Result<JobAccepted, AppError> {
        let job = ScrapeJob::queued(user_id, kind.clone());
        let id = job.id;
        {
            let mut jobs = self.jobs.write().await;
            prune_finished(&mut jobs, Utc::now());
            jobs.insert(id, job);
        }

        if let Err(e) = self.sender.try_send(QueuedJob { id, kind }) {
            self.jobs.write().await.remove(&id);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => AppError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => {
                    AppError::Scraping("the scraping worker has stopped".to_string())
                }
            });
        }

        tracing::info!(job_id = %id, user_id = %user_id, "Scrape job queued");
        Ok(JobAccepted { job_id: id, status: JobStatus::Queued })
    }

    /// Another user's job reads as absent.
    pub async fn job(&self, user_id: Uuid, id: Uuid) -> Option<ScrapeJob> {
        self.jobs
            .read()
            .await
            .get(&id)
            .filter(|job| job.user_id == user_id)
            .cloned()
    }
}

// ---
// Job execution
// ---

/// Everything a job needs to talk to the outside world.
#[derive(Clone)]
pub struct JobRunner {
    pool: PgPool,
    price_repo: PriceRepository,
    appliance_repo: ApplianceRepository,
    prices: Arc<dyn PriceSource>,
    housing: Arc<dyn HousingSource>,
}

impl JobRunner {
    pub fn new(
        pool: PgPool,
        price_repo: PriceRepository,
        appliance_repo: ApplianceRepository,
        prices: Arc<dyn PriceSource>,
        housing: Arc<dyn HousingSource>,
    ) -> Self {
        Self { pool, price_repo, appliance_repo, prices, housing }
    }

    pub async fn run(&self, kind: &JobKind) -> Result<serde_json::Value, AppError> {
        match kind {
            JobKind::UpdateAppliancePrices => to_value(self.update_appliance_prices().await?),
            JobKind::FetchHousingData { postal_code } => to_value(self.fetch_housing_data(postal_code).await?),
        }
    }

    async fn update_appliance_prices(&self) -> Result<PriceUpdateResult, AppError> {
        let mut averages = BTreeMap::new();
        for appliance_type in ApplianceType::ALL {
            // One failing search should not sink the others
            match self.prices.prices_for(appliance_type).await {
                Ok(found) => {
                    if let Some(average) = average_price(&found) {
                        averages.insert(appliance_type, average);
                    }
                }
                Err(e) => {
                    tracing::warn!(appliance = appliance_type.as_str(), error = %e, "Price scrape failed")
                }
            }
        }

        if averages.is_empty() {
            return Err(AppError::Scraping("no appliance prices could be scraped".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        for (appliance_type, average) in &averages {
            self.price_repo.upsert(&mut *tx, &appliance_type.reference_key(), *average).await?;
            let refreshed = self.appliance_repo.refresh_cost(&mut *tx, *appliance_type, *average).await?;
            tracing::debug!(appliance = appliance_type.as_str(), %average, refreshed, "Reference price stored");
        }
        tx.commit().await?;

        Ok(PriceUpdateResult {
            put_record_status: 200,
            prices: averages.into_iter().map(|(t, price)| (t.reference_key(), price)).collect(),
        })
    }

    async fn fetch_housing_data(&self, postal_code: &str) -> Result<HousingDataResult, AppError> {
        let region = self.housing.region_for(postal_code).await?;
        if region.is_none() {
            tracing::info!(postal_code = %postal_code, "No housing region matched");
        }
        Ok(HousingDataResult {
            fetch_housing_data_status: 200,
            postal_code: postal_code.to_string(),
            region,
        })
    }
}

fn to_value<T: Serialize>(result: T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(result).map_err(|e| AppError::InternalServerError(e.into()))
}

// ---
// Worker
// ---

/// Consumes the queue one job at a time.
pub struct ScrapingWorker {
    receiver: mpsc::Receiver<QueuedJob>,
    jobs: JobRegistry,
    runner: JobRunner,
}

pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stops taking new jobs, lets the current one finish and waits for the task.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Scraping worker panicked");
        }
    }
}

impl ScrapingWorker {
    pub fn new(receiver: mpsc::Receiver<QueuedJob>, service: &ScrapingService, runner: JobRunner) -> Self {
        Self { receiver, jobs: service.jobs.clone(), runner }
    }

    pub fn spawn(self) -> WorkerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        WorkerHandle { shutdown, join }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Scraping worker started");
        loop {
            let next = tokio::select! {
                _ = shutdown.changed() => break,
                next = self.receiver.recv() => next,
            };
            let Some(job) = next else { break };

            self.set_status(job.id, JobStatus::Running, None, None).await;
            match self.runner.run(&job.kind).await {
                Ok(result) => {
                    tracing::info!(job_id = %job.id, "Scrape job succeeded");
                    self.set_status(job.id, JobStatus::Succeeded, Some(result), None).await;
                }
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Scrape job failed");
                    self.set_status(job.id, JobStatus::Failed, None, Some(e.to_string())).await;
                }
            }
        }
        tracing::info!("Scraping worker stopped");
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: JobStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.status = status;
            job.result = result;
            job.error = error;
            job.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    struct NoPrices;

    #[async_trait]
    impl PriceSource for NoPrices {
        async fn prices_for(&self, _: ApplianceType) -> Result<Vec<Decimal>, AppError> {
            Ok(Vec::new())
        }
    }

    struct FixedRegion;

    #[async_trait]
    impl HousingSource for FixedRegion {
        async fn region_for(&self, postal_code: &str) -> Result<Option<Value>, AppError> {
            Ok(Some(json!({"id": format!("2_{postal_code}")})))
        }
    }

    fn runner() -> JobRunner {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        JobRunner::new(
            pool.clone(),
            PriceRepository::new(),
            ApplianceRepository::new(pool),
            Arc::new(NoPrices),
            Arc::new(FixedRegion),
        )
    }

    const OWNER: Uuid = Uuid::from_u128(7);

    async fn wait_for(service: &ScrapingService, id: Uuid, status: JobStatus) -> ScrapeJob {
        for _ in 0..100 {
            if let Some(job) = service.job(OWNER, id).await {
                if job.status == status {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached {status:?}");
    }

    #[tokio::test]
    async fn full_queue_is_a_service_timeout() {
        let (service, _receiver) = ScrapingService::new(1);
        service.enqueue(OWNER, JobKind::UpdateAppliancePrices).await.unwrap();

        let err = service.enqueue(OWNER, JobKind::UpdateAppliancePrices).await.unwrap_err();
        assert!(matches!(err, AppError::QueueFull));
    }

    #[tokio::test]
    async fn housing_jobs_record_their_result() {
        let (service, receiver) = ScrapingService::new(4);
        let worker = ScrapingWorker::new(receiver, &service, runner()).spawn();

        let accepted = service
            .enqueue(OWNER, JobKind::FetchHousingData { postal_code: "62701".to_string() })
            .await
            .unwrap();
        assert_eq!(accepted.status, JobStatus::Queued);

        let job = wait_for(&service, accepted.job_id, JobStatus::Succeeded).await;
        assert_eq!(job.result.unwrap()["region"]["id"], "2_62701");

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn price_job_without_prices_fails() {
        let (service, receiver) = ScrapingService::new(4);
        let worker = ScrapingWorker::new(receiver, &service, runner()).spawn();

        let accepted = service.enqueue(OWNER, JobKind::UpdateAppliancePrices).await.unwrap();
        let job = wait_for(&service, accepted.job_id, JobStatus::Failed).await;
        assert!(job.error.unwrap().contains("no appliance prices"));

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn jobs_are_visible_only_to_their_owner() {
        let (service, _receiver) = ScrapingService::new(4);
        let accepted = service.enqueue(OWNER, JobKind::UpdateAppliancePrices).await.unwrap();

        assert!(service.job(OWNER, accepted.job_id).await.is_some());
        assert!(service.job(Uuid::from_u128(8), accepted.job_id).await.is_none());
    }

    fn job_at(status: JobStatus, updated_at: DateTime<Utc>) -> ScrapeJob {
        let mut job = ScrapeJob::queued(OWNER, JobKind::UpdateAppliancePrices);
        job.status = status;
        job.updated_at = updated_at;
        job
    }

    #[test]
    fn expired_finished_jobs_are_pruned() {
        let now = Utc::now();
        let stale = job_at(JobStatus::Succeeded, now - TimeDelta::hours(2));
        let fresh = job_at(JobStatus::Failed, now - TimeDelta::minutes(5));
        let old_but_queued = job_at(JobStatus::Queued, now - TimeDelta::hours(3));
        let mut jobs: HashMap<Uuid, ScrapeJob> =
            [&stale, &fresh, &old_but_queued].into_iter().map(|j| (j.id, j.clone())).collect();

        prune_finished(&mut jobs, now);

        assert!(!jobs.contains_key(&stale.id));
        assert!(jobs.contains_key(&fresh.id));
        assert!(jobs.contains_key(&old_but_queued.id));
    }

    #[test]
    fn finished_jobs_are_capped_oldest_first() {
        let now = Utc::now();
        let mut jobs = HashMap::new();
        let mut oldest = None;
        for i in 0..(MAX_FINISHED_JOBS + 3) {
            let job = job_at(JobStatus::Succeeded, now - TimeDelta::seconds(1000 - i as i64));
            if i == 0 {
                oldest = Some(job.id);
            }
            jobs.insert(job.id, job);
        }
        let running = job_at(JobStatus::Running, now - TimeDelta::seconds(2000));
        jobs.insert(running.id, running.clone());

        prune_finished(&mut jobs, now);

        assert_eq!(jobs.len(), MAX_FINISHED_JOBS + 1);
        assert!(!jobs.contains_key(&oldest.unwrap()));
        assert!(jobs.contains_key(&running.id));
    }

    #[tokio::test]
    async fn stopped_worker_rejects_new_jobs() {
        let (service, receiver) = ScrapingService::new(4);
        ScrapingWorker::new(receiver, &service, runner()).spawn().shutdown().await;

        let err = service.enqueue(OWNER, JobKind::UpdateAppliancePrices).await.unwrap_err();
        assert!(matches!(err, AppError::Scraping(_)));
        assert!(service.jobs.read().await.is_empty());
    }
}
