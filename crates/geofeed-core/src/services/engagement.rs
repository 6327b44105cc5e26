use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use futures::future::try_join_all;
use uuid::Uuid;

use crate::domain::{
    AuditAction, CounterSync, LikeAuditEvent, LikeState, LikeSummary, TargetRef, ToggleLikeResult,
};
use crate::error::DomainError;
use crate::ports::{
    CounterCache, Job, JobHandler, JobQueue, JobResult, LikeRepository, job_handler,
};

/// Job type of audit replication jobs.
pub const AUDIT_JOB_TYPE: &str = "like_audit";

/// Default bound on a single audit write.
pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Idempotent like/unlike per (target, user).
///
/// The like row is the source of truth and is only changed through
/// conditional writes, so for any transition at most one concurrent caller
/// sees `changed == true`. Counters move only on such a change. Counter
/// cache failures are logged and answered from a durable recount instead.
#[derive(Clone)]
pub struct EngagementStore {
    likes: Arc<dyn LikeRepository>,
    counters: Arc<dyn CounterCache>,
    jobs: Arc<dyn JobQueue>,
}

impl EngagementStore {
    pub fn new(
        likes: Arc<dyn LikeRepository>,
        counters: Arc<dyn CounterCache>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            likes,
            counters,
            jobs,
        }
    }

    pub async fn toggle_like(
        &self,
        target: TargetRef,
        user_id: Uuid,
        want_liked: bool,
    ) -> Result<ToggleLikeResult, DomainError> {
        let changed = if want_liked {
            let like = LikeState {
                target,
                user_id,
                created_at: Utc::now().trunc_subsecs(6),
            };
            self.likes.insert_if_absent(&like).await?
        } else {
            // Cheap pre-check; the conditional delete below is what decides.
            if !self.likes.exists(&target, user_id).await? {
                false
            } else {
                self.likes.delete_if_present(&target, user_id).await?
            }
        };

        let like_count = if changed {
            let count = self.apply_change(&target, want_liked).await?;
            let action = if want_liked {
                AuditAction::Liked
            } else {
                AuditAction::Unliked
            };
            self.dispatch_audit(action, target, user_id).await;
            count
        } else {
            self.get_like_count(target).await?
        };

        tracing::debug!(
            target_type = %target.target_type,
            target_id = %target.target_id,
            user_id = %user_id,
            want_liked,
            changed,
            like_count,
            "Like toggled"
        );

        Ok(ToggleLikeResult {
            is_liked: want_liked,
            like_count,
            changed,
        })
    }

    /// Counter value, or a durable recount when the cache is unavailable.
    pub async fn get_like_count(&self, target: TargetRef) -> Result<i64, DomainError> {
        match self.counters.get(&target.counter_key()).await {
            Ok(count) => Ok(count.max(0)),
            Err(e) => {
                tracing::warn!(
                    target_id = %target.target_id,
                    error = %e,
                    "Counter read failed, counting like rows"
                );
                Ok(self.likes.count_for_target(&target).await?)
            }
        }
    }

    pub async fn has_user_liked(
        &self,
        target: TargetRef,
        user_id: Uuid,
    ) -> Result<bool, DomainError> {
        Ok(self.likes.exists(&target, user_id).await?)
    }

    /// Like summaries for a batch of posts with a single counter fetch.
    /// `is_liked` is only filled in when a viewer is given.
    pub async fn get_likes_for_posts(
        &self,
        post_ids: &[Uuid],
        viewer: Option<Uuid>,
    ) -> Result<HashMap<Uuid, LikeSummary>, DomainError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let targets: Vec<TargetRef> = post_ids.iter().copied().map(TargetRef::post).collect();
        let keys: Vec<String> = targets.iter().map(TargetRef::counter_key).collect();

        let counts: Vec<i64> = match self.counters.get_many(&keys).await {
            Ok(counts) => counts.into_iter().map(|c| c.max(0)).collect(),
            Err(e) => {
                tracing::warn!(
                    posts = post_ids.len(),
                    error = %e,
                    "Batch counter read failed, counting like rows per post"
                );
                try_join_all(targets.iter().map(|t| self.likes.count_for_target(t))).await?
            }
        };

        let liked: Vec<bool> = match viewer {
            Some(user_id) => {
                try_join_all(targets.iter().map(|t| self.likes.exists(t, user_id))).await?
            }
            None => vec![false; targets.len()],
        };

        Ok(post_ids
            .iter()
            .zip(counts.into_iter().zip(liked))
            .map(|(id, (like_count, is_liked))| {
                (
                    *id,
                    LikeSummary {
                        like_count,
                        is_liked,
                    },
                )
            })
            .collect())
    }

    /// Recount like rows and overwrite the counter with the result.
    pub async fn sync_counter_from_durable_state(
        &self,
        target: TargetRef,
    ) -> Result<CounterSync, DomainError> {
        let durable_count = self.likes.count_for_target(&target).await?;

        let cache_updated = match self.counters.set(&target.counter_key(), durable_count).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    target_id = %target.target_id,
                    error = %e,
                    "Counter overwrite failed during sync"
                );
                false
            }
        };

        tracing::info!(
            target_type = %target.target_type,
            target_id = %target.target_id,
            durable_count,
            cache_updated,
            "Like counter synced"
        );

        Ok(CounterSync {
            durable_count,
            cache_updated,
        })
    }

    async fn apply_change(&self, target: &TargetRef, liked: bool) -> Result<i64, DomainError> {
        let key = target.counter_key();
        let result = if liked {
            self.counters.increment(&key).await
        } else {
            self.counters.decrement_floor(&key).await
        };

        match result {
            Ok(count) => Ok(count),
            Err(e) => {
                tracing::warn!(
                    target_id = %target.target_id,
                    error = %e,
                    "Counter update failed, counting like rows"
                );
                Ok(self.likes.count_for_target(target).await?)
            }
        }
    }

    async fn dispatch_audit(&self, action: AuditAction, target: TargetRef, user_id: Uuid) {
        let event = LikeAuditEvent {
            action,
            target,
            user_id,
            at: Utc::now(),
        };

        let job = match Job::new(AUDIT_JOB_TYPE, &event) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "Could not build like audit job");
                return;
            }
        };

        if let Err(e) = self.jobs.enqueue(job).await {
            tracing::warn!(
                target_id = %target.target_id,
                user_id = %user_id,
                error = %e,
                "Like audit not enqueued"
            );
        }
    }
}

/// Worker handler applying queued [`LikeAuditEvent`]s, each bounded by `timeout`.
pub fn audit_job_handler(likes: Arc<dyn LikeRepository>, timeout: Duration) -> JobHandler {
    job_handler(move |job: Job| {
        let likes = likes.clone();
        async move {
            if job.job_type != AUDIT_JOB_TYPE {
                return JobResult::Failed(format!("unhandled job type {}", job.job_type));
            }
            let event: LikeAuditEvent = match job.decode() {
                Ok(event) => event,
                Err(e) => return JobResult::Failed(e.to_string()),
            };

            match tokio::time::timeout(timeout, likes.record_audit(&event)).await {
                Ok(Ok(())) => JobResult::Success,
                Ok(Err(e)) => JobResult::Retry(e.to_string()),
                Err(_) => JobResult::Retry(format!("audit write timed out after {timeout:?}")),
            }
        }
    })
}
