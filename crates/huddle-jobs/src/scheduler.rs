//! Deadline scheduler: periodic sweep over tasks and projects.
//!
//! Each sweep runs two passes. The approaching pass looks at deadlines
//! inside the early-reminder window and tiers them (due within 24h vs
//! within 48h); the overdue pass picks up everything strictly past due.
//! Both passes are idempotent per calendar day via dedup markers in the
//! ephemeral store, so a restart mid-day does not re-notify. Sweeps are
//! single-flight: the timer loop awaits the sweep inline and `run_now`
//! serializes against it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use huddle_core::{
    defaults, DeadlineRepository, DeadlineTier, DueProject, DueTask, EphemeralStore, Error,
    NewNotification, NotificationKind, NotificationRepository, Result, RoomKey, ServerEvent,
    UserId,
};
use huddle_hub::Hub;
use huddle_state::keys;

/// Configuration for the deadline scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between sweeps.
    pub sweep_interval: Duration,
    /// Deadlines within this many hours get the urgent tier.
    pub approaching_window_hours: i64,
    /// Deadlines within this many hours get the early-reminder tier.
    pub early_reminder_window_hours: i64,
    /// Whether to run the scheduler at all.
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(defaults::SWEEP_INTERVAL_SECS),
            approaching_window_hours: defaults::APPROACHING_WINDOW_HOURS,
            early_reminder_window_hours: defaults::EARLY_REMINDER_WINDOW_HOURS,
            enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DEADLINE_SCHEDULER_ENABLED` | `true` | Enable/disable the sweep loop |
    /// | `DEADLINE_SWEEP_INTERVAL_SECS` | `3600` | Seconds between sweeps |
    pub fn from_env() -> Self {
        let enabled = std::env::var("DEADLINE_SCHEDULER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let sweep_interval_secs = std::env::var("DEADLINE_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::SWEEP_INTERVAL_SECS)
            .max(1);

        Self {
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            enabled,
            ..Self::default()
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Notifications created and alerts pushed.
    pub notified: usize,
    /// Entities skipped because today's marker already exists.
    pub deduped: usize,
    /// Entities whose notification failed; they retry next sweep.
    pub failed: usize,
    /// Entities with nobody to notify (unassigned tasks).
    pub skipped: usize,
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    scheduler: Arc<DeadlineScheduler>,
    shutdown_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Signal the sweep loop to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Trigger a sweep immediately, outside the timer. Serializes against
    /// any sweep already in flight.
    pub async fn run_now(&self) -> SweepStats {
        self.scheduler.sweep().await
    }
}

/// The deadline sweep job.
pub struct DeadlineScheduler {
    deadlines: Arc<dyn DeadlineRepository>,
    notifications: Arc<dyn NotificationRepository>,
    store: Arc<dyn EphemeralStore>,
    hub: Arc<Hub>,
    config: SchedulerConfig,
    // Single-flight: timer ticks and run_now never overlap.
    sweep_lock: Mutex<()>,
}

impl DeadlineScheduler {
    pub fn new(
        deadlines: Arc<dyn DeadlineRepository>,
        notifications: Arc<dyn NotificationRepository>,
        store: Arc<dyn EphemeralStore>,
        hub: Arc<Hub>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            deadlines,
            notifications,
            store,
            hub,
            config,
            sweep_lock: Mutex::new(()),
        }
    }

    /// Start the sweep loop and return a handle for control.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let scheduler = Arc::new(self);
        let scheduler_clone = scheduler.clone();

        tokio::spawn(async move {
            scheduler_clone.run(&mut shutdown_rx).await;
        });

        SchedulerHandle {
            scheduler,
            shutdown_tx,
        }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(
                subsystem = "jobs",
                component = "scheduler",
                "Deadline scheduler is disabled, not starting"
            );
            return;
        }

        info!(
            subsystem = "jobs",
            component = "scheduler",
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            "Deadline scheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        // If a sweep overruns the interval, run late rather than bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Consume the immediate first tick; the first sweep happens one
        // full interval after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(
                        subsystem = "jobs",
                        component = "scheduler",
                        "Deadline scheduler received shutdown signal"
                    );
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }

        info!(
            subsystem = "jobs",
            component = "scheduler",
            "Deadline scheduler stopped"
        );
    }

    /// One full sweep: approaching pass, then overdue pass.
    pub async fn sweep(&self) -> SweepStats {
        let _guard = self.sweep_lock.lock().await;
        let start = Instant::now();
        let today = Utc::now().date_naive();

        let mut stats = SweepStats::default();
        self.approaching_pass(today, &mut stats).await;
        self.overdue_pass(today, &mut stats).await;

        info!(
            subsystem = "jobs",
            component = "scheduler",
            op = "sweep",
            notified = stats.notified,
            deduped = stats.deduped,
            failed = stats.failed,
            skipped = stats.skipped,
            duration_ms = start.elapsed().as_millis() as u64,
            "sweep complete"
        );
        stats
    }

    // -------------------------------------------------------------------
    // Approaching pass
    // -------------------------------------------------------------------

    async fn approaching_pass(&self, today: NaiveDate, stats: &mut SweepStats) {
        let horizon = today + chrono::Duration::days(self.config.early_reminder_window_hours / 24);

        match self.deadlines.tasks_due_within(today, horizon).await {
            Ok(tasks) => {
                for task in tasks {
                    self.remind_task(today, &task, stats).await;
                }
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    op = "approaching_pass",
                    error = %e,
                    "task sweep query failed"
                );
            }
        }

        match self.deadlines.projects_due_within(today, horizon).await {
            Ok(projects) => {
                for project in projects {
                    self.remind_project(today, &project, stats).await;
                }
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    op = "approaching_pass",
                    error = %e,
                    "project sweep query failed"
                );
            }
        }
    }

    async fn remind_task(&self, today: NaiveDate, task: &DueTask, stats: &mut SweepStats) {
        let Some(assignee_id) = task.assignee_id else {
            stats.skipped += 1;
            return;
        };

        let marker = keys::due_marker("task", task.id, today);
        if self.store.exists(&marker).await {
            stats.deduped += 1;
            return;
        }

        let days_left = (task.due_date - today).num_days().max(0);
        let tier = self.tier_for(days_left);
        let notification = NewNotification {
            user_id: assignee_id,
            title: "Deadline Reminder".to_string(),
            body: format!(
                "Task \"{}\" in {} is due in {} day(s)",
                task.title, task.project_name, days_left
            ),
            kind: NotificationKind::Approaching,
            project_id: Some(task.project_id),
            task_id: Some(task.id),
        };

        match self.notifications.insert(notification).await {
            Ok(_) => {
                self.push_task_alert(task, assignee_id, tier);
                self.mark(&marker).await;
                stats.notified += 1;
            }
            Err(e) => {
                // Marker not set: this task retries on the next sweep.
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    task_id = task.id,
                    error = %e,
                    "task reminder failed"
                );
                stats.failed += 1;
            }
        }
    }

    async fn remind_project(&self, today: NaiveDate, project: &DueProject, stats: &mut SweepStats) {
        let marker = keys::due_marker("project", project.id, today);
        if self.store.exists(&marker).await {
            stats.deduped += 1;
            return;
        }

        let days_left = (project.deadline - today).num_days().max(0);
        let tier = self.tier_for(days_left);
        let notification = NewNotification {
            user_id: project.owner_id,
            title: "Project Deadline Reminder".to_string(),
            body: format!(
                "Project \"{}\" is due in {} day(s)",
                project.name, days_left
            ),
            kind: NotificationKind::Approaching,
            project_id: Some(project.id),
            task_id: None,
        };

        match self.notifications.insert(notification).await {
            Ok(_) => {
                self.push_project_alert(project, tier);
                self.mark(&marker).await;
                stats.notified += 1;
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    project_id = project.id,
                    error = %e,
                    "project reminder failed"
                );
                stats.failed += 1;
            }
        }
    }

    // -------------------------------------------------------------------
    // Overdue pass
    // -------------------------------------------------------------------

    async fn overdue_pass(&self, today: NaiveDate, stats: &mut SweepStats) {
        match self.deadlines.tasks_overdue(today).await {
            Ok(tasks) => {
                for task in tasks {
                    self.nag_overdue_task(today, &task, stats).await;
                }
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    op = "overdue_pass",
                    error = %e,
                    "overdue task query failed"
                );
            }
        }

        match self.deadlines.projects_overdue(today).await {
            Ok(projects) => {
                for project in projects {
                    self.nag_overdue_project(today, &project, stats).await;
                }
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    op = "overdue_pass",
                    error = %e,
                    "overdue project query failed"
                );
            }
        }
    }

    async fn nag_overdue_task(&self, today: NaiveDate, task: &DueTask, stats: &mut SweepStats) {
        let Some(assignee_id) = task.assignee_id else {
            stats.skipped += 1;
            return;
        };

        let marker = keys::overdue_marker("task", task.id, today);
        if self.store.exists(&marker).await {
            stats.deduped += 1;
            return;
        }

        let days_over = (today - task.due_date).num_days();
        let notification = NewNotification {
            user_id: assignee_id,
            title: "Overdue Task".to_string(),
            body: format!(
                "Task \"{}\" in {} is overdue by {} day(s)",
                task.title, task.project_name, days_over
            ),
            kind: NotificationKind::Overdue,
            project_id: Some(task.project_id),
            task_id: Some(task.id),
        };

        match self.notifications.insert(notification).await {
            Ok(_) => {
                self.push_task_alert(task, assignee_id, DeadlineTier::Overdue);
                self.mark(&marker).await;
                stats.notified += 1;
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    task_id = task.id,
                    error = %e,
                    "overdue task notification failed"
                );
                stats.failed += 1;
            }
        }
    }

    async fn nag_overdue_project(
        &self,
        today: NaiveDate,
        project: &DueProject,
        stats: &mut SweepStats,
    ) {
        let marker = keys::overdue_marker("project", project.id, today);
        if self.store.exists(&marker).await {
            stats.deduped += 1;
            return;
        }

        let days_over = (today - project.deadline).num_days();
        let notification = NewNotification {
            user_id: project.owner_id,
            title: "Overdue Project".to_string(),
            body: format!(
                "Project \"{}\" is overdue by {} day(s)",
                project.name, days_over
            ),
            kind: NotificationKind::Overdue,
            project_id: Some(project.id),
            task_id: None,
        };

        match self.notifications.insert(notification).await {
            Ok(_) => {
                self.push_project_alert(project, DeadlineTier::Overdue);
                self.mark(&marker).await;
                stats.notified += 1;
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "scheduler",
                    project_id = project.id,
                    error = %e,
                    "overdue project notification failed"
                );
                stats.failed += 1;
            }
        }
    }

    // -------------------------------------------------------------------
    // Shared plumbing
    // -------------------------------------------------------------------

    fn tier_for(&self, days_left: i64) -> DeadlineTier {
        if days_left * 24 <= self.config.approaching_window_hours {
            DeadlineTier::Approaching
        } else {
            DeadlineTier::EarlyReminder
        }
    }

    /// Real-time alert to the assignee's personal room and the project
    /// room. Offline recipients still have the persisted notification.
    fn push_task_alert(&self, task: &DueTask, assignee_id: UserId, tier: DeadlineTier) {
        let event = ServerEvent::DeadlineAlert {
            entity_id: task.id,
            title: task.title.clone(),
            deadline: task.due_date,
            tier,
            timestamp: Utc::now(),
        };
        let delivered = self.hub.rooms().broadcast(
            self.hub.registry(),
            RoomKey::User(assignee_id),
            &event,
            None,
        ) + self.hub.rooms().broadcast(
            self.hub.registry(),
            RoomKey::Project(task.project_id),
            &event,
            None,
        );
        debug!(
            subsystem = "jobs",
            component = "scheduler",
            task_id = task.id,
            tier = tier.as_str(),
            recipient_count = delivered,
            "task alert pushed"
        );
    }

    fn push_project_alert(&self, project: &DueProject, tier: DeadlineTier) {
        let event = ServerEvent::ProjectDeadlineAlert {
            entity_id: project.id,
            title: project.name.clone(),
            deadline: project.deadline,
            tier,
            timestamp: Utc::now(),
        };
        let delivered = self.hub.rooms().broadcast(
            self.hub.registry(),
            RoomKey::User(project.owner_id),
            &event,
            None,
        ) + self.hub.rooms().broadcast(
            self.hub.registry(),
            RoomKey::Project(project.id),
            &event,
            None,
        );
        debug!(
            subsystem = "jobs",
            component = "scheduler",
            project_id = project.id,
            tier = tier.as_str(),
            recipient_count = delivered,
            "project alert pushed"
        );
    }

    async fn mark(&self, marker: &str) {
        let ttl = Duration::from_secs(defaults::DEDUP_MARKER_TTL_SECS);
        if !self.store.set(marker, "1", Some(ttl)).await {
            warn!(
                subsystem = "jobs",
                component = "scheduler",
                marker,
                "dedup marker write failed; entity may notify again this sweep cycle"
            );
        }
    }
}
