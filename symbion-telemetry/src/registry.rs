//! Entity registry keyed by seuid
//!
//! The registry is where ingestion, rating and query calls addressed by
//! seuid land. Each entity sits behind its own reader-writer lock: a call
//! holds the write lock for its whole duration, so readers see an entity
//! either before or after an append or cycle reset, never halfway through.

use crate::action::{ActionRequest, Actionable, RemoteAction};
use crate::config::TelemetryConfig;
use crate::connection::Connection;
use crate::entity::{Entity, EntityCore, EntityKind, Snapshot};
use crate::error::{Result, TelemetryError};
use crate::host::Host;
use crate::logger::SharedLogger;
use crate::series::RatingState;
use crate::source::{BatchReport, HostSampleBatch, HostSampleSource};
use crate::state::{new_shared, Shared};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

/// Closed set of entity kinds, dispatched by variant
pub enum AnyEntity {
    Connection(Connection),
    Host(Host),
}

impl AnyEntity {
    pub fn as_connection(&self) -> Option<&Connection> {
        match self {
            AnyEntity::Connection(c) => Some(c),
            AnyEntity::Host(_) => None,
        }
    }

    pub fn as_host(&self) -> Option<&Host> {
        match self {
            AnyEntity::Host(h) => Some(h),
            AnyEntity::Connection(_) => None,
        }
    }

    pub fn as_host_mut(&mut self) -> Option<&mut Host> {
        match self {
            AnyEntity::Host(h) => Some(h),
            AnyEntity::Connection(_) => None,
        }
    }

    /// `None` for kinds that do not accept actions
    pub fn as_actionable_mut(&mut self) -> Option<&mut dyn Actionable> {
        match self {
            AnyEntity::Host(h) => Some(h),
            AnyEntity::Connection(_) => None,
        }
    }
}

impl Entity for AnyEntity {
    fn core(&self) -> &EntityCore {
        match self {
            AnyEntity::Connection(c) => c.core(),
            AnyEntity::Host(h) => h.core(),
        }
    }

    fn ingest(&mut self, name: &str, value: f64) -> Result<()> {
        match self {
            AnyEntity::Connection(c) => c.ingest(name, value),
            AnyEntity::Host(h) => h.ingest(name, value),
        }
    }

    fn ingest_rating(&mut self, name: &str, actual: f64, expected: f64, state: RatingState) -> Result<()> {
        match self {
            AnyEntity::Connection(c) => c.ingest_rating(name, actual, expected, state),
            AnyEntity::Host(h) => h.ingest_rating(name, actual, expected, state),
        }
    }
}

impl From<Connection> for AnyEntity {
    fn from(connection: Connection) -> Self {
        AnyEntity::Connection(connection)
    }
}

impl From<Host> for AnyEntity {
    fn from(host: Host) -> Self {
        AnyEntity::Host(host)
    }
}

pub type SharedEntity = Shared<AnyEntity>;

pub struct EntityRegistry {
    entities: RwLock<HashMap<String, SharedEntity>>,
    config: TelemetryConfig,
    logger: Option<SharedLogger>,
}

impl EntityRegistry {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            config,
            logger: None,
        }
    }

    /// Logger handed to every entity created by this registry
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn create_connection(&self, seuid: &str, parent: Option<&str>) -> Result<SharedEntity> {
        let connection = Connection::new(
            seuid,
            parent.map(str::to_string),
            self.config.history_limit,
            self.logger.clone(),
        )?;
        self.insert(connection.into())
    }

    /// Host sized from the configured core count
    pub fn create_host(&self, seuid: &str, parent: Option<&str>) -> Result<SharedEntity> {
        self.create_host_with_cores(seuid, parent, self.config.cpu_core_count())
    }

    /// Host sized for the per-core temperatures `source` delivers, so its
    /// batches always fit. Sources without a core count use the config.
    pub fn create_host_for_source(
        &self,
        seuid: &str,
        parent: Option<&str>,
        source: &dyn HostSampleSource,
    ) -> Result<SharedEntity> {
        let cores = source
            .core_count()
            .unwrap_or_else(|| self.config.cpu_core_count());
        self.create_host_with_cores(seuid, parent, cores)
    }

    pub fn create_host_with_cores(
        &self,
        seuid: &str,
        parent: Option<&str>,
        cpu_core_count: usize,
    ) -> Result<SharedEntity> {
        let host = Host::new(
            seuid,
            parent.map(str::to_string),
            cpu_core_count,
            self.config.history_limit,
            self.logger.clone(),
        )?
        .with_reset_exclusions(self.config.host.reset_exclusions.clone());
        self.insert(host.into())
    }

    pub fn insert(&self, entity: AnyEntity) -> Result<SharedEntity> {
        let seuid = entity.id().to_string();
        let mut entities = self.entities.write();
        if entities.contains_key(&seuid) {
            return Err(TelemetryError::DuplicateEntity(seuid));
        }
        let shared = new_shared(entity);
        entities.insert(seuid.clone(), shared.clone());
        info!("registered entity {}", seuid);
        Ok(shared)
    }

    pub fn get(&self, seuid: &str) -> Option<SharedEntity> {
        self.entities.read().get(seuid).cloned()
    }

    /// Drops the entity once the upstream side reports it gone
    pub fn remove(&self, seuid: &str) -> Option<SharedEntity> {
        let removed = self.entities.write().remove(seuid);
        if removed.is_some() {
            info!("removed entity {}", seuid);
        }
        removed
    }

    /// Registered seuids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entities.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entities
            .read()
            .iter()
            .filter(|(_, e)| e.read().kind() == kind)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    pub fn ingest(&self, seuid: &str, metric: &str, value: f64) -> Result<()> {
        self.entity(seuid)?.write().ingest(metric, value)
    }

    pub fn ingest_rating(
        &self,
        seuid: &str,
        metric: &str,
        actual: f64,
        expected: f64,
        state: RatingState,
    ) -> Result<()> {
        self.entity(seuid)?
            .write()
            .ingest_rating(metric, actual, expected, state)
    }

    pub fn add_host_sample(&self, seuid: &str, category: &str, key: &str, value: f64) -> Result<()> {
        let entity = self.entity(seuid)?;
        let mut guard = entity.write();
        let host = guard
            .as_host_mut()
            .ok_or_else(|| TelemetryError::NotAHost(seuid.to_string()))?;
        host.add_sample(category, key, value)
    }

    pub fn set_drive_space(&self, seuid: &str, disk: &str, free_bytes: f64) -> Result<()> {
        let entity = self.entity(seuid)?;
        let mut guard = entity.write();
        let host = guard
            .as_host_mut()
            .ok_or_else(|| TelemetryError::NotAHost(seuid.to_string()))?;
        host.set_drive_space(disk, free_bytes);
        Ok(())
    }

    /// Records a sampling window on host `seuid`; see `Host::apply_batch`
    pub fn apply_host_batch(&self, seuid: &str, batch: &HostSampleBatch) -> Result<BatchReport> {
        let entity = self.entity(seuid)?;
        let mut guard = entity.write();
        let host = guard
            .as_host_mut()
            .ok_or_else(|| TelemetryError::NotAHost(seuid.to_string()))?;
        Ok(host.apply_batch(batch))
    }

    /// Resets the per-cycle accumulators of every host; returns how many
    pub fn reset_host_cycles(&self) -> usize {
        let entities: Vec<SharedEntity> = self.entities.read().values().cloned().collect();
        let mut count = 0;
        for entity in entities {
            if let Some(host) = entity.write().as_host_mut() {
                host.reset_cycle();
                count += 1;
            }
        }
        debug!("reset {} host cycles", count);
        count
    }

    pub fn execute_action(&self, seuid: &str, action: RemoteAction) -> Result<ActionRequest> {
        let entity = self.entity(seuid)?;
        let mut guard = entity.write();
        let actionable = guard
            .as_actionable_mut()
            .ok_or_else(|| TelemetryError::NotActionable(seuid.to_string()))?;
        Ok(actionable.execute_action(action))
    }

    pub fn latest_snapshot(&self, seuid: &str) -> Result<Snapshot> {
        Ok(self.entity(seuid)?.read().latest_snapshot())
    }

    fn entity(&self, seuid: &str) -> Result<SharedEntity> {
        self.get(seuid)
            .ok_or_else(|| TelemetryError::UnknownEntity(seuid.to_string()))
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}
